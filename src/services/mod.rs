//! Business services and background workers

pub mod campers;
pub mod cleanup_worker;
pub mod import_service;
pub mod import_worker;

pub use cleanup_worker::{CleanupWorker, CleanupWorkerConfig};
pub use import_service::{ImportService, ImportServiceError};
pub use import_worker::{ImportWorker, ImportWorkerConfig};
