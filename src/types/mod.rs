//! Type definitions

pub mod import_job;
pub mod messages;

pub use import_job::*;
pub use messages::*;
