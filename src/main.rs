//! Taborak import worker - backend service for asynchronous CSV imports
//!
//! Connects to NATS for intake requests and runs the background import
//! and cleanup workers against PostgreSQL.

mod config;
mod csvimport;
mod db;
mod handlers;
mod services;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::csvimport::entities::camper::{CamperImportMapper, CamperImportValidator};
use crate::csvimport::ImportRegistry;
use crate::db::campers::PgCampersService;
use crate::db::import_jobs::PgImportJobsRepository;
use crate::db::lookups::{PgGroupLookup, PgSessionLookup};
use crate::services::{
    CleanupWorker, CleanupWorkerConfig, ImportService, ImportWorker, ImportWorkerConfig,
};
use crate::types::ImportEntityType;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ./logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,taborak_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
        .init();

    info!("Starting Taborak import worker...");

    // Load configuration
    let config = config::Config::from_env()?;
    info!("Configuration loaded");

    // Connect to database
    let pool = db::create_pool(&config.database_url).await?;
    info!("Connected to PostgreSQL");

    // Wire the import pipeline
    let repo: Arc<dyn db::import_jobs::ImportJobsRepository> =
        Arc::new(PgImportJobsRepository::new(pool.clone()));
    let sessions = Arc::new(PgSessionLookup::new(pool.clone()));
    let groups = Arc::new(PgGroupLookup::new(pool.clone()));
    let campers: Arc<dyn services::campers::CampersService> =
        Arc::new(PgCampersService::new(pool.clone()));

    let mut registry = ImportRegistry::new();
    registry.register(
        ImportEntityType::Campers,
        Arc::new(CamperImportValidator::new(sessions.clone(), groups.clone())),
        Arc::new(CamperImportMapper::new(sessions, groups)),
    );
    let registry = Arc::new(registry);

    let import_service = Arc::new(ImportService::new(
        repo.clone(),
        registry.clone(),
        config.upload_dir.clone(),
    ));

    // Background workers share one shutdown token
    let shutdown = CancellationToken::new();

    let import_worker = ImportWorker::new(
        repo.clone(),
        registry,
        campers,
        ImportWorkerConfig {
            poll_interval: Duration::from_secs(config.import_poll_interval_secs),
            batch_size: config.import_batch_size,
        },
        shutdown.clone(),
    );
    let import_worker_handle = tokio::spawn(async move { import_worker.run().await });

    let cleanup_worker = CleanupWorker::new(
        repo,
        CleanupWorkerConfig {
            poll_interval: Duration::from_secs(config.cleanup_interval_hours * 60 * 60),
            success_retention_days: config.success_retention_days,
            failed_retention_days: config.failed_retention_days,
        },
        shutdown.clone(),
    );
    let cleanup_worker_handle = tokio::spawn(async move { cleanup_worker.run().await });

    info!("Background workers started");

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    // Handlers run until a subscription dies or we get a shutdown signal
    tokio::select! {
        result = handlers::start_handlers(nats_client, import_service) => {
            if let Err(e) = result {
                error!("Handler error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    // Let in-flight jobs finish before exiting
    shutdown.cancel();
    let _ = import_worker_handle.await;
    let _ = cleanup_worker_handle.await;
    info!("Shutdown complete");

    Ok(())
}
