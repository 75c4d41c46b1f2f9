//! Retention cleanup for terminal import jobs
//!
//! Deletes old completed and failed jobs together with their uploaded
//! files. Completed and failed jobs have independent retention windows;
//! failed jobs are kept longer so operators can still inspect what went
//! wrong. Runs one sweep immediately on startup, then on a fixed tick.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::db::import_jobs::ImportJobsRepository;
use crate::types::ImportJob;

#[derive(Debug, Clone)]
pub struct CleanupWorkerConfig {
    pub poll_interval: Duration,
    pub success_retention_days: i64,
    pub failed_retention_days: i64,
}

impl Default for CleanupWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(24 * 60 * 60),
            success_retention_days: 30,
            failed_retention_days: 90,
        }
    }
}

pub struct CleanupWorker {
    repo: Arc<dyn ImportJobsRepository>,
    config: CleanupWorkerConfig,
    shutdown: CancellationToken,
}

impl CleanupWorker {
    pub fn new(
        repo: Arc<dyn ImportJobsRepository>,
        config: CleanupWorkerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            repo,
            config,
            shutdown,
        }
    }

    pub async fn run(&self) {
        info!(
            "Cleanup worker started (interval {:?}, retention {}d/{}d)",
            self.config.poll_interval,
            self.config.success_retention_days,
            self.config.failed_retention_days
        );
        // The first tick of a tokio interval fires immediately, which gives
        // us the startup sweep for free
        let mut ticker = tokio::time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.cleanup_old_jobs().await {
                        error!("Cleanup pass failed: {:#}", e);
                    }
                }
                _ = self.shutdown.cancelled() => {
                    info!("Cleanup worker shutting down");
                    return;
                }
            }
        }
    }

    /// One sweep over both retention windows, keyed on `updated_at` (the
    /// moment the job reached its terminal state).
    pub async fn cleanup_old_jobs(&self) -> Result<()> {
        let now = Utc::now();

        let completed_cutoff = now - chrono::Duration::days(self.config.success_retention_days);
        let old_completed = self.repo.get_old_completed_jobs(completed_cutoff).await?;

        let failed_cutoff = now - chrono::Duration::days(self.config.failed_retention_days);
        let old_failed = self.repo.get_old_failed_jobs(failed_cutoff).await?;

        let total = old_completed.len() + old_failed.len();
        if total == 0 {
            return Ok(());
        }
        info!(
            "Cleaning up {} expired import job(s) ({} completed, {} failed)",
            total,
            old_completed.len(),
            old_failed.len()
        );

        let mut deleted = 0usize;
        for job in old_completed.iter().chain(old_failed.iter()) {
            match self.delete_job(job).await {
                Ok(()) => deleted += 1,
                Err(e) => error!("Failed to clean up import job {}: {:#}", job.id, e),
            }
        }

        info!("Cleanup pass deleted {}/{} expired job(s)", deleted, total);
        Ok(())
    }

    /// File removal is best effort: a file that is already gone is fine,
    /// and any other filesystem error must not keep the record alive past
    /// its retention window.
    async fn delete_job(&self, job: &ImportJob) -> Result<()> {
        if let Some(path) = &job.file_path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove import file {}: {}", path, e),
            }
        }

        self.repo.delete(job.id).await
    }
}

// ==========================================================================
// Tests
// ==========================================================================
