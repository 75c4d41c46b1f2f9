//! Background import worker
//!
//! Polls for pending import jobs and drives each one through the state
//! machine: validating -> validated -> importing -> completed | failed.
//! Jobs are claimed with an atomic conditional update so multiple worker
//! instances can poll the same table without processing a job twice.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::csvimport::{parse_csv, validate_csv, EntityCreationRequest, ImportRegistry};
use crate::db::import_jobs::ImportJobsRepository;
use crate::services::campers::CampersService;
use crate::types::{ImportJob, ImportJobStatus, ImportMode, ValidationError};

#[derive(Debug, Clone)]
pub struct ImportWorkerConfig {
    pub poll_interval: Duration,
    /// Progress is flushed to the repository every `batch_size` rows
    pub batch_size: usize,
}

impl Default for ImportWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            batch_size: 100,
        }
    }
}

pub struct ImportWorker {
    repo: Arc<dyn ImportJobsRepository>,
    registry: Arc<ImportRegistry>,
    campers: Arc<dyn CampersService>,
    config: ImportWorkerConfig,
    shutdown: CancellationToken,
}

impl ImportWorker {
    pub fn new(
        repo: Arc<dyn ImportJobsRepository>,
        registry: Arc<ImportRegistry>,
        campers: Arc<dyn CampersService>,
        config: ImportWorkerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            repo,
            registry,
            campers,
            config,
            shutdown,
        }
    }

    /// Poll loop. Returns once the shutdown token fires; the job currently
    /// being processed is finished first.
    pub async fn run(&self) {
        info!(
            "Import worker started (poll interval {:?}, batch size {})",
            self.config.poll_interval, self.config.batch_size
        );
        let mut ticker = tokio::time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.process_pending_jobs().await {
                        error!("Import poll pass failed: {:#}", e);
                    }
                }
                _ = self.shutdown.cancelled() => {
                    info!("Import worker shutting down");
                    return;
                }
            }
        }
    }

    /// One poll pass: claim and process every job that is still pending.
    /// A failure in one job never blocks the rest of the batch.
    pub async fn process_pending_jobs(&self) -> Result<()> {
        let pending = self.repo.get_pending_jobs().await?;

        for job in pending {
            // Lost the claim race to another worker; skip silently
            if !self.repo.claim_pending(job.id).await? {
                continue;
            }

            if let Err(e) = self.process_job(&job).await {
                error!("Import job {} failed: {:#}", job.id, e);
                if let Err(update_err) = self
                    .repo
                    .update_status(job.id, ImportJobStatus::Failed)
                    .await
                {
                    error!(
                        "Failed to mark import job {} as failed: {:#}",
                        job.id, update_err
                    );
                }
            }
        }

        Ok(())
    }

    /// Drive one claimed job from validating to a terminal state.
    ///
    /// Validation and per-row import errors are recorded on the job and
    /// end in `failed`; only infrastructure problems (repository errors,
    /// missing registrations) surface as `Err` to the caller.
    async fn process_job(&self, job: &ImportJob) -> Result<()> {
        info!("Processing import job {} ({})", job.id, job.entity_type);

        let validator = self
            .registry
            .validator(job.entity_type)
            .ok_or_else(|| anyhow!("no validator registered for {}", job.entity_type))?;
        let mapper = self
            .registry
            .mapper(job.entity_type)
            .ok_or_else(|| anyhow!("no mapper registered for {}", job.entity_type))?;

        let file_path = job
            .file_path
            .as_deref()
            .ok_or_else(|| anyhow!("import job {} has no file path", job.id))?;
        let content = tokio::fs::read(file_path)
            .await
            .with_context(|| format!("failed to read import file {file_path}"))?;

        let (rows, headers) = match parse_csv(&content) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.repo
                    .update_validation_errors(
                        job.id,
                        &[ValidationError::new(0, "file", e.to_string())],
                    )
                    .await?;
                self.repo
                    .update_status(job.id, ImportJobStatus::Failed)
                    .await?;
                warn!("Import job {} failed to parse: {}", job.id, e);
                return Ok(());
            }
        };

        self.repo.set_total_rows(job.id, rows.len() as i32).await?;

        let errors =
            validate_csv(&rows, &headers, validator.as_ref(), job.tenant_id, job.camp_id).await;
        if !errors.is_empty() {
            warn!(
                "Import job {} failed validation with {} error(s)",
                job.id,
                errors.len()
            );
            // Counters stay untouched: they describe the import phase,
            // which never starts for a file that fails validation
            self.repo.update_validation_errors(job.id, &errors).await?;
            self.repo
                .update_status(job.id, ImportJobStatus::Failed)
                .await?;
            return Ok(());
        }

        self.repo
            .update_status(job.id, ImportJobStatus::Validated)
            .await?;
        self.repo
            .update_status(job.id, ImportJobStatus::Importing)
            .await?;

        let mode = job.mode.unwrap_or(ImportMode::Create);
        let batch_size = self.config.batch_size.max(1);
        let mut processed = 0i32;
        let mut success_count = 0i32;
        let mut error_count = 0i32;
        let mut import_errors = Vec::new();

        for row in &rows {
            let request = match mapper.map_row(row, job.tenant_id, job.camp_id).await {
                Ok(request) => Some(request),
                Err(e) => {
                    import_errors.push(ValidationError::new(
                        row.line,
                        "mapping",
                        format!("{e:#}"),
                    ));
                    error_count += 1;
                    None
                }
            };

            if let Some(request) = request {
                match self.create_entity(job, mode, &request).await {
                    Ok(()) => success_count += 1,
                    Err(e) => {
                        import_errors.push(ValidationError::new(
                            row.line,
                            "creation",
                            format!("{e:#}"),
                        ));
                        error_count += 1;
                    }
                }
            }

            processed += 1;
            if processed as usize % batch_size == 0 {
                self.repo
                    .update_progress(job.id, processed, success_count, error_count)
                    .await?;
            }
        }

        self.repo
            .update_progress(job.id, processed, success_count, error_count)
            .await?;
        if !import_errors.is_empty() {
            self.repo
                .update_validation_errors(job.id, &import_errors)
                .await?;
        }

        let final_status = if error_count == 0 {
            ImportJobStatus::Completed
        } else {
            ImportJobStatus::Failed
        };
        self.repo.update_status(job.id, final_status).await?;

        info!(
            "Import job {} finished: {} processed, {} succeeded, {} failed",
            job.id, processed, success_count, error_count
        );
        Ok(())
    }

    async fn create_entity(
        &self,
        job: &ImportJob,
        mode: ImportMode,
        request: &EntityCreationRequest,
    ) -> Result<()> {
        match request {
            EntityCreationRequest::Camper(camper) => {
                self.campers
                    .create(job.tenant_id, job.camp_id, mode, camper)
                    .await?;
            }
        }
        Ok(())
    }
}

// ==========================================================================
// Tests
// ==========================================================================
