//! Import orchestration service
//!
//! Front door of the import pipeline: dry-run validation, job creation
//! (persist the upload, enqueue a pending job), and read access to job
//! state. Actual processing happens in the import worker.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::csvimport::{parse_csv, validate_csv, ImportRegistry};
use crate::db::import_jobs::ImportJobsRepository;
use crate::types::{ImportEntityType, ImportJob, ImportJobStatus, ImportMode, ValidationError};

#[derive(Debug, Error)]
pub enum ImportServiceError {
    #[error("no import support registered for entity type: {0}")]
    UnregisteredEntityType(ImportEntityType),
    #[error("import job not found")]
    NotFound,
    #[error("failed to store uploaded file: {0}")]
    Storage(#[from] std::io::Error),
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

pub struct ImportService {
    repo: Arc<dyn ImportJobsRepository>,
    registry: Arc<ImportRegistry>,
    upload_dir: PathBuf,
}

impl ImportService {
    pub fn new(
        repo: Arc<dyn ImportJobsRepository>,
        registry: Arc<ImportRegistry>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo,
            registry,
            upload_dir: upload_dir.into(),
        }
    }

    /// Dry-run validation of an uploaded CSV.
    ///
    /// Nothing is persisted and nothing is created: the returned job is an
    /// ephemeral result object (no mode, no file path). A file that cannot
    /// even be parsed yields a failed result with a single row-0 error
    /// rather than an error return, so callers always get the same shape.
    pub async fn validate_import(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        entity_type: ImportEntityType,
        file_content: &[u8],
    ) -> Result<ImportJob, ImportServiceError> {
        let validator = self
            .registry
            .validator(entity_type)
            .ok_or(ImportServiceError::UnregisteredEntityType(entity_type))?;

        let now = chrono::Utc::now();
        let mut job = ImportJob {
            id: Uuid::new_v4(),
            tenant_id,
            camp_id,
            entity_type,
            status: ImportJobStatus::Validating,
            mode: None,
            file_path: None,
            total_rows: 0,
            processed_rows: 0,
            success_count: 0,
            error_count: 0,
            validation_errors: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let (rows, headers) = match parse_csv(file_content) {
            Ok(parsed) => parsed,
            Err(e) => {
                job.status = ImportJobStatus::Failed;
                job.validation_errors = vec![ValidationError::new(0, "file", e.to_string())];
                job.error_count = 1;
                return Ok(job);
            }
        };

        job.total_rows = rows.len() as i32;
        let errors = validate_csv(&rows, &headers, validator.as_ref(), tenant_id, camp_id).await;

        if errors.is_empty() {
            job.status = ImportJobStatus::Validated;
        } else {
            job.status = ImportJobStatus::Failed;
            job.error_count = errors.len() as i32;
            job.validation_errors = errors;
        }

        Ok(job)
    }

    /// Persist the upload and enqueue a pending import job.
    ///
    /// The file lands under `upload_dir/tenant/camp/` with a unique name;
    /// if the job record cannot be created afterwards the file is removed
    /// again so no orphan uploads accumulate.
    pub async fn start_import(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        entity_type: ImportEntityType,
        mode: ImportMode,
        file_name: &str,
        file_content: &[u8],
    ) -> Result<ImportJob, ImportServiceError> {
        if !self.registry.is_registered(entity_type) {
            return Err(ImportServiceError::UnregisteredEntityType(entity_type));
        }

        let dir = self
            .upload_dir
            .join(tenant_id.to_string())
            .join(camp_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        // File name from the client is untrusted; keep only its final
        // component and prefix a fresh id so concurrent uploads never clash
        let base_name = std::path::Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        let stored_name = format!("{}_{}_{}", entity_type, Uuid::new_v4(), base_name);
        let path = dir.join(stored_name);
        tokio::fs::write(&path, file_content).await?;

        let job = ImportJob::new(
            tenant_id,
            camp_id,
            entity_type,
            mode,
            path.to_string_lossy().into_owned(),
        );

        if let Err(e) = self.repo.create(&job).await {
            // Roll the upload back; the job record is the source of truth
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove orphaned upload {}: {}", path.display(), remove_err);
            }
            return Err(ImportServiceError::Repository(e));
        }

        info!(
            "Created import job {} for {} ({} bytes)",
            job.id,
            entity_type,
            file_content.len()
        );
        Ok(job)
    }

    pub async fn get_import_status(
        &self,
        tenant_id: Uuid,
        job_id: Uuid,
    ) -> Result<ImportJob, ImportServiceError> {
        self.repo
            .get_by_id(tenant_id, job_id)
            .await?
            .ok_or(ImportServiceError::NotFound)
    }

    pub async fn list_import_jobs(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ImportJob>, i64), ImportServiceError> {
        Ok(self.repo.list(tenant_id, camp_id, limit, offset).await?)
    }
}

// ==========================================================================
// Tests
// ==========================================================================
