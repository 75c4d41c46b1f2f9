//! Import job persistence
//!
//! The repository trait is the pipeline's only coordination point: the
//! service creates jobs, the import worker claims and mutates them, the
//! cleanup worker deletes them. The Postgres implementation stores
//! validation errors as a JSONB array.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::types::{ImportEntityType, ImportJob, ImportJobStatus, ImportMode, ValidationError};

/// Persistence contract for import jobs.
#[async_trait]
pub trait ImportJobsRepository: Send + Sync {
    async fn create(&self, job: &ImportJob) -> Result<()>;
    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ImportJob>>;
    async fn list(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ImportJob>, i64)>;
    async fn update_status(&self, id: Uuid, status: ImportJobStatus) -> Result<()>;
    /// Atomic claim: transition `pending -> validating` only if the job
    /// is still pending. Returns false when another worker won the race.
    async fn claim_pending(&self, id: Uuid) -> Result<bool>;
    async fn update_progress(
        &self,
        id: Uuid,
        processed_rows: i32,
        success_count: i32,
        error_count: i32,
    ) -> Result<()>;
    /// Append `errors` to the job's ordered validation-error list;
    /// earlier entries are never replaced or reordered.
    async fn update_validation_errors(&self, id: Uuid, errors: &[ValidationError]) -> Result<()>;
    async fn set_total_rows(&self, id: Uuid, total_rows: i32) -> Result<()>;
    async fn get_pending_jobs(&self) -> Result<Vec<ImportJob>>;
    async fn get_old_completed_jobs(&self, older_than: DateTime<Utc>) -> Result<Vec<ImportJob>>;
    async fn get_old_failed_jobs(&self, older_than: DateTime<Utc>) -> Result<Vec<ImportJob>>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Postgres-backed import jobs repository
pub struct PgImportJobsRepository {
    pool: PgPool,
}

impl PgImportJobsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const JOB_COLUMNS: &str = "id, tenant_id, camp_id, entity_type, status, mode, file_path, \
     total_rows, processed_rows, success_count, error_count, validation_errors, \
     created_at, updated_at";

fn row_to_job(row: &PgRow) -> Result<ImportJob> {
    let entity_type_str: String = row.try_get("entity_type")?;
    let entity_type = ImportEntityType::parse(&entity_type_str)
        .ok_or_else(|| anyhow!("unknown entity type in import_jobs row: {entity_type_str}"))?;

    let status_str: String = row.try_get("status")?;
    let status = ImportJobStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("unknown status in import_jobs row: {status_str}"))?;

    let mode_str: String = row.try_get("mode")?;
    let mode = ImportMode::parse(&mode_str)
        .ok_or_else(|| anyhow!("unknown mode in import_jobs row: {mode_str}"))?;

    let errors_value: Option<serde_json::Value> = row.try_get("validation_errors")?;
    let validation_errors = match errors_value {
        Some(value) => {
            serde_json::from_value(value).context("failed to decode validation errors")?
        }
        None => Vec::new(),
    };

    Ok(ImportJob {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        camp_id: row.try_get("camp_id")?,
        entity_type,
        status,
        mode: Some(mode),
        file_path: row.try_get("file_path")?,
        total_rows: row.try_get("total_rows")?,
        processed_rows: row.try_get("processed_rows")?,
        success_count: row.try_get("success_count")?,
        error_count: row.try_get("error_count")?,
        validation_errors,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ImportJobsRepository for PgImportJobsRepository {
    async fn create(&self, job: &ImportJob) -> Result<()> {
        let mode = job
            .mode
            .context("cannot persist an ephemeral dry-run result")?;

        sqlx::query(
            r#"
            INSERT INTO import_jobs (id, tenant_id, camp_id, entity_type, status, mode,
                file_path, total_rows, processed_rows, success_count, error_count,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, 0, 0, NOW(), NOW())
            "#,
        )
        .bind(job.id)
        .bind(job.tenant_id)
        .bind(job.camp_id)
        .bind(job.entity_type.as_str())
        .bind(job.status.as_str())
        .bind(mode.as_str())
        .bind(job.file_path.as_deref())
        .execute(&self.pool)
        .await
        .context("failed to create import job")?;

        Ok(())
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ImportJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM import_jobs WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to get import job")?;

        row.as_ref().map(row_to_job).transpose()
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ImportJob>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM import_jobs WHERE tenant_id = $1 AND camp_id = $2",
        )
        .bind(tenant_id)
        .bind(camp_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to count import jobs")?;

        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM import_jobs \
             WHERE tenant_id = $1 AND camp_id = $2 \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(tenant_id)
        .bind(camp_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("failed to list import jobs")?;

        let jobs = rows.iter().map(row_to_job).collect::<Result<Vec<_>>>()?;
        Ok((jobs, total))
    }

    async fn update_status(&self, id: Uuid, status: ImportJobStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE import_jobs SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .context("failed to update import job status")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("import job not found"));
        }
        Ok(())
    }

    async fn claim_pending(&self, id: Uuid) -> Result<bool> {
        // Conditional update: only one racing worker can flip the status
        let result = sqlx::query(
            "UPDATE import_jobs SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(ImportJobStatus::Validating.as_str())
        .bind(ImportJobStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .context("failed to claim import job")?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        processed_rows: i32,
        success_count: i32,
        error_count: i32,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE import_jobs SET processed_rows = $2, success_count = $3, \
             error_count = $4, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(processed_rows)
        .bind(success_count)
        .bind(error_count)
        .execute(&self.pool)
        .await
        .context("failed to update import job progress")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("import job not found"));
        }
        Ok(())
    }

    async fn update_validation_errors(&self, id: Uuid, errors: &[ValidationError]) -> Result<()> {
        let value = serde_json::to_value(errors)?;
        // jsonb || jsonb concatenates arrays, keeping earlier entries
        let result = sqlx::query(
            "UPDATE import_jobs SET \
             validation_errors = COALESCE(validation_errors, '[]'::jsonb) || $2, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("failed to update import job validation errors")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("import job not found"));
        }
        Ok(())
    }

    async fn set_total_rows(&self, id: Uuid, total_rows: i32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE import_jobs SET total_rows = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(total_rows)
        .execute(&self.pool)
        .await
        .context("failed to update import job total rows")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("import job not found"));
        }
        Ok(())
    }

    async fn get_pending_jobs(&self) -> Result<Vec<ImportJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM import_jobs WHERE status = $1 ORDER BY created_at ASC"
        ))
        .bind(ImportJobStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await
        .context("failed to get pending import jobs")?;

        rows.iter().map(row_to_job).collect()
    }

    async fn get_old_completed_jobs(&self, older_than: DateTime<Utc>) -> Result<Vec<ImportJob>> {
        self.get_old_jobs(ImportJobStatus::Completed, older_than).await
    }

    async fn get_old_failed_jobs(&self, older_than: DateTime<Utc>) -> Result<Vec<ImportJob>> {
        self.get_old_jobs(ImportJobStatus::Failed, older_than).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM import_jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete import job")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("import job not found"));
        }
        Ok(())
    }
}

impl PgImportJobsRepository {
    async fn get_old_jobs(
        &self,
        status: ImportJobStatus,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<ImportJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM import_jobs \
             WHERE status = $1 AND updated_at < $2 ORDER BY updated_at ASC"
        ))
        .bind(status.as_str())
        .bind(older_than)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to get old {} import jobs", status.as_str()))?;

        rows.iter().map(row_to_job).collect()
    }
}
