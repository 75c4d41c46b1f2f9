//! In-memory doubles for the persistence and collaborator traits.
//!
//! Test-only: these back the service, worker, and plugin tests without a
//! running Postgres. The job repository takes every progress update as a
//! snapshot so tests can assert counter invariants at each observed
//! point, not just the final state.

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::csvimport::entities::camper::{Group, GroupLookup, Session, SessionLookup};
use crate::db::import_jobs::ImportJobsRepository;
use crate::services::campers::{Camper, CamperCreationRequest, CampersService};
use crate::types::{ImportJob, ImportJobStatus, ImportMode, ValidationError};

/// One observed progress flush: (processed, success, error)
pub type ProgressSnapshot = (i32, i32, i32);

#[derive(Default)]
pub struct InMemoryImportJobsRepository {
    jobs: Mutex<HashMap<Uuid, ImportJob>>,
    progress_snapshots: Mutex<Vec<ProgressSnapshot>>,
    status_history: Mutex<Vec<ImportJobStatus>>,
}

impl InMemoryImportJobsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<ImportJob> {
        self.jobs.lock().get(&id).cloned()
    }

    pub fn insert(&self, job: ImportJob) {
        self.jobs.lock().insert(job.id, job);
    }

    pub fn progress_snapshots(&self) -> Vec<ProgressSnapshot> {
        self.progress_snapshots.lock().clone()
    }

    pub fn status_history(&self) -> Vec<ImportJobStatus> {
        self.status_history.lock().clone()
    }

    fn with_job<T>(&self, id: Uuid, f: impl FnOnce(&mut ImportJob) -> T) -> Result<T> {
        let mut jobs = self.jobs.lock();
        let job = jobs.get_mut(&id).ok_or_else(|| anyhow!("import job not found"))?;
        job.updated_at = Utc::now();
        Ok(f(job))
    }
}

#[async_trait]
impl ImportJobsRepository for InMemoryImportJobsRepository {
    async fn create(&self, job: &ImportJob) -> Result<()> {
        self.jobs.lock().insert(job.id, job.clone());
        Ok(())
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ImportJob>> {
        Ok(self
            .jobs
            .lock()
            .get(&id)
            .filter(|job| job.tenant_id == tenant_id)
            .cloned())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ImportJob>, i64)> {
        let jobs = self.jobs.lock();
        let mut matching: Vec<ImportJob> = jobs
            .values()
            .filter(|job| job.tenant_id == tenant_id && job.camp_id == camp_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_status(&self, id: Uuid, status: ImportJobStatus) -> Result<()> {
        self.status_history.lock().push(status);
        self.with_job(id, |job| job.status = status)
    }

    async fn claim_pending(&self, id: Uuid) -> Result<bool> {
        // Whole map locked: the check-and-set is atomic, like the
        // conditional UPDATE in the Postgres implementation
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(false);
        };
        if job.status != ImportJobStatus::Pending {
            return Ok(false);
        }
        job.status = ImportJobStatus::Validating;
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        processed_rows: i32,
        success_count: i32,
        error_count: i32,
    ) -> Result<()> {
        self.progress_snapshots
            .lock()
            .push((processed_rows, success_count, error_count));
        self.with_job(id, |job| {
            job.processed_rows = processed_rows;
            job.success_count = success_count;
            job.error_count = error_count;
        })
    }

    async fn update_validation_errors(&self, id: Uuid, errors: &[ValidationError]) -> Result<()> {
        self.with_job(id, |job| {
            job.validation_errors.extend_from_slice(errors);
        })
    }

    async fn set_total_rows(&self, id: Uuid, total_rows: i32) -> Result<()> {
        self.with_job(id, |job| job.total_rows = total_rows)
    }

    async fn get_pending_jobs(&self) -> Result<Vec<ImportJob>> {
        let jobs = self.jobs.lock();
        let mut pending: Vec<ImportJob> = jobs
            .values()
            .filter(|job| job.status == ImportJobStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|job| job.created_at);
        Ok(pending)
    }

    async fn get_old_completed_jobs(&self, older_than: DateTime<Utc>) -> Result<Vec<ImportJob>> {
        self.old_jobs(ImportJobStatus::Completed, older_than)
    }

    async fn get_old_failed_jobs(&self, older_than: DateTime<Utc>) -> Result<Vec<ImportJob>> {
        self.old_jobs(ImportJobStatus::Failed, older_than)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.jobs
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("import job not found"))
    }
}

impl InMemoryImportJobsRepository {
    fn old_jobs(
        &self,
        status: ImportJobStatus,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<ImportJob>> {
        let jobs = self.jobs.lock();
        let mut old: Vec<ImportJob> = jobs
            .values()
            .filter(|job| job.status == status && job.updated_at < older_than)
            .cloned()
            .collect();
        old.sort_by_key(|job| job.updated_at);
        Ok(old)
    }
}

pub struct InMemorySessionLookup {
    tenant_id: Uuid,
    camp_id: Uuid,
    sessions: Vec<Session>,
}

impl InMemorySessionLookup {
    pub fn with_sessions(tenant_id: Uuid, camp_id: Uuid, names: &[&str]) -> Self {
        Self {
            tenant_id,
            camp_id,
            sessions: names
                .iter()
                .map(|name| Session {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    pub fn id_of(&self, name: &str) -> Option<Uuid> {
        self.sessions.iter().find(|s| s.name == name).map(|s| s.id)
    }
}

#[async_trait]
impl SessionLookup for InMemorySessionLookup {
    async fn get_by_name(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        name: &str,
    ) -> Result<Option<Session>> {
        if tenant_id != self.tenant_id || camp_id != self.camp_id {
            return Ok(None);
        }
        Ok(self.sessions.iter().find(|s| s.name == name).cloned())
    }
}

pub struct InMemoryGroupLookup {
    tenant_id: Uuid,
    camp_id: Uuid,
    groups: Vec<Group>,
}

impl InMemoryGroupLookup {
    pub fn with_groups(tenant_id: Uuid, camp_id: Uuid, names: &[&str]) -> Self {
        Self {
            tenant_id,
            camp_id,
            groups: names
                .iter()
                .map(|name| Group {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl GroupLookup for InMemoryGroupLookup {
    async fn get_by_name(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        name: &str,
    ) -> Result<Option<Group>> {
        if tenant_id != self.tenant_id || camp_id != self.camp_id {
            return Ok(None);
        }
        Ok(self.groups.iter().find(|g| g.name == name).cloned())
    }
}

/// Records every creation request; fails for configured camper names so
/// tests can simulate downstream creation errors on specific rows.
#[derive(Default)]
pub struct RecordingCampersService {
    created: Mutex<Vec<CamperCreationRequest>>,
    fail_for_names: HashSet<String>,
}

impl RecordingCampersService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            fail_for_names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn created(&self) -> Vec<CamperCreationRequest> {
        self.created.lock().clone()
    }
}

#[async_trait]
impl CampersService for RecordingCampersService {
    async fn create(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        _mode: ImportMode,
        request: &CamperCreationRequest,
    ) -> Result<Camper> {
        if self.fail_for_names.contains(&request.name) {
            bail!("simulated creation failure for {}", request.name);
        }
        self.created.lock().push(request.clone());
        Ok(Camper {
            id: Uuid::new_v4(),
            tenant_id,
            camp_id,
            session_id: request.session_id,
            name: request.name.clone(),
            description: request.description.clone(),
            birthday: request.birthday,
            gender: request.gender,
            created_at: Utc::now(),
        })
    }
}

mod tests {
    use super::*;
    use crate::types::ImportEntityType;

    fn sample_job() -> ImportJob {
        ImportJob::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            ImportEntityType::Campers,
            ImportMode::Create,
            "/tmp/campers.csv".to_string(),
        )
    }

    // The Postgres implementation appends with jsonb concatenation;
    // the double must keep the same append-only ordering.
    #[tokio::test]
    async fn test_validation_errors_append_in_order() {
        let repo = InMemoryImportJobsRepository::new();
        let job = sample_job();
        let id = job.id;
        repo.insert(job);

        let first = vec![
            ValidationError::new(2, "sessionName", "session not found: Week Z"),
            ValidationError::new(3, "birthday", "invalid date format"),
        ];
        let second = vec![ValidationError::new(5, "creation", "duplicate camper")];
        repo.update_validation_errors(id, &first).await.unwrap();
        repo.update_validation_errors(id, &second).await.unwrap();

        let stored = repo.get(id).unwrap().validation_errors;
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].row, 2);
        assert_eq!(stored[0].field, "sessionName");
        assert_eq!(stored[1].row, 3);
        assert_eq!(stored[2].row, 5);
        assert_eq!(stored[2].field, "creation");
    }
}
