//! Entity mapper contract

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::csvimport::parser::CsvRow;
use crate::services::campers::CamperCreationRequest;

/// A creation request for one of the importable entity types.
///
/// Closed set: the import worker dispatches on this to the matching
/// entity-creation service.
#[derive(Debug, Clone)]
pub enum EntityCreationRequest {
    Camper(CamperCreationRequest),
}

/// Per-entity-type mapping capability.
///
/// Called only on rows that already passed validation. Named references
/// (session, group) are resolved again here, independently of the
/// validation pass, because state may have changed in between; an
/// unresolvable reference is a per-row import error, never a crash.
#[async_trait]
pub trait EntityMapper: Send + Sync {
    async fn map_row(
        &self,
        row: &CsvRow,
        tenant_id: Uuid,
        camp_id: Uuid,
    ) -> Result<EntityCreationRequest>;
}
