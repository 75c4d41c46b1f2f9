//! Camper creation service contract
//!
//! The import worker only ever calls `create`; everything else about
//! camper management lives in the CRUD services outside this worker.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ImportMode;

/// Camper gender enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::NonBinary => "non-binary",
            Gender::Other => "other",
        }
    }

    /// Case-insensitive parse of the CSV value
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "non-binary" => Some(Gender::NonBinary),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// Request to create a single camper, with all named references already
/// resolved to identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CamperCreationRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub birthday: NaiveDate,
    pub gender: Gender,
    pub session_id: Uuid,
    #[serde(default)]
    pub group_ids: Vec<Uuid>,
}

/// A created camper as returned by the creation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camper {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub camp_id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub birthday: NaiveDate,
    pub gender: Gender,
    pub created_at: DateTime<Utc>,
}

/// Entity-creation collaborator for campers.
///
/// `mode` follows the job: `create` rejects a camper that already exists
/// in the session, `upsert` updates it in place.
#[async_trait]
pub trait CampersService: Send + Sync {
    async fn create(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        mode: ImportMode,
        request: &CamperCreationRequest,
    ) -> Result<Camper>;
}
