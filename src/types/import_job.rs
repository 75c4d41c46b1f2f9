//! Import job types for the asynchronous CSV import pipeline
//!
//! An `ImportJob` is the persisted unit of work: it tracks which file is
//! being imported for which tenant/camp, how far processing has gotten,
//! and every validation error collected along the way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an import job.
///
/// Transitions only move forward:
/// `pending -> validating -> validated -> importing -> completed | failed`,
/// with `failed` also reachable directly from `validating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportJobStatus {
    Pending,
    Validating,
    Validated,
    Importing,
    Completed,
    Failed,
}

impl ImportJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportJobStatus::Pending => "pending",
            ImportJobStatus::Validating => "validating",
            ImportJobStatus::Validated => "validated",
            ImportJobStatus::Importing => "importing",
            ImportJobStatus::Completed => "completed",
            ImportJobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ImportJobStatus::Pending),
            "validating" => Some(ImportJobStatus::Validating),
            "validated" => Some(ImportJobStatus::Validated),
            "importing" => Some(ImportJobStatus::Importing),
            "completed" => Some(ImportJobStatus::Completed),
            "failed" => Some(ImportJobStatus::Failed),
            _ => None,
        }
    }

    /// Terminal jobs are never processed again; only the cleanup worker
    /// touches them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportJobStatus::Completed | ImportJobStatus::Failed)
    }
}

/// Import mode. Only affects the entity-creation service contract,
/// never the pipeline's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Reject rows whose entity already exists
    Create,
    /// Create-or-update
    Upsert,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Create => "create",
            ImportMode::Upsert => "upsert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(ImportMode::Create),
            "upsert" => Some(ImportMode::Upsert),
            _ => None,
        }
    }
}

/// The closed set of importable entity types.
///
/// Adding a new importable type means adding a variant here and one
/// registry entry in `main`, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportEntityType {
    Campers,
    StaffMembers,
    Groups,
}

impl ImportEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportEntityType::Campers => "campers",
            ImportEntityType::StaffMembers => "staff_members",
            ImportEntityType::Groups => "groups",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "campers" => Some(ImportEntityType::Campers),
            "staff_members" => Some(ImportEntityType::StaffMembers),
            "groups" => Some(ImportEntityType::Groups),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImportEntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation error for one row of the CSV.
///
/// `row` is 1-based counting from the header line; row 0 means a
/// header-level or file-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub row: i32,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(row: i32, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// An asynchronous CSV import operation and its audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub camp_id: Uuid,
    pub entity_type: ImportEntityType,
    pub status: ImportJobStatus,
    /// None only for the ephemeral result of a dry-run validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ImportMode>,
    /// Path to the persisted upload; never present for a dry-run result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub success_count: i32,
    pub error_count: i32,
    /// Ordered, append-only; preserved after the job reaches a terminal
    /// state so operators can diagnose what went wrong
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<ValidationError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    /// Create a new pending job backed by a persisted file.
    pub fn new(
        tenant_id: Uuid,
        camp_id: Uuid,
        entity_type: ImportEntityType,
        mode: ImportMode,
        file_path: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            camp_id,
            entity_type,
            status: ImportJobStatus::Pending,
            mode: Some(mode),
            file_path: Some(file_path),
            total_rows: 0,
            processed_rows: 0,
            success_count: 0,
            error_count: 0,
            validation_errors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

// ==========================================================================
// Tests
// ==========================================================================
