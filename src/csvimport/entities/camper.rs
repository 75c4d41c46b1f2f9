//! Camper import plugin: validator and mapper for camper CSV rows
//!
//! Required columns: name, birthday, gender, sessionName.
//! Optional columns: description, groupNames (comma-separated list).

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::csvimport::mapper::{EntityCreationRequest, EntityMapper};
use crate::csvimport::parser::CsvRow;
use crate::csvimport::validator::EntityValidator;
use crate::services::campers::{CamperCreationRequest, Gender};
use crate::types::ValidationError;

const REQUIRED_COLUMNS: &[&str] = &["name", "birthday", "gender", "sessionName"];
const OPTIONAL_COLUMNS: &[&str] = &["description", "groupNames"];

/// Accepted birthday formats. `%m/%d/%Y` also matches non-padded
/// month/day values.
const BIRTHDAY_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// A camp session, as seen by the import pipeline
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub name: String,
}

/// A camper group, as seen by the import pipeline
#[derive(Debug, Clone)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
}

/// Session-by-name lookup, scoped to tenant and camp
#[async_trait]
pub trait SessionLookup: Send + Sync {
    async fn get_by_name(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        name: &str,
    ) -> Result<Option<Session>>;
}

/// Group-by-name lookup, scoped to tenant and camp
#[async_trait]
pub trait GroupLookup: Send + Sync {
    async fn get_by_name(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        name: &str,
    ) -> Result<Option<Group>>;
}

fn parse_birthday(s: &str) -> Option<NaiveDate> {
    BIRTHDAY_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

fn split_group_names(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|name| !name.is_empty())
}

/// Validates camper CSV rows
pub struct CamperImportValidator {
    sessions: Arc<dyn SessionLookup>,
    groups: Arc<dyn GroupLookup>,
}

impl CamperImportValidator {
    pub fn new(sessions: Arc<dyn SessionLookup>, groups: Arc<dyn GroupLookup>) -> Self {
        Self { sessions, groups }
    }
}

#[async_trait]
impl EntityValidator for CamperImportValidator {
    fn required_columns(&self) -> &[&'static str] {
        REQUIRED_COLUMNS
    }

    fn optional_columns(&self) -> &[&'static str] {
        OPTIONAL_COLUMNS
    }

    async fn validate_row(
        &self,
        row: &CsvRow,
        tenant_id: Uuid,
        camp_id: Uuid,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let line = row.line;

        let name = row.get("name");
        if name.is_empty() {
            errors.push(ValidationError::new(
                line,
                "name",
                "name is required and cannot be empty",
            ));
        }

        let birthday_str = row.get("birthday");
        if birthday_str.is_empty() {
            errors.push(ValidationError::new(line, "birthday", "birthday is required"));
        } else {
            match parse_birthday(birthday_str) {
                None => errors.push(ValidationError::new(
                    line,
                    "birthday",
                    format!("invalid birthday format: {birthday_str} (expected YYYY-MM-DD)"),
                )),
                Some(birthday) => {
                    if birthday > Utc::now().date_naive() {
                        errors.push(ValidationError::new(
                            line,
                            "birthday",
                            "birthday cannot be in the future",
                        ));
                    }
                }
            }
        }

        let gender = row.get("gender");
        if gender.is_empty() {
            errors.push(ValidationError::new(line, "gender", "gender is required"));
        } else if Gender::parse(gender).is_none() {
            errors.push(ValidationError::new(
                line,
                "gender",
                format!("invalid gender: {gender} (must be one of: male, female, non-binary, other)"),
            ));
        }

        let session_name = row.get("sessionName");
        if session_name.is_empty() {
            errors.push(ValidationError::new(
                line,
                "sessionName",
                "sessionName is required",
            ));
        } else {
            match self
                .sessions
                .get_by_name(tenant_id, camp_id, session_name)
                .await
            {
                Ok(Some(_)) => {}
                Ok(None) => errors.push(ValidationError::new(
                    line,
                    "sessionName",
                    format!("session not found: {session_name}"),
                )),
                Err(e) => errors.push(ValidationError::new(
                    line,
                    "sessionName",
                    format!("failed to look up session {session_name}: {e:#}"),
                )),
            }
        }

        for group_name in split_group_names(row.get("groupNames")) {
            match self.groups.get_by_name(tenant_id, camp_id, group_name).await {
                Ok(Some(_)) => {}
                Ok(None) => errors.push(ValidationError::new(
                    line,
                    "groupNames",
                    format!("group not found: {group_name}"),
                )),
                Err(e) => errors.push(ValidationError::new(
                    line,
                    "groupNames",
                    format!("failed to look up group {group_name}: {e:#}"),
                )),
            }
        }

        errors
    }
}

/// Maps validated camper CSV rows to creation requests.
///
/// Re-resolves session and group names on its own; the validator's
/// results are never reused because the referenced entities may have
/// changed between validation and import.
pub struct CamperImportMapper {
    sessions: Arc<dyn SessionLookup>,
    groups: Arc<dyn GroupLookup>,
}

impl CamperImportMapper {
    pub fn new(sessions: Arc<dyn SessionLookup>, groups: Arc<dyn GroupLookup>) -> Self {
        Self { sessions, groups }
    }
}

#[async_trait]
impl EntityMapper for CamperImportMapper {
    async fn map_row(
        &self,
        row: &CsvRow,
        tenant_id: Uuid,
        camp_id: Uuid,
    ) -> Result<EntityCreationRequest> {
        let birthday_str = row.get("birthday");
        let birthday = parse_birthday(birthday_str)
            .with_context(|| format!("invalid birthday format: {birthday_str}"))?;

        let gender_str = row.get("gender");
        let gender = Gender::parse(gender_str)
            .with_context(|| format!("invalid gender: {gender_str}"))?;

        let session_name = row.get("sessionName");
        let session = self
            .sessions
            .get_by_name(tenant_id, camp_id, session_name)
            .await?;
        let session = match session {
            Some(session) => session,
            None => bail!("session not found: {session_name}"),
        };

        let mut group_ids = Vec::new();
        for group_name in split_group_names(row.get("groupNames")) {
            match self.groups.get_by_name(tenant_id, camp_id, group_name).await? {
                Some(group) => group_ids.push(group.id),
                None => bail!("group not found: {group_name}"),
            }
        }

        let description = row.get("description");
        Ok(EntityCreationRequest::Camper(CamperCreationRequest {
            name: row.get("name").to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            birthday,
            gender,
            session_id: session.id,
            group_ids,
        }))
    }
}

// ==========================================================================
// Tests
// ==========================================================================
