//! Entity validator contract and CSV-level validation driver

use async_trait::async_trait;
use uuid::Uuid;

use crate::csvimport::parser::CsvRow;
use crate::types::ValidationError;

/// Per-entity-type semantic validation capability.
///
/// Implementations are stateless beyond read-only lookup handles and are
/// registered once per entity type in the import registry.
#[async_trait]
pub trait EntityValidator: Send + Sync {
    /// Columns that must be present in the header row
    fn required_columns(&self) -> &[&'static str];

    /// Columns that may be present; anything outside required + optional
    /// is rejected as unknown
    fn optional_columns(&self) -> &[&'static str];

    /// Validate a single row. The row number for error reporting is the
    /// row's source line (`row.line`).
    async fn validate_row(&self, row: &CsvRow, tenant_id: Uuid, camp_id: Uuid)
        -> Vec<ValidationError>;
}

/// Check that every required column is present and no unknown column
/// sneaked in. Returns a human-readable message on failure.
pub fn validate_headers(
    headers: &[String],
    required: &[&str],
    optional: &[&str],
) -> Result<(), String> {
    let missing: Vec<&str> = required
        .iter()
        .filter(|req| !headers.iter().any(|h| h == *req))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing required columns: {}", missing.join(", ")));
    }

    let unknown: Vec<&str> = headers
        .iter()
        .filter(|h| !required.contains(&h.as_str()) && !optional.contains(&h.as_str()))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(format!("unknown columns: {}", unknown.join(", ")));
    }

    Ok(())
}

/// Validate all rows of a parsed CSV with the given validator.
///
/// A header failure short-circuits row validation entirely and yields a
/// single row-0 error; otherwise every row is checked and all errors are
/// collected in row order.
pub async fn validate_csv(
    rows: &[CsvRow],
    headers: &[String],
    validator: &dyn EntityValidator,
    tenant_id: Uuid,
    camp_id: Uuid,
) -> Vec<ValidationError> {
    if let Err(message) = validate_headers(
        headers,
        validator.required_columns(),
        validator.optional_columns(),
    ) {
        return vec![ValidationError::new(0, "headers", message)];
    }

    let mut all_errors = Vec::new();
    for row in rows {
        let row_errors = validator.validate_row(row, tenant_id, camp_id).await;
        all_errors.extend(row_errors);
    }
    all_errors
}

// ==========================================================================
// Tests
// ==========================================================================
