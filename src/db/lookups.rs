//! Postgres-backed reference lookups used by validators and mappers

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::csvimport::entities::camper::{Group, GroupLookup, Session, SessionLookup};

pub struct PgSessionLookup {
    pool: PgPool,
}

impl PgSessionLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionLookup for PgSessionLookup {
    async fn get_by_name(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        name: &str,
    ) -> Result<Option<Session>> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            "SELECT id, name FROM sessions WHERE tenant_id = $1 AND camp_id = $2 AND name = $3",
        )
        .bind(tenant_id)
        .bind(camp_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up session by name")?;

        Ok(row.map(|(id, name)| Session { id, name }))
    }
}

pub struct PgGroupLookup {
    pool: PgPool,
}

impl PgGroupLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupLookup for PgGroupLookup {
    async fn get_by_name(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        name: &str,
    ) -> Result<Option<Group>> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            "SELECT id, name FROM groups WHERE tenant_id = $1 AND camp_id = $2 AND name = $3",
        )
        .bind(tenant_id)
        .bind(camp_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up group by name")?;

        Ok(row.map(|(id, name)| Group { id, name }))
    }
}
