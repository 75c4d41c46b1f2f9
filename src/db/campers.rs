//! Postgres-backed camper creation service

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::services::campers::{Camper, CamperCreationRequest, CampersService};
use crate::types::ImportMode;

pub struct PgCampersService {
    pool: PgPool,
}

impl PgCampersService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_existing(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        session_id: Uuid,
        name: &str,
    ) -> Result<Option<Uuid>> {
        let id: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM campers \
             WHERE tenant_id = $1 AND camp_id = $2 AND session_id = $3 AND name = $4",
        )
        .bind(tenant_id)
        .bind(camp_id)
        .bind(session_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up existing camper")?;
        Ok(id)
    }

    async fn replace_group_memberships(&self, camper_id: Uuid, group_ids: &[Uuid]) -> Result<()> {
        sqlx::query("DELETE FROM camper_groups WHERE camper_id = $1")
            .bind(camper_id)
            .execute(&self.pool)
            .await
            .context("failed to clear camper group memberships")?;

        for group_id in group_ids {
            sqlx::query("INSERT INTO camper_groups (camper_id, group_id) VALUES ($1, $2)")
                .bind(camper_id)
                .bind(group_id)
                .execute(&self.pool)
                .await
                .context("failed to insert camper group membership")?;
        }
        Ok(())
    }
}

#[async_trait]
impl CampersService for PgCampersService {
    async fn create(
        &self,
        tenant_id: Uuid,
        camp_id: Uuid,
        mode: ImportMode,
        request: &CamperCreationRequest,
    ) -> Result<Camper> {
        let existing = self
            .find_existing(tenant_id, camp_id, request.session_id, &request.name)
            .await?;

        let id = match (mode, existing) {
            (ImportMode::Create, Some(_)) => {
                bail!("camper already exists in session: {}", request.name)
            }
            (ImportMode::Upsert, Some(id)) => {
                sqlx::query(
                    "UPDATE campers SET birthday = $2, gender = $3, description = $4, \
                     updated_at = NOW() WHERE id = $1",
                )
                .bind(id)
                .bind(request.birthday)
                .bind(request.gender.as_str())
                .bind(request.description.as_deref())
                .execute(&self.pool)
                .await
                .context("failed to update camper")?;
                id
            }
            (_, None) => {
                let id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO campers (id, tenant_id, camp_id, session_id, name, \
                     description, birthday, gender, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())",
                )
                .bind(id)
                .bind(tenant_id)
                .bind(camp_id)
                .bind(request.session_id)
                .bind(&request.name)
                .bind(request.description.as_deref())
                .bind(request.birthday)
                .bind(request.gender.as_str())
                .execute(&self.pool)
                .await
                .context("failed to create camper")?;
                id
            }
        };

        self.replace_group_memberships(id, &request.group_ids).await?;

        Ok(Camper {
            id,
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
