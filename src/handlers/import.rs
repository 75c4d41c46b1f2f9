//! Import NATS handlers
//!
//! Four subjects front the import service: validate (dry run), start,
//! status, and list. File content travels base64-encoded inside the JSON
//! payload.

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::services::{ImportService, ImportServiceError};
use crate::types::{
    ErrorResponse, ImportEntityType, ImportJob, ImportMode, ListResponse, Request,
    SuccessResponse,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateImportRequest {
    pub tenant_id: Uuid,
    pub camp_id: Uuid,
    pub entity_type: ImportEntityType,
    /// Base64-encoded CSV bytes
    pub file_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartImportRequest {
    pub tenant_id: Uuid,
    pub camp_id: Uuid,
    pub entity_type: ImportEntityType,
    pub mode: ImportMode,
    pub file_name: String,
    /// Base64-encoded CSV bytes
    pub file_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatusRequest {
    pub tenant_id: Uuid,
    pub job_id: Uuid,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListImportJobsRequest {
    pub tenant_id: Uuid,
    pub camp_id: Uuid,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn error_code(e: &ImportServiceError) -> &'static str {
    match e {
        ImportServiceError::UnregisteredEntityType(_) => "INVALID_ENTITY_TYPE",
        ImportServiceError::NotFound => "NOT_FOUND",
        ImportServiceError::Storage(_) => "STORAGE_ERROR",
        ImportServiceError::Repository(_) => "INTERNAL_ERROR",
    }
}

/// Handle camp.import.validate requests (dry run, nothing persisted)
pub async fn handle_validate(
    client: Client,
    mut subscriber: Subscriber,
    service: Arc<ImportService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.validate message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ValidateImportRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse validate request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let content = match BASE64.decode(&request.payload.file_content) {
            Ok(content) => content,
            Err(e) => {
                let error = ErrorResponse::new(
                    request.id,
                    "INVALID_REQUEST",
                    format!("fileContent is not valid base64: {e}"),
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match service
            .validate_import(
                request.payload.tenant_id,
                request.payload.camp_id,
                request.payload.entity_type,
                &content,
            )
            .await
        {
            Ok(job) => {
                let response = SuccessResponse::new(request.id, job);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Validate import failed: {}", e);
                let error = ErrorResponse::new(request.id, error_code(&e), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle camp.import.start requests
pub async fn handle_start(
    client: Client,
    mut subscriber: Subscriber,
    service: Arc<ImportService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.start message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<StartImportRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse start request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let content = match BASE64.decode(&request.payload.file_content) {
            Ok(content) => content,
            Err(e) => {
                let error = ErrorResponse::new(
                    request.id,
                    "INVALID_REQUEST",
                    format!("fileContent is not valid base64: {e}"),
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match service
            .start_import(
                request.payload.tenant_id,
                request.payload.camp_id,
                request.payload.entity_type,
                request.payload.mode,
                &request.payload.file_name,
                &content,
            )
            .await
        {
            Ok(job) => {
                let response = SuccessResponse::new(request.id, job);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Start import failed: {}", e);
                let error = ErrorResponse::new(request.id, error_code(&e), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle camp.import.status requests
pub async fn handle_status(
    client: Client,
    mut subscriber: Subscriber,
    service: Arc<ImportService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ImportStatusRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse status request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match service
            .get_import_status(request.payload.tenant_id, request.payload.job_id)
            .await
        {
            Ok(job) => {
                let response = SuccessResponse::new(request.id, job);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                let error = ErrorResponse::new(request.id, error_code(&e), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle camp.import.list requests
pub async fn handle_list(
    client: Client,
    mut subscriber: Subscriber,
    service: Arc<ImportService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ListImportJobsRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse list request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let limit = request.payload.limit.clamp(1, 200);
        let offset = request.payload.offset.max(0);

        match service
            .list_import_jobs(
                request.payload.tenant_id,
                request.payload.camp_id,
                limit,
                offset,
            )
            .await
        {
            Ok((items, total)) => {
                let response = SuccessResponse::new(
                    request.id,
                    ListResponse::<ImportJob> {
                        items,
                        total,
                        limit,
                        offset,
                    },
                );
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("List import jobs failed: {}", e);
                let error = ErrorResponse::new(request.id, error_code(&e), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

// ==========================================================================
// Tests
// ==========================================================================
