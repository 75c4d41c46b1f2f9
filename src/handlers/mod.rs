//! NATS message handlers

pub mod import;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use tokio::select;
use tracing::{error, info};

use crate::services::ImportService;

/// Subscribe to every import subject and spawn one handler task per
/// subject. Returns only when a handler task exits, which means a
/// subscription died.
pub async fn start_handlers(client: Client, import_service: Arc<ImportService>) -> Result<()> {
    info!("Starting message handlers...");

    let validate_sub = client.subscribe("camp.import.validate").await?;
    let start_sub = client.subscribe("camp.import.start").await?;
    let status_sub = client.subscribe("camp.import.status").await?;
    let list_sub = client.subscribe("camp.import.list").await?;

    info!("Subscribed to NATS subjects");

    let client_validate = client.clone();
    let client_start = client.clone();
    let client_status = client.clone();
    let client_list = client.clone();

    let service_validate = Arc::clone(&import_service);
    let service_start = Arc::clone(&import_service);
    let service_status = Arc::clone(&import_service);
    let service_list = Arc::clone(&import_service);

    let validate_handle = tokio::spawn(async move {
        import::handle_validate(client_validate, validate_sub, service_validate).await
    });

    let start_handle = tokio::spawn(async move {
        import::handle_start(client_start, start_sub, service_start).await
    });

    let status_handle = tokio::spawn(async move {
        import::handle_status(client_status, status_sub, service_status).await
    });

    let list_handle = tokio::spawn(async move {
        import::handle_list(client_list, list_sub, service_list).await
    });

    info!("All handlers started, waiting for messages...");

    // Any handler finishing means its subscription is gone
    select! {
        result = validate_handle => {
            error!("Import validate handler finished: {:?}", result);
        }
        result = start_handle => {
            error!("Import start handler finished: {:?}", result);
        }
        result = status_handle => {
            error!("Import status handler finished: {:?}", result);
        }
        result = list_handle => {
            error!("Import list handler finished: {:?}", result);
        }
    }

    Ok(())
}
