//! NATS message handlers

pub mod import;
pub mod ping;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use sqlx::PgPool;
use tokio::select;
use tracing::{error, info};

use crate::config::Config;
use crate::services::email_sender::create_email_sender;
use crate::services::file_store::LocalFileStore;
use crate::services::import_processor::{EmployeeImportProcessor, ImportRunner};
use crate::services::job_tracker::PgImportJobStore;
use crate::services::roster_store::PgRosterStore;

/// Start all message handlers
pub async fn start_handlers(client: Client, pool: PgPool, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let email_sender = create_email_sender()?;
    let runner = ImportRunner::new(
        Arc::new(LocalFileStore::new(&config.storage_dir)),
        Arc::new(PgRosterStore::new(pool.clone())),
        Arc::new(PgImportJobStore::new(pool.clone())),
        email_sender,
        config.app_base_url.clone(),
    );
    let processor = Arc::new(EmployeeImportProcessor::new(client.clone(), runner).await?);

    // Subscribe to all subjects
    let ping_sub = client.subscribe("rosterline.ping").await?;
    let import_submit_sub = client.subscribe("rosterline.import.employee.submit").await?;
    let import_status_sub = client.subscribe("rosterline.import.employee.status").await?;

    info!("Subscribed to NATS subjects");

    // Clone for each handler
    let client_ping = client.clone();
    let client_import_submit = client.clone();
    let client_import_status = client.clone();
    let pool_import_submit = pool.clone();
    let pool_import_status = pool.clone();
    let processor_submit = Arc::clone(&processor);

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub).await
    });

    let import_submit_handle = tokio::spawn(async move {
        import::handle_import_submit(
            client_import_submit,
            import_submit_sub,
            pool_import_submit,
            processor_submit,
        )
        .await
    });

    let import_status_handle = tokio::spawn(async move {
        import::handle_import_status(client_import_status, import_status_sub, pool_import_status)
            .await
    });

    let import_worker_handle = tokio::spawn(async move {
        processor.start_processing().await
    });

    info!("All handlers started");

    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = import_submit_handle => {
            error!("Import submit handler finished: {:?}", result);
        }
        result = import_status_handle => {
            error!("Import status handler finished: {:?}", result);
        }
        result = import_worker_handle => {
            error!("Import worker finished: {:?}", result);
        }
    }

    Ok(())
}
