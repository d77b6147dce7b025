//! Handlers for the employee import subjects.
//!
//! `rosterline.import.employee.submit` records a pending job and hands it to
//! the JetStream queue; the reply comes back before any row is processed.
//! `rosterline.import.employee.status` reads the job back, scoped to its
//! owner.

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use chrono::Utc;
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::queries;
use crate::services::import_processor::EmployeeImportProcessor;
use crate::types::{
    ErrorResponse, ImportStatusRequest, ImportStatusResponse, ImportSubmitRequest,
    ImportSubmitResponse, QueuedImportJob, Request, SuccessResponse,
};

/// Handle rosterline.import.employee.submit requests
pub async fn handle_import_submit(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    processor: Arc<EmployeeImportProcessor>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        let request: Request<ImportSubmitRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse import submit request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let user_id = match request.user_id {
            Some(id) => id,
            None => {
                let error =
                    ErrorResponse::new(request.id, "UNAUTHORIZED", "Authentication required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match submit(&pool, &processor, user_id, &request.payload).await {
            Ok(response) => {
                info!(job_id = %response.job_id, user_id = %user_id, "import job accepted");
                let success = SuccessResponse::new(request.id, response);
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            Err(e) => {
                error!("Failed to submit import job: {:#}", e);
                let error = ErrorResponse::new(request.id, "SUBMIT_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

async fn submit(
    pool: &PgPool,
    processor: &EmployeeImportProcessor,
    user_id: Uuid,
    payload: &ImportSubmitRequest,
) -> Result<ImportSubmitResponse> {
    let notify_email = queries::user::find_email(pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} has no email on file", user_id))?;

    let job_id = queries::import_job::create(
        pool,
        user_id,
        payload.company_id,
        &payload.source_location,
    )
    .await?;

    processor
        .enqueue(&QueuedImportJob {
            job_id,
            user_id,
            company_id: payload.company_id,
            source_location: payload.source_location.clone(),
            notify_email,
            submitted_at: Utc::now(),
        })
        .await?;

    Ok(ImportSubmitResponse {
        job_id,
        message: "Import job submitted".to_string(),
    })
}

/// Handle rosterline.import.employee.status requests
pub async fn handle_import_status(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        let request: Request<ImportStatusRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse import status request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let user_id = match request.user_id {
            Some(id) => id,
            None => {
                let error =
                    ErrorResponse::new(request.id, "UNAUTHORIZED", "Authentication required");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        // Owner-scoped: a job belonging to someone else looks like a missing
        // job, never like a permission error.
        match queries::import_job::find_for_user(&pool, request.payload.job_id, user_id).await {
            Ok(Some(job)) => {
                let success = SuccessResponse::new(
                    request.id,
                    ImportStatusResponse {
                        status: job.status,
                        source_location: job.source_location,
                    },
                );
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            Ok(None) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "Import job not found");
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to load import job status: {:#}", e);
                let error = ErrorResponse::new(request.id, "STATUS_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
