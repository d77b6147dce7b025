//! Employee import pipeline.
//!
//! Two layers: [`ImportRunner`] holds the actual pipeline (fetch file, parse,
//! validate, duplicate-check, upsert, finalize, notify) behind store traits
//! so it runs in tests without Postgres or NATS. [`EmployeeImportProcessor`]
//! wraps the runner with a JetStream work queue for:
//! - Persistence across restarts
//! - Automatic redelivery of jobs whose worker died mid-run
//!
//! ## Streams
//! - `ROSTERLINE_IMPORT_JOBS` - queued employee roster imports
//!
//! Row-level problems never abort a job: the offending row is skipped and
//! recorded, everything else commits. Stream-level problems (unreadable file,
//! bad header, store read failure) fail the whole job and are propagated to
//! the queue by leaving the message unacked.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_nats::jetstream::{self, Context as JsContext};
use async_nats::Client;
use futures::StreamExt;
use tracing::{error, info, warn};

use crate::services::duplicate_guard;
use crate::services::email_sender::EmailSender;
use crate::services::email_templates::{ImportCompletedEmail, ImportFailedEmail};
use crate::services::file_store::FileStore;
use crate::services::job_tracker::{BeginOutcome, ImportJobStore, JobTracker};
use crate::services::roster_store::RosterStore;
use crate::services::row_parser::RowReader;
use crate::services::row_validator::validate_row;
use crate::types::{
    ImportJobStatus, ImportJobStatusUpdate, ImportSummary, QueuedImportJob, RowDisposition,
    RowOutcome, SkipReason,
};

// Stream and consumer names
const STREAM_NAME: &str = "ROSTERLINE_IMPORT_JOBS";
const CONSUMER_NAME: &str = "employee_import_workers";
const SUBJECT: &str = "rosterline.jobs.import.employee";
const STATUS_PREFIX: &str = "rosterline.job.import.status";

/// What one delivery of a queued job amounted to.
#[derive(Debug)]
pub enum RunOutcome {
    /// The job ran to completion; rows were processed.
    Finished(ImportSummary),
    /// The job already reached this terminal status on an earlier delivery;
    /// nothing was done.
    Stale(ImportJobStatus),
}

/// Runs one import job end to end against pluggable stores.
pub struct ImportRunner {
    files: Arc<dyn FileStore>,
    roster: Arc<dyn RosterStore>,
    tracker: JobTracker<dyn ImportJobStore>,
    email: Arc<dyn EmailSender>,
    base_url: String,
}

impl ImportRunner {
    pub fn new(
        files: Arc<dyn FileStore>,
        roster: Arc<dyn RosterStore>,
        jobs: Arc<dyn ImportJobStore>,
        email: Arc<dyn EmailSender>,
        base_url: String,
    ) -> Self {
        Self {
            files,
            roster,
            tracker: JobTracker::new(jobs),
            email,
            base_url,
        }
    }

    /// Processes a queued job. A stale redelivery of a finished job reports
    /// the job's actual terminal status and touches nothing; a fatal error
    /// leaves the job marked failed and bubbles up so the caller can hand the
    /// message back to the queue.
    pub async fn run(&self, job: &QueuedImportJob) -> Result<RunOutcome> {
        match self.tracker.begin(job.job_id).await? {
            BeginOutcome::Started => {}
            BeginOutcome::AlreadyTerminal(status) => {
                info!(job_id = %job.job_id, status = %status,
                    "import job already finished, dropping stale delivery");
                return Ok(RunOutcome::Stale(status));
            }
        }

        match self.consume_rows(job).await {
            Ok(summary) => {
                self.tracker
                    .finalize(job.job_id, ImportJobStatus::Completed)
                    .await?;
                info!(job_id = %job.job_id, created = summary.created,
                    updated = summary.updated, skipped = summary.skipped,
                    "import job completed");
                self.notify_completed(job).await;
                Ok(RunOutcome::Finished(summary))
            }
            Err(e) => {
                // Best effort: the queue retry must not be masked by a
                // failing status write.
                if let Err(fin) = self.tracker.finalize(job.job_id, ImportJobStatus::Failed).await {
                    error!(job_id = %job.job_id, "could not mark import job failed: {:#}", fin);
                }
                error!(job_id = %job.job_id, "import job failed: {:#}", e);
                self.notify_failed(job, &e).await;
                Err(e)
            }
        }
    }

    async fn consume_rows(&self, job: &QueuedImportJob) -> Result<ImportSummary> {
        let bytes = self
            .files
            .open(&job.source_location)
            .await
            .with_context(|| format!("could not read import file '{}'", job.source_location))?;

        let reader = RowReader::open(bytes).context("could not parse import file")?;

        let mut summary = ImportSummary::default();
        for row in reader {
            let raw = row.context("import file stream broke mid-read")?;
            let number = raw.number;
            let disposition = self.process_row(job, &raw).await?;
            if let RowDisposition::Skipped(reason) = &disposition {
                warn!(job_id = %job.job_id, row = number, %reason, "import row skipped");
            }
            summary.record(RowOutcome {
                row_number: number,
                disposition,
            });
        }
        Ok(summary)
    }

    /// Decides the fate of a single row. Only store *read* failures escape as
    /// errors; everything row-shaped becomes a skip.
    async fn process_row(
        &self,
        job: &QueuedImportJob,
        raw: &crate::services::row_parser::RawRow,
    ) -> Result<RowDisposition> {
        let row = match validate_row(raw) {
            Ok(row) => row,
            Err(reason) => return Ok(RowDisposition::Skipped(reason)),
        };

        if let Some(reason) =
            duplicate_guard::check_row(self.roster.as_ref(), job.company_id, &row).await?
        {
            return Ok(RowDisposition::Skipped(reason));
        }

        match self.roster.upsert(job.company_id, &row).await {
            Ok(outcome) => Ok(RowDisposition::Applied(outcome)),
            Err(e) => Ok(RowDisposition::Skipped(SkipReason::StoreWrite(format!(
                "{:#}",
                e
            )))),
        }
    }

    async fn notify_completed(&self, job: &QueuedImportJob) {
        let message = ImportCompletedEmail {
            to: job.notify_email.clone(),
            status_url: format!("{}/imports/{}", self.base_url, job.job_id),
        }
        .render();
        if let Err(e) = self.email.send(&message).await {
            // A lost email never un-completes a finished import.
            warn!(job_id = %job.job_id, "could not send completion email: {:#}", e);
        }
    }

    async fn notify_failed(&self, job: &QueuedImportJob, error: &anyhow::Error) {
        let message = ImportFailedEmail {
            to: job.notify_email.clone(),
            error: format!("{:#}", error),
        }
        .render();
        if let Err(e) = self.email.send(&message).await {
            warn!(job_id = %job.job_id, "could not send failure email: {:#}", e);
        }
    }
}

/// Employee import processor with JetStream integration.
pub struct EmployeeImportProcessor {
    client: Client,
    js: JsContext,
    runner: ImportRunner,
}

impl EmployeeImportProcessor {
    /// Create a new processor, initializing the JetStream work queue.
    pub async fn new(client: Client, runner: ImportRunner) -> Result<Self> {
        let js = jetstream::new(client.clone());

        let stream_config = jetstream::stream::Config {
            name: STREAM_NAME.to_string(),
            subjects: vec![SUBJECT.to_string()],
            max_messages: 1_000,
            max_bytes: 10 * 1024 * 1024,
            retention: jetstream::stream::RetentionPolicy::WorkQueue,
            ..Default::default()
        };
        js.get_or_create_stream(stream_config).await?;
        info!("JetStream import stream '{}' ready", STREAM_NAME);

        Ok(Self { client, js, runner })
    }

    /// Enqueue an import job for background processing.
    pub async fn enqueue(&self, job: &QueuedImportJob) -> Result<()> {
        let payload = serde_json::to_vec(job)?;
        self.js.publish(SUBJECT, payload.into()).await?.await?;
        info!(job_id = %job.job_id, source = %job.source_location, "import job enqueued");

        self.publish_status(ImportJobStatusUpdate::new(job.job_id, ImportJobStatus::Pending))
            .await?;
        Ok(())
    }

    /// Publish a job status update for live subscribers.
    pub async fn publish_status(&self, update: ImportJobStatusUpdate) -> Result<()> {
        let subject = format!("{}.{}", STATUS_PREFIX, update.job_id);
        let payload = serde_json::to_vec(&update)?;
        self.client.publish(subject, payload.into()).await?;
        Ok(())
    }

    /// Start consuming import jobs from the queue. Runs until the stream
    /// closes.
    pub async fn start_processing(self: Arc<Self>) -> Result<()> {
        let stream = self.js.get_stream(STREAM_NAME).await?;

        let consumer_config = jetstream::consumer::pull::Config {
            durable_name: Some(CONSUMER_NAME.to_string()),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            max_deliver: 3,
            filter_subject: SUBJECT.to_string(),
            ..Default::default()
        };
        let consumer = stream
            .get_or_create_consumer(CONSUMER_NAME, consumer_config)
            .await?;
        info!("JetStream import consumer '{}' ready", CONSUMER_NAME);

        let mut messages = consumer.messages().await?;

        while let Some(msg) = messages.next().await {
            match msg {
                Ok(msg) => {
                    // Sequential to keep the DB load bounded.
                    if let Err(e) = self.process_message(msg).await {
                        error!("Failed to process import job: {:#}", e);
                    }
                }
                Err(e) => {
                    error!("Error receiving import message: {}", e);
                }
            }
        }

        Ok(())
    }

    async fn process_message(&self, msg: jetstream::Message) -> Result<()> {
        let job: QueuedImportJob = match serde_json::from_slice(&msg.payload) {
            Ok(job) => job,
            Err(e) => {
                // A payload that never deserializes will never succeed;
                // ack it so it is not redelivered forever.
                error!("Dropping malformed import job payload: {}", e);
                if let Err(e) = msg.ack().await {
                    error!("Failed to ack malformed import payload: {:?}", e);
                }
                return Ok(());
            }
        };

        match self.runner.run(&job).await {
            Ok(RunOutcome::Finished(_)) => {
                self.publish_status(ImportJobStatusUpdate::new(
                    job.job_id,
                    ImportJobStatus::Completed,
                ))
                .await?;
                if let Err(e) = msg.ack().await {
                    error!(job_id = %job.job_id, "Failed to ack import job: {:?}", e);
                }
                Ok(())
            }
            Ok(RunOutcome::Stale(_)) => {
                // The terminal status was already published by the delivery
                // that finished the job; just drop the redelivery.
                if let Err(e) = msg.ack().await {
                    error!(job_id = %job.job_id, "Failed to ack stale import delivery: {:?}", e);
                }
                Ok(())
            }
            Err(e) => {
                self.publish_status(ImportJobStatusUpdate::failed(job.job_id, format!("{:#}", e)))
                    .await?;
                // No ack: JetStream redelivers up to max_deliver. Redeliveries
                // of a job already marked failed are dropped by the runner.
                Err(e)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
