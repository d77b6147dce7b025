//! Import job lifecycle tracking.
//!
//! All status writes go through [`JobTracker`] so the pending -> in_progress
//! -> completed|failed state machine is enforced in one place. Terminal
//! states never change again; redelivered queue messages for a finished job
//! come back as [`BeginOutcome::AlreadyTerminal`] and the caller acks them.

use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::types::{ImportJob, ImportJobStatus};

#[async_trait]
pub trait ImportJobStore: Send + Sync {
    async fn fetch(&self, job_id: Uuid) -> Result<Option<ImportJob>>;
    async fn set_status(&self, job_id: Uuid, status: ImportJobStatus) -> Result<()>;
}

pub struct PgImportJobStore {
    pool: PgPool,
}

impl PgImportJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportJobStore for PgImportJobStore {
    async fn fetch(&self, job_id: Uuid) -> Result<Option<ImportJob>> {
        queries::import_job::find(&self.pool, job_id).await
    }

    async fn set_status(&self, job_id: Uuid, status: ImportJobStatus) -> Result<()> {
        queries::import_job::set_status(&self.pool, job_id, status).await
    }
}

/// In-memory store backed by a mutex, for wiring the import pipeline in
/// tests without a database.
pub struct InMemoryImportJobStore {
    jobs: Mutex<Vec<ImportJob>>,
}

impl InMemoryImportJobStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, job: ImportJob) {
        self.jobs.lock().unwrap().push(job);
    }
}

impl Default for InMemoryImportJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportJobStore for InMemoryImportJobStore {
    async fn fetch(&self, job_id: Uuid) -> Result<Option<ImportJob>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == job_id)
            .cloned())
    }

    async fn set_status(&self, job_id: Uuid, status: ImportJobStatus) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) {
            job.status = status;
        }
        Ok(())
    }
}

/// Result of claiming a job for processing.
#[derive(Debug, PartialEq, Eq)]
pub enum BeginOutcome {
    /// The job was claimed (or resumed) and should be processed.
    Started,
    /// The job already finished; the message is stale and should be acked.
    AlreadyTerminal(ImportJobStatus),
}

pub struct JobTracker<S: ImportJobStore + ?Sized> {
    store: std::sync::Arc<S>,
}

impl<S: ImportJobStore + ?Sized> JobTracker<S> {
    pub fn new(store: std::sync::Arc<S>) -> Self {
        Self { store }
    }

    /// Claims the job: pending jobs move to in_progress, an in_progress job
    /// is resumed as-is (a prior attempt died mid-flight), terminal jobs are
    /// reported back untouched.
    pub async fn begin(&self, job_id: Uuid) -> Result<BeginOutcome> {
        let job = self
            .store
            .fetch(job_id)
            .await?
            .with_context(|| format!("import job {} not found", job_id))?;

        match job.status {
            ImportJobStatus::Pending => {
                self.store
                    .set_status(job_id, ImportJobStatus::InProgress)
                    .await?;
                Ok(BeginOutcome::Started)
            }
            ImportJobStatus::InProgress => {
                warn!(job_id = %job_id, "resuming import job left in_progress by a prior attempt");
                Ok(BeginOutcome::Started)
            }
            terminal => Ok(BeginOutcome::AlreadyTerminal(terminal)),
        }
    }

    /// Moves the job to a terminal status. Calling finalize on a job that is
    /// already terminal is a no-op, which makes queue redelivery harmless.
    pub async fn finalize(&self, job_id: Uuid, terminal: ImportJobStatus) -> Result<()> {
        debug_assert!(terminal.is_terminal());

        let job = self
            .store
            .fetch(job_id)
            .await?
            .with_context(|| format!("import job {} not found", job_id))?;

        if job.status.is_terminal() {
            return Ok(());
        }
        if !job.status.can_transition(terminal) {
            warn!(job_id = %job_id, from = %job.status, to = %terminal,
                "refusing invalid import job transition");
            return Ok(());
        }

        self.store.set_status(job_id, terminal).await?;
        info!(job_id = %job_id, status = %terminal, "import job finished");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    fn job_with_status(status: ImportJobStatus) -> ImportJob {
        ImportJob {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            status,
            source_location: "imports/roster.csv".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tracker_with(
        status: ImportJobStatus,
    ) -> (JobTracker<InMemoryImportJobStore>, Arc<InMemoryImportJobStore>, Uuid) {
        let store = Arc::new(InMemoryImportJobStore::new());
        let job = job_with_status(status);
        let id = job.id;
        store.insert(job);
        (JobTracker::new(store.clone()), store, id)
    }

    #[tokio::test]
    async fn begin_claims_pending_job() {
        let (tracker, store, id) = tracker_with(ImportJobStatus::Pending);
        assert_eq!(tracker.begin(id).await.unwrap(), BeginOutcome::Started);
        let job = store.fetch(id).await.unwrap().unwrap();
        assert_eq!(job.status, ImportJobStatus::InProgress);
    }

    #[tokio::test]
    async fn begin_resumes_in_progress_job() {
        let (tracker, _, id) = tracker_with(ImportJobStatus::InProgress);
        assert_eq!(tracker.begin(id).await.unwrap(), BeginOutcome::Started);
    }

    #[tokio::test]
    async fn begin_reports_terminal_job() {
        let (tracker, _, id) = tracker_with(ImportJobStatus::Completed);
        assert_eq!(
            tracker.begin(id).await.unwrap(),
            BeginOutcome::AlreadyTerminal(ImportJobStatus::Completed)
        );
    }

    #[tokio::test]
    async fn begin_errors_on_unknown_job() {
        let tracker = JobTracker::new(Arc::new(InMemoryImportJobStore::new()));
        assert!(tracker.begin(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn finalize_moves_in_progress_to_completed() {
        let (tracker, store, id) = tracker_with(ImportJobStatus::InProgress);
        tracker.finalize(id, ImportJobStatus::Completed).await.unwrap();
        let job = store.fetch(id).await.unwrap().unwrap();
        assert_eq!(job.status, ImportJobStatus::Completed);
    }

    #[tokio::test]
    async fn finalize_on_terminal_job_is_a_noop() {
        let (tracker, store, id) = tracker_with(ImportJobStatus::Completed);
        tracker.finalize(id, ImportJobStatus::Failed).await.unwrap();
        let job = store.fetch(id).await.unwrap().unwrap();
        assert_eq!(job.status, ImportJobStatus::Completed);
    }

    #[tokio::test]
    async fn finalize_refuses_pending_to_terminal() {
        let (tracker, store, id) = tracker_with(ImportJobStatus::Pending);
        tracker.finalize(id, ImportJobStatus::Failed).await.unwrap();
        let job = store.fetch(id).await.unwrap().unwrap();
        assert_eq!(job.status, ImportJobStatus::Pending);
    }
}
