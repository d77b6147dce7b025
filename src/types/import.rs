//! Import job types: the persisted job record, its status state machine,
//! per-row outcomes and the NATS payloads around them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Job status state machine
// =============================================================================

/// Coarse lifecycle of one import job.
///
/// Status is monotonic: pending → in_progress → {completed, failed}. All
/// transition checks go through [`ImportJobStatus::can_transition`] so the
/// invariant lives in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportJobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ImportJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportJobStatus::Pending => "pending",
            ImportJobStatus::InProgress => "in_progress",
            ImportJobStatus::Completed => "completed",
            ImportJobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ImportJobStatus::Pending),
            "in_progress" => Some(ImportJobStatus::InProgress),
            "completed" => Some(ImportJobStatus::Completed),
            "failed" => Some(ImportJobStatus::Failed),
            _ => None,
        }
    }

    /// `completed` and `failed` absorb; nothing leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportJobStatus::Completed | ImportJobStatus::Failed)
    }

    pub fn can_transition(&self, next: ImportJobStatus) -> bool {
        use ImportJobStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress) | (InProgress, Completed) | (InProgress, Failed)
        )
    }
}

impl fmt::Display for ImportJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted import job record. Created when an upload is accepted, mutated
/// only by the import processor, retained for later status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub status: ImportJobStatus,
    pub source_location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Per-row outcomes
// =============================================================================

/// Why a row was not applied. Row-level only; surfaced in logs, never fatal
/// to the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A required column was empty or absent for this row.
    MissingField(String),
    /// A field was present but unusable (e.g. an unparseable hire date).
    InvalidField { field: String, value: String },
    /// The normalized cpf already belongs to a different roster record.
    DuplicateCpf { cpf: String },
    /// The email is already registered under a different company.
    DuplicateEmail { email: String },
    /// The store rejected the write for this row.
    StoreWrite(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField(field) => {
                write!(f, "required field '{}' is missing or empty", field)
            }
            SkipReason::InvalidField { field, value } => {
                write!(f, "field '{}' has invalid value '{}'", field, value)
            }
            SkipReason::DuplicateCpf { cpf } => {
                write!(f, "cpf {} already belongs to another employee", cpf)
            }
            SkipReason::DuplicateEmail { email } => {
                write!(f, "email {} is already registered in another company", email)
            }
            SkipReason::StoreWrite(err) => write!(f, "store write failed: {}", err),
        }
    }
}

/// What the upsert did for an applied row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDisposition {
    Applied(UpsertOutcome),
    Skipped(SkipReason),
}

/// Outcome of one input row. Ephemeral; aggregated into [`ImportSummary`]
/// for logging within a single run and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOutcome {
    /// 1-based file row number (the header is row 1, data starts at 2).
    pub row_number: u32,
    pub disposition: RowDisposition,
}

impl RowOutcome {
    pub fn applied(row_number: u32, outcome: UpsertOutcome) -> Self {
        Self {
            row_number,
            disposition: RowDisposition::Applied(outcome),
        }
    }

    pub fn skipped(row_number: u32, reason: SkipReason) -> Self {
        Self {
            row_number,
            disposition: RowDisposition::Skipped(reason),
        }
    }
}

/// Aggregate of one run, in file order.
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub outcomes: Vec<RowOutcome>,
}

impl ImportSummary {
    pub fn record(&mut self, outcome: RowOutcome) {
        match &outcome.disposition {
            RowDisposition::Applied(UpsertOutcome::Created) => self.created += 1,
            RowDisposition::Applied(UpsertOutcome::Updated) => self.updated += 1,
            RowDisposition::Skipped(_) => self.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn total_rows(&self) -> u32 {
        self.created + self.updated + self.skipped
    }
}

// =============================================================================
// Queue and wire payloads
// =============================================================================

/// One queued import job as published to JetStream. The submit handler
/// resolves the owner's notification address up front so the processor
/// never needs a user lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedImportJob {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub source_location: String,
    pub notify_email: String,
    pub submitted_at: DateTime<Utc>,
}

/// Payload of `rosterline.import.employee.submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSubmitRequest {
    pub source_location: String,
    pub company_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSubmitResponse {
    pub job_id: Uuid,
    pub message: String,
}

/// Payload of `rosterline.import.employee.status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatusRequest {
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatusResponse {
    pub status: ImportJobStatus,
    pub source_location: String,
}

/// Coarse terminal status update published per job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobStatusUpdate {
    pub job_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub status: ImportJobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportJobStatusUpdate {
    pub fn new(job_id: Uuid, status: ImportJobStatus) -> Self {
        Self {
            job_id,
            timestamp: Utc::now(),
            status,
            error: None,
        }
    }

    pub fn failed(job_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            job_id,
            timestamp: Utc::now(),
            status: ImportJobStatus::Failed,
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
