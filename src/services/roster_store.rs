//! Roster store abstraction.
//!
//! The relational store itself is an external collaborator; the import
//! pipeline needs exactly three operations from it: the two uniqueness
//! lookups the duplicate guard runs, and the email-keyed upsert. The trait
//! is object-safe so the processor can hold `Arc<dyn RosterStore>`;
//! `PgRosterStore` delegates to `db::queries::employee`,
//! `InMemoryRosterStore` backs the pipeline tests.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries;
use crate::types::{EmployeeRecord, EmployeeRow, UpsertOutcome};

#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn find_by_cpf(&self, cpf: &str) -> Result<Option<EmployeeRecord>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<EmployeeRecord>>;

    /// Insert-or-update keyed by email within `company_id`. The only point
    /// that mutates the roster.
    async fn upsert(&self, company_id: Uuid, row: &EmployeeRow) -> Result<UpsertOutcome>;
}

// =============================================================================
// PgRosterStore — production
// =============================================================================

pub struct PgRosterStore {
    pool: PgPool,
}

impl PgRosterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterStore for PgRosterStore {
    async fn find_by_cpf(&self, cpf: &str) -> Result<Option<EmployeeRecord>> {
        queries::employee::find_by_cpf(&self.pool, cpf).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<EmployeeRecord>> {
        queries::employee::find_by_email(&self.pool, email).await
    }

    async fn upsert(&self, company_id: Uuid, row: &EmployeeRow) -> Result<UpsertOutcome> {
        queries::employee::upsert_by_email(&self.pool, company_id, row).await
    }
}

// =============================================================================
// InMemoryRosterStore — tests
// =============================================================================

/// Vec-backed roster for tests. `fail_upsert_for` makes a single email
/// produce a write error, to exercise per-row failure isolation.
#[derive(Default)]
pub struct InMemoryRosterStore {
    records: Mutex<Vec<EmployeeRecord>>,
    failing_emails: Mutex<HashSet<String>>,
}

impl InMemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upsert_for(&self, email: impl Into<String>) {
        self.failing_emails
            .lock()
            .unwrap()
            .insert(email.into().to_lowercase());
    }

    pub fn records(&self) -> Vec<EmployeeRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RosterStore for InMemoryRosterStore {
    async fn find_by_cpf(&self, cpf: &str) -> Result<Option<EmployeeRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.cpf == cpf)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<EmployeeRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn upsert(&self, company_id: Uuid, row: &EmployeeRow) -> Result<UpsertOutcome> {
        if self
            .failing_emails
            .lock()
            .unwrap()
            .contains(&row.email.to_lowercase())
        {
            return Err(anyhow!("simulated write failure for {}", row.email));
        }

        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.company_id == company_id && r.email.eq_ignore_ascii_case(&row.email))
        {
            existing.name = row.name.clone();
            existing.cpf = row.cpf.clone();
            existing.position = row.position.clone();
            existing.hired_at = row.hired_at;
            existing.updated_at = Utc::now();
            return Ok(UpsertOutcome::Updated);
        }

        let now = Utc::now();
        records.push(EmployeeRecord {
            id: Uuid::new_v4(),
            company_id,
            name: row.name.clone(),
            cpf: row.cpf.clone(),
            email: row.email.clone(),
            position: row.position.clone(),
            hired_at: row.hired_at,
            created_at: now,
            updated_at: now,
        });
        Ok(UpsertOutcome::Created)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(email: &str, cpf: &str) -> EmployeeRow {
        EmployeeRow {
            name: "Ana Souza".into(),
            cpf: cpf.into(),
            email: email.into(),
            position: "Dev".into(),
            hired_at: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let store = InMemoryRosterStore::new();
        let company = Uuid::new_v4();

        let outcome = store.upsert(company, &row("a@x.com", "111")).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let mut changed = row("a@x.com", "111");
        changed.position = "Lead".into();
        let outcome = store.upsert(company, &changed).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].position, "Lead");
    }

    #[tokio::test]
    async fn lookups_match_on_cpf_and_email() {
        let store = InMemoryRosterStore::new();
        let company = Uuid::new_v4();
        store.upsert(company, &row("a@x.com", "111")).await.unwrap();

        assert!(store.find_by_cpf("111").await.unwrap().is_some());
        assert!(store.find_by_cpf("222").await.unwrap().is_none());
        assert!(store.find_by_email("A@X.COM").await.unwrap().is_some());
        assert!(store.find_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_email_errors_on_upsert() {
        let store = InMemoryRosterStore::new();
        store.fail_upsert_for("bad@x.com");
        let err = store
            .upsert(Uuid::new_v4(), &row("bad@x.com", "111"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("simulated"));
    }
}
