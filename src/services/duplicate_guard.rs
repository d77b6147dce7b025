//! Duplicate checks run against the roster before an upsert is attempted.
//!
//! A row is only rejected when it would collide with a *different* identity:
//! the same person re-imported (matching cpf and email) flows through to the
//! upsert, which is what makes re-running a file safe.

use anyhow::Result;
use uuid::Uuid;

use crate::services::roster_store::RosterStore;
use crate::types::{EmployeeRow, SkipReason};

/// Returns `Ok(Some(reason))` when the row must be skipped, `Ok(None)` when
/// it may proceed to the upsert. Store read failures are fatal and bubble up.
pub async fn check_row(
    store: &dyn RosterStore,
    company_id: Uuid,
    row: &EmployeeRow,
) -> Result<Option<SkipReason>> {
    if let Some(existing) = store.find_by_cpf(&row.cpf).await? {
        if !existing.email.eq_ignore_ascii_case(&row.email) {
            return Ok(Some(SkipReason::DuplicateCpf {
                cpf: row.cpf.clone(),
            }));
        }
    }

    if let Some(existing) = store.find_by_email(&row.email).await? {
        if existing.company_id != company_id {
            return Ok(Some(SkipReason::DuplicateEmail {
                email: row.email.clone(),
            }));
        }
    }

    Ok(None)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::roster_store::InMemoryRosterStore;
    use chrono::NaiveDate;

    fn sample_row(cpf: &str, email: &str) -> EmployeeRow {
        EmployeeRow {
            name: "Ana Souza".to_string(),
            cpf: cpf.to_string(),
            email: email.to_string(),
            position: "Engineer".to_string(),
            hired_at: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        }
    }

    #[tokio::test]
    async fn fresh_row_passes() {
        let store = InMemoryRosterStore::new();
        let company = Uuid::new_v4();
        let verdict = check_row(&store, company, &sample_row("111", "ana@x.com"))
            .await
            .unwrap();
        assert!(verdict.is_none());
    }

    #[tokio::test]
    async fn same_cpf_different_email_is_rejected() {
        let store = InMemoryRosterStore::new();
        let company = Uuid::new_v4();
        store
            .upsert(company, &sample_row("111", "ana@x.com"))
            .await
            .unwrap();

        let verdict = check_row(&store, company, &sample_row("111", "other@x.com"))
            .await
            .unwrap();
        assert!(matches!(verdict, Some(SkipReason::DuplicateCpf { cpf }) if cpf == "111"));
    }

    #[tokio::test]
    async fn same_email_in_another_company_is_rejected() {
        let store = InMemoryRosterStore::new();
        let company_a = Uuid::new_v4();
        let company_b = Uuid::new_v4();
        store
            .upsert(company_a, &sample_row("111", "ana@x.com"))
            .await
            .unwrap();

        let verdict = check_row(&store, company_b, &sample_row("222", "ana@x.com"))
            .await
            .unwrap();
        assert!(
            matches!(verdict, Some(SkipReason::DuplicateEmail { email }) if email == "ana@x.com")
        );
    }

    #[tokio::test]
    async fn reimporting_the_same_person_passes() {
        let store = InMemoryRosterStore::new();
        let company = Uuid::new_v4();
        store
            .upsert(company, &sample_row("111", "ana@x.com"))
            .await
            .unwrap();

        let mut row = sample_row("111", "ana@x.com");
        row.position = "Staff Engineer".to_string();
        let verdict = check_row(&store, company, &row).await.unwrap();
        assert!(verdict.is_none());
    }

    #[tokio::test]
    async fn email_match_is_case_insensitive() {
        let store = InMemoryRosterStore::new();
        let company = Uuid::new_v4();
        store
            .upsert(company, &sample_row("111", "ana@x.com"))
            .await
            .unwrap();

        let verdict = check_row(&store, company, &sample_row("111", "ANA@X.COM"))
            .await
            .unwrap();
        assert!(verdict.is_none());
    }
}
