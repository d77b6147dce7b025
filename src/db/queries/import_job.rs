//! Import job queries

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::{ImportJob, ImportJobStatus};

#[derive(sqlx::FromRow)]
struct ImportJobRow {
    id: Uuid,
    user_id: Uuid,
    company_id: Uuid,
    status: String,
    source_location: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ImportJobRow> for ImportJob {
    type Error = anyhow::Error;

    fn try_from(row: ImportJobRow) -> Result<Self> {
        let status = ImportJobStatus::parse(&row.status)
            .ok_or_else(|| anyhow!("unknown import job status '{}'", row.status))?;
        Ok(ImportJob {
            id: row.id,
            user_id: row.user_id,
            company_id: row.company_id,
            status,
            source_location: row.source_location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const JOB_COLUMNS: &str =
    "id, user_id, company_id, status, source_location, created_at, updated_at";

/// Create a pending job record for an accepted upload.
pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    company_id: Uuid,
    source_location: &str,
) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO import_jobs (id, user_id, company_id, status, source_location,
            created_at, updated_at)
        VALUES ($1, $2, $3, 'pending', $4, NOW(), NOW())
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(company_id)
    .bind(source_location)
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn find(pool: &PgPool, job_id: Uuid) -> Result<Option<ImportJob>> {
    let row = sqlx::query_as::<_, ImportJobRow>(&format!(
        "SELECT {} FROM import_jobs WHERE id = $1",
        JOB_COLUMNS
    ))
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.map(ImportJob::try_from).transpose()
}

/// Owner-scoped lookup for the status interface. A job that exists but
/// belongs to someone else is indistinguishable from a missing one.
pub async fn find_for_user(
    pool: &PgPool,
    job_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ImportJob>> {
    let row = sqlx::query_as::<_, ImportJobRow>(&format!(
        "SELECT {} FROM import_jobs WHERE id = $1 AND user_id = $2",
        JOB_COLUMNS
    ))
    .bind(job_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(ImportJob::try_from).transpose()
}

pub async fn set_status(pool: &PgPool, job_id: Uuid, status: ImportJobStatus) -> Result<()> {
    sqlx::query("UPDATE import_jobs SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(job_id)
        .bind(status.as_str())
        .execute(pool)
        .await?;
    Ok(())
}
