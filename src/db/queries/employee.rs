//! Employee roster queries

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::{EmployeeRecord, EmployeeRow, UpsertOutcome};

const EMPLOYEE_COLUMNS: &str =
    "id, company_id, name, cpf, email, position, hired_at, created_at, updated_at";

/// Find the roster record carrying a normalized cpf, if any.
pub async fn find_by_cpf(pool: &PgPool, cpf: &str) -> Result<Option<EmployeeRecord>> {
    let record = sqlx::query_as::<_, EmployeeRecord>(&format!(
        "SELECT {} FROM employees WHERE cpf = $1",
        EMPLOYEE_COLUMNS
    ))
    .bind(cpf)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

/// Find the roster record carrying an email, if any. Emails are matched
/// case-insensitively.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<EmployeeRecord>> {
    let record = sqlx::query_as::<_, EmployeeRecord>(&format!(
        "SELECT {} FROM employees WHERE LOWER(email) = LOWER($1)",
        EMPLOYEE_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

/// Insert-or-update keyed by email within one company. When the email is
/// already present for the company, the remaining fields are overwritten;
/// otherwise a new record is created.
pub async fn upsert_by_email(
    pool: &PgPool,
    company_id: Uuid,
    row: &EmployeeRow,
) -> Result<UpsertOutcome> {
    let updated = sqlx::query(
        r#"
        UPDATE employees
        SET name = $3, cpf = $4, position = $5, hired_at = $6, updated_at = NOW()
        WHERE LOWER(email) = LOWER($1) AND company_id = $2
        "#,
    )
    .bind(&row.email)
    .bind(company_id)
    .bind(&row.name)
    .bind(&row.cpf)
    .bind(&row.position)
    .bind(row.hired_at)
    .execute(pool)
    .await?;

    if updated.rows_affected() > 0 {
        return Ok(UpsertOutcome::Updated);
    }

    sqlx::query(
        r#"
        INSERT INTO employees (id, company_id, name, cpf, email, position, hired_at,
            created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(&row.name)
    .bind(&row.cpf)
    .bind(&row.email)
    .bind(&row.position)
    .bind(row.hired_at)
    .execute(pool)
    .await?;

    Ok(UpsertOutcome::Created)
}
