//! Employee roster types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted roster record.
///
/// `cpf` is stored digits-only; `email` is the upsert key.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub cpf: String,
    pub email: String,
    pub position: String,
    pub hired_at: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One validated, normalized row from an import file. Never leaves the
/// worker; this is the unit the duplicate guard and upsert operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeRow {
    pub name: String,
    pub cpf: String,
    pub email: String,
    pub position: String,
    pub hired_at: NaiveDate,
}
