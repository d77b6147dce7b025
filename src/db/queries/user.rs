//! User account queries

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

/// Look up the notification address of an account.
pub async fn find_email(pool: &PgPool, user_id: Uuid) -> Result<Option<String>> {
    let email: Option<(String,)> = sqlx::query_as("SELECT email FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(email.map(|(e,)| e))
}
