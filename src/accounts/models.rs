use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Stored user account.
///
/// `password_hash` is an Argon2 PHC string and `api_key` is the hex key
/// minted at creation. Neither is ever serialized into responses.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the users table
#[derive(Debug, Clone)]
pub struct NewUserAccount {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub api_key: String,
}
