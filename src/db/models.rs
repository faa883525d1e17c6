/// Database row models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub email_authenticated: bool,
    pub created_at: DateTime<Utc>,
}

/// Session record in the database
///
/// Carries the identity snapshot captured at login time; it does not
/// track later account mutations.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub token: String,
    pub account_id: i64,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Redeemed single-use token marker, keyed by the token's jti claim
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConsumedToken {
    pub jti: String,
    pub purpose: String,
    pub consumed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Owned book record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub price: f64,
    pub category: String,
    pub owner_username: String,
    pub created_at: DateTime<Utc>,
}
