/// Account management
///
/// Registration, login, email verification, and password reset.

mod manager;

pub use manager::AccountManager;

use crate::db::models::Account;
use serde::{Deserialize, Serialize};

/// Registration request
///
/// Fields are optional so missing values surface as validation errors
/// rather than deserialization failures.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// Login request (identifier may be an email or a username)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub login_id: Option<String>,
    pub password: Option<String>,
}

/// Identifier-only request used by resend-verification and
/// forgot-password
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginIdRequest {
    pub login_id: Option<String>,
}

/// New-password submission against a reset token
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Public view of an account (never carries the password hash)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub email_authenticated: bool,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            email_authenticated: account.email_authenticated,
        }
    }
}
