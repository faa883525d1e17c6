/// Server-side session management
///
/// A session is a database row holding the identity snapshot captured
/// at login, addressed by a signed token the browser carries in an
/// HTTP-only cookie. The row is authoritative: logout and password
/// reset delete rows, which kills the token immediately regardless of
/// its embedded expiry.
use crate::db::models::{Account, Session};
use crate::error::{LibrisError, LibrisResult};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "libris_session";

/// Identity snapshot resolved once per protected request and threaded
/// explicitly into stores and the rate limiter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub account_id: i64,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub session_id: String,
}

/// Issues, validates, and destroys sessions
#[derive(Clone)]
pub struct SessionManager {
    db: SqlitePool,
    signing_secret: String,
    session_ttl_secs: u64,
}

impl SessionManager {
    pub fn new(db: SqlitePool, signing_secret: &str, session_ttl_secs: u64) -> Self {
        Self {
            db,
            signing_secret: signing_secret.to_string(),
            session_ttl_secs,
        }
    }

    /// Create a session for an authenticated account
    pub async fn create_session(&self, account: &Account) -> LibrisResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        let token = self.sign_session_token(account.id, &session_id)?;

        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.session_ttl_secs as i64);

        sqlx::query(
            "INSERT INTO session (id, token, account_id, username, email, phone, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&session_id)
        .bind(&token)
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(LibrisError::Database)?;

        tracing::info!("Session created for account: {}", account.username);

        Ok(Session {
            id: session_id,
            token,
            account_id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            created_at: now,
            expires_at,
        })
    }

    /// Resolve a presented session token to an identity
    ///
    /// The lookup is by exact token string; a missing or expired row is
    /// an unauthenticated request, which the HTTP layer turns into the
    /// login redirect.
    pub async fn validate_session(&self, token: &str) -> LibrisResult<Identity> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, token, account_id, username, email, phone, created_at, expires_at
             FROM session WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(LibrisError::Database)?
        .ok_or(LibrisError::Unauthorized)?;

        if Utc::now() > session.expires_at {
            return Err(LibrisError::Unauthorized);
        }

        Ok(Identity {
            account_id: session.account_id,
            username: session.username,
            email: session.email,
            phone: session.phone,
            session_id: session.id,
        })
    }

    /// Delete a session (logout)
    ///
    /// A store failure here fails the whole request; logout must not
    /// pretend to succeed while the session row survives.
    pub async fn destroy_session(&self, session_id: &str) -> LibrisResult<()> {
        sqlx::query("DELETE FROM session WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await
            .map_err(LibrisError::Database)?;

        tracing::info!("Session destroyed: {}", session_id);

        Ok(())
    }

    /// Delete every session belonging to an account (password reset)
    pub async fn destroy_sessions_for_account(&self, account_id: i64) -> LibrisResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE account_id = ?1")
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(LibrisError::Database)?;

        Ok(result.rows_affected())
    }

    /// Delete sessions whose expiry has passed; returns the count removed
    pub async fn cleanup_expired(&self) -> LibrisResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await
            .map_err(LibrisError::Database)?;

        Ok(result.rows_affected())
    }

    /// Count live sessions
    pub async fn active_count(&self) -> LibrisResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM session WHERE expires_at >= ?1")
                .bind(Utc::now())
                .fetch_one(&self.db)
                .await
                .map_err(LibrisError::Database)?;

        Ok(count)
    }

    /// Sign the transport token: the browser-held cookie value
    fn sign_session_token(&self, account_id: i64, session_id: &str) -> LibrisResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        #[derive(Debug, Serialize, Deserialize)]
        struct SessionClaims {
            sub: String,
            sid: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: account_id.to_string(),
            sid: session_id.to_string(),
            iat: now,
            exp: now + self.session_ttl_secs as i64,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.signing_secret.as_bytes()),
        )
        .map_err(|e| LibrisError::Internal(format!("Failed to sign session token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    const TEST_SECRET: &str = "test-session-secret-0123456789abcdef";

    async fn setup_manager() -> SessionManager {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE account (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                email_authenticated INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE session (
                id TEXT PRIMARY KEY,
                token TEXT NOT NULL UNIQUE,
                account_id INTEGER NOT NULL,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                expires_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        SessionManager::new(db, TEST_SECRET, 3600)
    }

    async fn insert_account(manager: &SessionManager, username: &str, email: &str) -> Account {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO account (email, username, name, phone, password_hash, email_authenticated, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(email)
        .bind(username)
        .bind("Test User")
        .bind("0123456789")
        .bind("$argon2id$fake")
        .bind(true)
        .bind(now)
        .execute(&manager.db)
        .await
        .unwrap()
        .last_insert_rowid();

        Account {
            id,
            email: email.to_string(),
            username: username.to_string(),
            name: "Test User".to_string(),
            phone: "0123456789".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            email_authenticated: true,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_validate_session() {
        let manager = setup_manager().await;
        let account = insert_account(&manager, "ada", "ada@example.com").await;

        let session = manager.create_session(&account).await.unwrap();
        let identity = manager.validate_session(&session.token).await.unwrap();

        assert_eq!(identity.account_id, account.id);
        assert_eq!(identity.username, "ada");
        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.phone, "0123456789");
        assert_eq!(identity.session_id, session.id);
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let manager = setup_manager().await;
        let err = manager.validate_session("nope").await.unwrap_err();
        assert!(matches!(err, LibrisError::Unauthorized));
    }

    #[tokio::test]
    async fn test_expired_session_is_unauthorized() {
        let manager = setup_manager().await;
        let account = insert_account(&manager, "ada", "ada@example.com").await;

        let expired: DateTime<Utc> = Utc::now() - Duration::hours(2);
        sqlx::query(
            "INSERT INTO session (id, token, account_id, username, email, phone, created_at, expires_at)
             VALUES ('sid', 'stale-token', ?1, 'ada', 'ada@example.com', '0123456789', ?2, ?3)",
        )
        .bind(account.id)
        .bind(expired)
        .bind(expired)
        .execute(&manager.db)
        .await
        .unwrap();

        let err = manager.validate_session("stale-token").await.unwrap_err();
        assert!(matches!(err, LibrisError::Unauthorized));
    }

    #[tokio::test]
    async fn test_destroy_session_revokes_token() {
        let manager = setup_manager().await;
        let account = insert_account(&manager, "ada", "ada@example.com").await;

        let session = manager.create_session(&account).await.unwrap();
        manager.destroy_session(&session.id).await.unwrap();

        let err = manager.validate_session(&session.token).await.unwrap_err();
        assert!(matches!(err, LibrisError::Unauthorized));
    }

    #[tokio::test]
    async fn test_destroy_sessions_for_account() {
        let manager = setup_manager().await;
        let ada = insert_account(&manager, "ada", "ada@example.com").await;
        let grace = insert_account(&manager, "grace", "grace@example.com").await;

        let first = manager.create_session(&ada).await.unwrap();
        let second = manager.create_session(&ada).await.unwrap();
        let other = manager.create_session(&grace).await.unwrap();

        let removed = manager.destroy_sessions_for_account(ada.id).await.unwrap();
        assert_eq!(removed, 2);

        assert!(manager.validate_session(&first.token).await.is_err());
        assert!(manager.validate_session(&second.token).await.is_err());
        assert!(manager.validate_session(&other.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let manager = setup_manager().await;
        let account = insert_account(&manager, "ada", "ada@example.com").await;

        let live = manager.create_session(&account).await.unwrap();

        let expired: DateTime<Utc> = Utc::now() - Duration::hours(2);
        sqlx::query(
            "INSERT INTO session (id, token, account_id, username, email, phone, created_at, expires_at)
             VALUES ('old', 'stale-token', ?1, 'ada', 'ada@example.com', '0123456789', ?2, ?3)",
        )
        .bind(account.id)
        .bind(expired)
        .bind(expired)
        .execute(&manager.db)
        .await
        .unwrap();

        let removed = manager.cleanup_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(manager.validate_session(&live.token).await.is_ok());
        assert_eq!(manager.active_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_identity_snapshot_is_point_in_time() {
        let manager = setup_manager().await;
        let account = insert_account(&manager, "ada", "ada@example.com").await;
        let session = manager.create_session(&account).await.unwrap();

        // Later account mutations must not leak into the existing session.
        sqlx::query("UPDATE account SET phone = '9999999999' WHERE id = ?1")
            .bind(account.id)
            .execute(&manager.db)
            .await
            .unwrap();

        let identity = manager.validate_session(&session.token).await.unwrap();
        assert_eq!(identity.phone, "0123456789");
    }
}
