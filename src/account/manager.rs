/// Account manager implementation using runtime queries
///
/// Owns the registration, login, verification, and password-reset
/// flows. Lookups and writes go through sqlx runtime queries; token
/// issuance, password hashing, and mail submission are delegated to
/// the respective services.
use crate::{
    config::ServerConfig,
    db::models::{Account, Session},
    error::{LibrisError, LibrisResult},
    mailer::{self, MailDispatcher},
    metrics,
    password::PasswordHasher,
    session::SessionManager,
    token::{TokenClaims, TokenPurpose, TokenService},
    validation::{self, LoginId, RegistrationInput},
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

const ACCOUNT_COLUMNS: &str =
    "id, email, username, name, phone, password_hash, email_authenticated, created_at";

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    password_hasher: PasswordHasher,
    token_service: TokenService,
    sessions: Arc<SessionManager>,
    mail: MailDispatcher,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(
        db: SqlitePool,
        config: Arc<ServerConfig>,
        sessions: Arc<SessionManager>,
        mail: MailDispatcher,
    ) -> LibrisResult<Self> {
        let password_hasher = PasswordHasher::new(config.auth.password_work_factor)?;
        let token_service = TokenService::new(
            &config.auth.token_secret,
            config.auth.verify_token_ttl_secs,
            config.auth.reset_token_ttl_secs,
        );

        Ok(Self {
            db,
            config,
            password_hasher,
            token_service,
            sessions,
            mail,
        })
    }

    /// Register a new account and queue its verification mail
    pub async fn register(&self, input: RegistrationInput) -> LibrisResult<Account> {
        let reg = validation::validate_registration(input)?;

        // Pre-checks give precise conflict messages; the unique
        // constraints below remain the backstop under concurrency.
        if self.email_exists(&reg.email).await? {
            return Err(LibrisError::Conflict("Email already exists".to_string()));
        }

        if self.username_exists(&reg.username).await? {
            return Err(LibrisError::Conflict("Username already exists".to_string()));
        }

        let password_hash = self.password_hasher.hash(&reg.password)?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO account (email, username, name, phone, password_hash, email_authenticated, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&reg.email)
        .bind(&reg.username)
        .bind(&reg.name)
        .bind(&reg.phone)
        .bind(&password_hash)
        .bind(false)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(registration_conflict)?;

        let account = Account {
            id: result.last_insert_rowid(),
            email: reg.email,
            username: reg.username,
            name: reg.name,
            phone: reg.phone,
            password_hash,
            email_authenticated: false,
            created_at: now,
        };

        self.send_verification_mail(&account)?;

        metrics::ACCOUNT_REGISTRATIONS_TOTAL.inc();
        tracing::info!("Registered account {} ({})", account.username, account.email);

        Ok(account)
    }

    /// Authenticate an account and create a session
    pub async fn login(
        &self,
        login_id: Option<String>,
        password: Option<String>,
    ) -> LibrisResult<(Account, Session)> {
        match self.attempt_login(login_id, password).await {
            Ok(outcome) => {
                metrics::record_login("success");
                Ok(outcome)
            }
            Err(e) => {
                metrics::record_login("failure");
                Err(e)
            }
        }
    }

    async fn attempt_login(
        &self,
        login_id: Option<String>,
        password: Option<String>,
    ) -> LibrisResult<(Account, Session)> {
        let (login_id, password) = validation::validate_login(login_id, password)?;

        let account = self.find_by_login_id(&login_id).await?;

        // Verification is checked before the password so an unverified
        // account always gets the same answer.
        if !account.email_authenticated {
            return Err(LibrisError::Unverified(
                "Please verify your email first".to_string(),
            ));
        }

        if !self
            .password_hasher
            .verify(&password, &account.password_hash)?
        {
            return Err(LibrisError::Authentication(
                "Password incorrect".to_string(),
            ));
        }

        let session = self.sessions.create_session(&account).await?;
        tracing::info!("Account {} logged in", account.username);

        Ok((account, session))
    }

    /// Re-issue a verification token for an unverified account
    ///
    /// Returns the email the mail was queued for.
    pub async fn resend_verification(&self, login_id: Option<String>) -> LibrisResult<String> {
        let login_id = validation::validate_login_id(login_id)?;
        let account = self.find_by_login_id(&login_id).await?;

        if account.email_authenticated {
            return Err(LibrisError::Conflict(
                "Account is already verified, please login".to_string(),
            ));
        }

        self.send_verification_mail(&account)?;
        Ok(account.email)
    }

    /// Issue a password-reset token and queue the reset mail
    ///
    /// Returns the email the mail was queued for. Unverified accounts
    /// may reset their password; only login requires verification.
    pub async fn request_password_reset(&self, login_id: Option<String>) -> LibrisResult<String> {
        let login_id = validation::validate_login_id(login_id)?;
        let account = self.find_by_login_id(&login_id).await?;

        let token = self
            .token_service
            .issue(&account.email, TokenPurpose::Reset)?;
        let mail = mailer::password_reset_email(
            &account.email,
            &account.name,
            &token,
            &self.config.service.public_url,
            self.config.auth.reset_token_ttl_secs,
        );
        self.mail.submit(mail);

        tracing::info!("Password reset requested for {}", account.username);
        Ok(account.email)
    }

    /// Redeem a verification token, marking the account's email as
    /// authenticated
    ///
    /// Redemption is idempotent: presenting the same valid token again
    /// re-applies the same state.
    pub async fn verify_email(&self, token: &str) -> LibrisResult<()> {
        let claims = match self.token_service.verify(token, TokenPurpose::Verify) {
            Ok(claims) => claims,
            Err(e) => {
                metrics::record_token_redemption("verify", "rejected");
                tracing::warn!("Verification token rejected: {}", e);
                return Err(authentication_failed());
            }
        };

        let result = sqlx::query("UPDATE account SET email_authenticated = 1 WHERE email = ?1")
            .bind(&claims.sub)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            metrics::record_token_redemption("verify", "rejected");
            return Err(authentication_failed());
        }

        metrics::record_token_redemption("verify", "accepted");
        tracing::info!("Email verified for {}", claims.sub);
        Ok(())
    }

    /// Redeem a reset token and replace the account's password
    ///
    /// The token is single-use; every session of the account is
    /// revoked once the new password is in place.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: Option<String>,
        confirm_password: Option<String>,
    ) -> LibrisResult<()> {
        // The submission is validated before the token is inspected,
        // so a mistyped form never consumes the single-use token.
        let new_password = validation::validate_password_pair(new_password, confirm_password)?;

        let claims = match self.token_service.verify(token, TokenPurpose::Reset) {
            Ok(claims) => claims,
            Err(e) => {
                metrics::record_token_redemption("reset", "rejected");
                tracing::warn!("Reset token rejected: {}", e);
                return Err(authentication_failed());
            }
        };

        self.consume_token(&claims).await?;

        let account = self.get_by_email(&claims.sub).await?.ok_or_else(|| {
            metrics::record_token_redemption("reset", "rejected");
            authentication_failed()
        })?;

        let password_hash = self.password_hasher.hash(&new_password)?;

        sqlx::query("UPDATE account SET password_hash = ?1 WHERE id = ?2")
            .bind(&password_hash)
            .bind(account.id)
            .execute(&self.db)
            .await?;

        let revoked = self.sessions.destroy_sessions_for_account(account.id).await?;

        metrics::record_token_redemption("reset", "accepted");
        tracing::info!(
            "Password reset for {} ({} sessions revoked)",
            account.username,
            revoked
        );
        Ok(())
    }

    /// Delete consumed-token markers past their token expiry
    pub async fn cleanup_consumed_tokens(&self) -> LibrisResult<u64> {
        let result = sqlx::query("DELETE FROM consumed_token WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    fn send_verification_mail(&self, account: &Account) -> LibrisResult<()> {
        let token = self
            .token_service
            .issue(&account.email, TokenPurpose::Verify)?;
        let mail = mailer::verification_email(
            &account.email,
            &account.name,
            &token,
            &self.config.service.public_url,
            self.config.auth.verify_token_ttl_secs,
        );
        self.mail.submit(mail);
        Ok(())
    }

    /// Record a reset token's jti as used; rejects a jti seen before
    async fn consume_token(&self, claims: &TokenClaims) -> LibrisResult<()> {
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| LibrisError::Internal("Token expiry out of range".to_string()))?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO consumed_token (jti, purpose, consumed_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&claims.jti)
        .bind(claims.purpose.as_str())
        .bind(Utc::now())
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            metrics::record_token_redemption("reset", "replayed");
            tracing::warn!("Reset token replay for {}", claims.sub);
            return Err(authentication_failed());
        }

        Ok(())
    }

    async fn find_by_login_id(&self, login_id: &LoginId) -> LibrisResult<Account> {
        let account = match login_id {
            LoginId::Email(email) => self.get_by_email(email).await?,
            LoginId::Username(username) => {
                sqlx::query_as::<_, Account>(&format!(
                    "SELECT {} FROM account WHERE username = ?1",
                    ACCOUNT_COLUMNS
                ))
                .bind(username)
                .fetch_optional(&self.db)
                .await?
            }
        };

        account.ok_or_else(|| {
            LibrisError::NotFound("User does not exist, please register first".to_string())
        })
    }

    async fn get_by_email(&self, email: &str) -> LibrisResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE email = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    /// Check if an email is taken
    async fn email_exists(&self, email: &str) -> LibrisResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Check if a username is taken
    async fn username_exists(&self, username: &str) -> LibrisResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE username = ?1")
            .bind(username)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }
}

/// The generic answer for every failed token redemption; the precise
/// reason stays in the logs.
fn authentication_failed() -> LibrisError {
    LibrisError::Authentication("Email authentication failed".to_string())
}

/// Map a unique-constraint violation from the account insert to the
/// conflict the pre-checks would have reported
fn registration_conflict(err: sqlx::Error) -> LibrisError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            if db_err.message().contains("email") {
                return LibrisError::Conflict("Email already exists".to_string());
            }
            return LibrisError::Conflict("Username already exists".to_string());
        }
    }
    LibrisError::Database(err)
}
