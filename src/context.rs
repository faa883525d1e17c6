/// Application context and dependency injection
use crate::{
    account::AccountManager,
    catalogue::BookStore,
    config::ServerConfig,
    db,
    error::{LibrisError, LibrisResult},
    mailer::{MailDispatcher, MailTransport, SmtpMailer},
    rate_limit::RateLimiter,
    session::SessionManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub session_manager: Arc<SessionManager>,
    pub book_store: Arc<BookStore>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> LibrisResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Initialize database
        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let config = Arc::new(config);

        // Mail delivery: SMTP when configured, log-only otherwise
        let transport: Arc<dyn MailTransport> = Arc::new(SmtpMailer::new(config.email.clone())?);
        let mail_dispatcher = MailDispatcher::start(transport);

        let session_manager = Arc::new(SessionManager::new(
            pool.clone(),
            &config.auth.session_secret,
            config.auth.session_ttl_secs,
        ));

        let account_manager = Arc::new(AccountManager::new(
            pool.clone(),
            config.clone(),
            session_manager.clone(),
            mail_dispatcher,
        )?);

        let book_store = Arc::new(BookStore::new(pool.clone()));

        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        Ok(Self {
            config,
            db: pool,
            account_manager,
            session_manager,
            book_store,
            rate_limiter,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> LibrisResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                LibrisError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }
}
