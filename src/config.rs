/// Configuration management for the libris service
use crate::error::{LibrisError, LibrisResult};
use crate::rate_limit::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Base URL used when composing links in outbound mail
    pub public_url: String,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration: secrets, lifetimes, hashing cost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub session_secret: String,
    pub token_secret: String,
    pub session_ttl_secs: u64,
    pub verify_token_ttl_secs: u64,
    pub reset_token_ttl_secs: u64,
    /// Argon2id iteration count
    pub password_work_factor: u32,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> LibrisResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("LIBRIS_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("LIBRIS_PORT")
            .unwrap_or_else(|_| "7000".to_string())
            .parse()
            .map_err(|_| LibrisError::Validation("Invalid port number".to_string()))?;

        let public_url = env::var("LIBRIS_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));
        let version = env::var("LIBRIS_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("LIBRIS_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("LIBRIS_DATABASE_URL")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("libris.sqlite"));

        let session_secret = env::var("LIBRIS_SESSION_SECRET")
            .map_err(|_| LibrisError::Validation("Session secret required".to_string()))?;
        let token_secret = env::var("LIBRIS_TOKEN_SECRET")
            .map_err(|_| LibrisError::Validation("Token secret required".to_string()))?;

        let session_ttl_secs = env::var("LIBRIS_SESSION_TTL_SECS")
            .unwrap_or_else(|_| "1209600".to_string())
            .parse()
            .unwrap_or(1209600);
        let verify_token_ttl_secs = env::var("LIBRIS_VERIFY_TOKEN_TTL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);
        let reset_token_ttl_secs = env::var("LIBRIS_RESET_TOKEN_TTL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);
        let password_work_factor = env::var("LIBRIS_PASSWORD_WORK_FACTOR")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .unwrap_or(3);

        let email = if let Ok(smtp_url) = env::var("LIBRIS_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("LIBRIS_EMAIL_FROM")
                    .unwrap_or_else(|_| format!("Libris <noreply@{}>", hostname)),
            })
        } else {
            None
        };

        let rate_limit_enabled = env::var("LIBRIS_RATE_LIMIT_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let mutations_per_minute = env::var("LIBRIS_RATE_LIMIT_MUTATIONS_PER_MINUTE")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        let burst = env::var("LIBRIS_RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            auth: AuthConfig {
                session_secret,
                token_secret,
                session_ttl_secs,
                verify_token_ttl_secs,
                reset_token_ttl_secs,
                password_work_factor,
            },
            email,
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                mutations_per_minute,
                burst,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> LibrisResult<()> {
        if self.service.hostname.is_empty() {
            return Err(LibrisError::Validation(
                "Hostname cannot be empty".to_string(),
            ));
        }

        if self.auth.session_secret.len() < 32 {
            return Err(LibrisError::Validation(
                "Session secret must be at least 32 characters".to_string(),
            ));
        }

        if self.auth.token_secret.len() < 32 {
            return Err(LibrisError::Validation(
                "Token secret must be at least 32 characters".to_string(),
            ));
        }

        if self.auth.password_work_factor == 0 {
            return Err(LibrisError::Validation(
                "Password work factor must be at least 1".to_string(),
            ));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.mutations_per_minute == 0 || self.rate_limit.burst == 0)
        {
            return Err(LibrisError::Validation(
                "Rate limit quota and burst must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
