use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

use crate::metrics;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::consumed_token_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::rate_limiter_housekeeping_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Cleanup expired sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;
            info!("Running expired session cleanup");

            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job("session_cleanup", "success");
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    } else {
                        info!("Session cleanup: no expired sessions found");
                    }
                }
                Err(e) => {
                    metrics::record_background_job("session_cleanup", "failure");
                    error!("Failed to cleanup expired sessions: {}", e);
                }
            }
        }
    }

    /// Cleanup used reset-token markers past their expiry (runs every
    /// hour)
    async fn consumed_token_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;
            info!("Running consumed token cleanup");

            match tasks::cleanup_consumed_tokens(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job("token_cleanup", "success");
                    if count > 0 {
                        info!("Cleaned up {} consumed tokens", count);
                    }
                }
                Err(e) => {
                    metrics::record_background_job("token_cleanup", "failure");
                    error!("Failed to cleanup consumed tokens: {}", e);
                }
            }
        }
    }

    /// Drop idle rate-limiter keys (runs every 5 minutes)
    async fn rate_limiter_housekeeping_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;
            tasks::rate_limiter_housekeeping(&scheduler.context);
            metrics::record_background_job("limiter_housekeeping", "success");
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    // Silent success
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
