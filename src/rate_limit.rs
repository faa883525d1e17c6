/// Rate limiting for mutating catalogue operations
///
/// One keyed token bucket per identity (username). Handlers consult the
/// limiter explicitly with the identity they resolved, before anything
/// reaches the book store. The bucket transition is atomic, so two
/// simultaneous requests from one identity cannot both squeeze through
/// the last slot.
use crate::error::{LibrisError, LibrisResult};
use crate::metrics;
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota,
    RateLimiter as GovernorLimiter,
};
use serde::{Deserialize, Serialize};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Sustained mutations allowed per identity per minute
    pub mutations_per_minute: u32,
    /// Mutations an identity may burst before the sustained rate applies
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mutations_per_minute: 30,
            burst: 10,
        }
    }
}

type KeyedLimiter = GovernorLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-identity rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    mutations: Arc<KeyedLimiter>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let per_minute = NonZeroU32::new(config.mutations_per_minute)
            .unwrap_or_else(|| NonZeroU32::new(30).unwrap());
        let burst =
            NonZeroU32::new(config.burst).unwrap_or_else(|| NonZeroU32::new(10).unwrap());

        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            config,
            mutations: Arc::new(GovernorLimiter::keyed(quota)),
        }
    }

    /// Check whether this identity may perform another mutation now
    pub fn check_mutation(&self, username: &str) -> LibrisResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        match self.mutations.check_key(&username.to_string()) {
            Ok(_) => Ok(()),
            Err(_) => {
                metrics::RATE_LIMITED_TOTAL.inc();
                tracing::warn!("Rate limit hit for identity: {}", username);
                Err(LibrisError::RateLimited {
                    retry_after: self.retry_hint(),
                })
            }
        }
    }

    /// Drop bucket state for identities that have gone quiet
    pub fn housekeep(&self) {
        self.mutations.retain_recent();
    }

    fn retry_hint(&self) -> Duration {
        let secs = (60 / self.config.mutations_per_minute.max(1)).max(1);
        Duration::from_secs(secs as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        assert!(limiter.check_mutation("ada").is_ok());
    }

    #[test]
    fn test_burst_then_limited() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: true,
            mutations_per_minute: 60,
            burst: 5,
        });

        for _ in 0..5 {
            assert!(limiter.check_mutation("ada").is_ok());
        }

        let err = limiter.check_mutation("ada").unwrap_err();
        match err {
            LibrisError::RateLimited { retry_after } => {
                assert!(retry_after >= Duration::from_secs(1));
            }
            other => panic!("expected rate limit error, got {:?}", other),
        }
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: true,
            mutations_per_minute: 60,
            burst: 2,
        });

        assert!(limiter.check_mutation("ada").is_ok());
        assert!(limiter.check_mutation("ada").is_ok());
        assert!(limiter.check_mutation("ada").is_err());

        // A different identity still has its full burst.
        assert!(limiter.check_mutation("grace").is_ok());
    }

    #[test]
    fn test_disabled_limiter_always_allows() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            mutations_per_minute: 1,
            burst: 1,
        });

        for _ in 0..20 {
            assert!(limiter.check_mutation("ada").is_ok());
        }
    }
}
