/// Background task implementations
use crate::{context::AppContext, db, error::LibrisResult, metrics};

/// Delete sessions whose expiry has passed
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> LibrisResult<u64> {
    ctx.session_manager.cleanup_expired().await
}

/// Delete single-use token markers once the token itself has expired
pub async fn cleanup_consumed_tokens(ctx: &AppContext) -> LibrisResult<u64> {
    ctx.account_manager.cleanup_consumed_tokens().await
}

/// Drop rate-limiter state for keys that have gone quiet
pub fn rate_limiter_housekeeping(ctx: &AppContext) {
    ctx.rate_limiter.housekeep();
}

/// Probe the database and refresh the active-session gauge
pub async fn health_check(ctx: &AppContext) -> LibrisResult<()> {
    db::test_connection(&ctx.db).await?;

    let active = ctx.session_manager.active_count().await?;
    metrics::SESSIONS_ACTIVE.set(active);

    Ok(())
}
