/// Authentication extractor
///
/// Protected handlers take an `Identity` parameter; extraction reads
/// the session cookie and resolves it through the session manager, so
/// identity is materialized exactly once per request and passed along
/// explicitly from there.
use crate::{
    context::AppContext,
    error::LibrisError,
    session::{Identity, SESSION_COOKIE},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;

#[async_trait]
impl FromRequestParts<AppContext> for Identity {
    type Rejection = LibrisError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or(LibrisError::Unauthorized)?;

        state.session_manager.validate_session(&token).await
    }
}
