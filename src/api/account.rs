/// Account endpoints: registration, login, verification, password
/// reset
use crate::{
    account::{
        AccountSummary, LoginIdRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    },
    api::ApiResponse,
    context::AppContext,
    error::LibrisResult,
    session::{Identity, SESSION_COOKIE},
    validation::RegistrationInput,
};
use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/login", get(login_prompt).post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/resend-verification", post(resend_verification))
        .route("/forget-password", post(forgot_password))
        .route("/api/account/verify/:token", get(verify_account))
        .route(
            "/api/reset/password/:token",
            get(reset_prompt).post(reset_password),
        )
}

/// Login prompt; unauthenticated requests get redirected here
async fn login_prompt() -> ApiResponse<()> {
    ApiResponse::message("Please log in")
}

/// Register a new account and mail its verification link
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> LibrisResult<ApiResponse<AccountSummary>> {
    let input = RegistrationInput {
        name: req.name,
        username: req.username,
        email: req.email,
        phone: req.phone,
        password: req.password,
    };

    let account = ctx.account_manager.register(input).await?;

    Ok(ApiResponse::created(
        "We have sent a mail to your registered email. Please verify your account before login",
        AccountSummary::from(&account),
    ))
}

/// Log in and set the session cookie
async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> LibrisResult<(CookieJar, ApiResponse<AccountSummary>)> {
    let (account, session) = ctx.account_manager.login(req.login_id, req.password).await?;

    let cookie = Cookie::build((SESSION_COOKIE, session.token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((
        jar.add(cookie),
        ApiResponse::ok("Login successful", AccountSummary::from(&account)),
    ))
}

/// Destroy the caller's session and clear the cookie
async fn logout(
    State(ctx): State<AppContext>,
    identity: Identity,
    jar: CookieJar,
) -> LibrisResult<(CookieJar, Redirect)> {
    ctx.session_manager.destroy_session(&identity.session_id).await?;

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());

    Ok((jar, Redirect::to("/login")))
}

/// Mail a fresh verification link to an unverified account
async fn resend_verification(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginIdRequest>,
) -> LibrisResult<ApiResponse<()>> {
    ctx.account_manager.resend_verification(req.login_id).await?;

    Ok(ApiResponse::message(
        "We have sent a mail to your registered email. Check your mail to verify your account",
    ))
}

/// Mail a password-reset link
async fn forgot_password(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginIdRequest>,
) -> LibrisResult<ApiResponse<()>> {
    ctx.account_manager.request_password_reset(req.login_id).await?;

    Ok(ApiResponse::message(
        "We have sent a mail to your registered email to reset your password",
    ))
}

/// Redeem a verification token from the mailed link
async fn verify_account(
    State(ctx): State<AppContext>,
    Path(token): Path<String>,
) -> LibrisResult<Redirect> {
    ctx.account_manager.verify_email(&token).await?;

    Ok(Redirect::to("/login"))
}

/// New-password form payload for a mailed reset link
async fn reset_prompt(Path(token): Path<String>) -> ApiResponse<serde_json::Value> {
    ApiResponse::ok(
        "Submit newPassword and confirmPassword with this token",
        json!({ "token": token }),
    )
}

/// Redeem a reset token with the new password
async fn reset_password(
    State(ctx): State<AppContext>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> LibrisResult<Redirect> {
    ctx.account_manager
        .reset_password(&token, req.new_password, req.confirm_password)
        .await?;

    Ok(Redirect::to("/login"))
}
