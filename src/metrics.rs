/// Metrics and telemetry for libris
///
/// Prometheus-compatible counters for the account, token, catalogue,
/// rate-limit, and mail-dispatch paths, rendered by `GET /metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    /// Accounts created through registration
    pub static ref ACCOUNT_REGISTRATIONS_TOTAL: IntCounter = register_int_counter!(
        "account_registrations_total",
        "Total number of accounts registered"
    )
    .unwrap();

    /// Login attempts by outcome
    pub static ref LOGINS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "logins_total",
        "Total number of login attempts",
        &["outcome"]
    )
    .unwrap();

    /// Token redemptions by purpose and outcome
    pub static ref TOKEN_REDEMPTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "token_redemptions_total",
        "Total number of signed-token redemptions",
        &["purpose", "outcome"]
    )
    .unwrap();

    /// Book mutations by operation
    pub static ref BOOK_MUTATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "book_mutations_total",
        "Total number of book create/edit/delete operations",
        &["operation"]
    )
    .unwrap();

    /// Mutations refused by the rate limiter
    pub static ref RATE_LIMITED_TOTAL: IntCounter = register_int_counter!(
        "rate_limited_total",
        "Total number of requests refused by the rate limiter"
    )
    .unwrap();

    /// Outbound mail submissions by outcome
    pub static ref MAIL_DISPATCH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "mail_dispatch_total",
        "Total number of outbound mail dispatch attempts",
        &["outcome"]
    )
    .unwrap();

    /// Live sessions
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sessions_active",
        "Number of active sessions"
    )
    .unwrap();

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Record a login attempt
pub fn record_login(outcome: &str) {
    LOGINS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a token redemption
pub fn record_token_redemption(purpose: &str, outcome: &str) {
    TOKEN_REDEMPTIONS_TOTAL
        .with_label_values(&[purpose, outcome])
        .inc();
}

/// Record a book mutation
pub fn record_book_mutation(operation: &str) {
    BOOK_MUTATIONS_TOTAL.with_label_values(&[operation]).inc();
}

/// Record an outbound mail dispatch attempt
pub fn record_mail_dispatch(outcome: &str) {
    MAIL_DISPATCH_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
}
