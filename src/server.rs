/// HTTP server setup and routing
use crate::{
    api::ApiResponse,
    context::AppContext,
    error::{LibrisError, LibrisResult},
    metrics,
};
use axum::{
    http::{header, Method, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{compression::CompressionLayer, cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .merge(crate::api::routes())
        .with_state(ctx)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Service banner and route index
async fn welcome() -> ApiResponse<serde_json::Value> {
    ApiResponse::ok(
        "Welcome to the library catalogue server",
        json!({
            "register": "POST /register",
            "login": "POST /login",
            "logout": "POST /logout",
            "resendVerification": "POST /resend-verification",
            "forgetPassword": "POST /forget-password",
            "createItem": "POST /create-item",
            "editItem": "POST /edit-item",
            "deleteItem": "POST /delete-item",
            "catalogue": "GET /pagination_dashboard?skip=N"
        }),
    )
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus metrics in text exposition format
async fn metrics_endpoint() -> String {
    metrics::render_metrics()
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": 404,
            "message": "Endpoint not found",
            "error": "NotFound"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> LibrisResult<()> {
    let addr = format!(
        "{}:{}",
        ctx.config.service.hostname, ctx.config.service.port
    );

    info!("Libris listening on {}", addr);
    info!("   Public URL: {}", ctx.config.service.public_url);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LibrisError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    // Axum 0.7: Router<()> can be passed directly to serve
    axum::serve(listener, app)
        .await
        .map_err(|e| LibrisError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
