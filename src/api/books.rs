/// Book endpoints
///
/// All of these resolve the caller's identity from the session cookie
/// first; mutations then pass the per-account rate limiter before any
/// input is looked at.
use crate::{
    api::ApiResponse,
    catalogue::{
        self, CreateBookRequest, DeleteBookRequest, EditBookRequest, PageQuery,
    },
    context::AppContext,
    db::models::Book,
    error::LibrisResult,
    session::Identity,
};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

/// Build book routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/create-item", post(create_item))
        .route("/edit-item", post(edit_item))
        .route("/delete-item", post(delete_item))
        .route("/pagination_dashboard", get(pagination_dashboard))
}

/// Add a book to the caller's catalogue
async fn create_item(
    State(ctx): State<AppContext>,
    identity: Identity,
    Json(req): Json<CreateBookRequest>,
) -> LibrisResult<ApiResponse<Book>> {
    ctx.rate_limiter.check_mutation(&identity.username)?;

    let attrs = catalogue::validate_create(req)?;
    let book = ctx.book_store.create(&identity.username, attrs).await?;

    Ok(ApiResponse::created("New book created successfully", book))
}

/// Replace the details of a book the caller owns
async fn edit_item(
    State(ctx): State<AppContext>,
    identity: Identity,
    Json(req): Json<EditBookRequest>,
) -> LibrisResult<ApiResponse<Book>> {
    ctx.rate_limiter.check_mutation(&identity.username)?;

    let (id, attrs) = catalogue::validate_edit(req)?;
    let book = ctx.book_store.update(&identity.username, id, attrs).await?;

    Ok(ApiResponse::ok("Book details updated successfully", book))
}

/// Remove a book the caller owns
async fn delete_item(
    State(ctx): State<AppContext>,
    identity: Identity,
    Json(req): Json<DeleteBookRequest>,
) -> LibrisResult<ApiResponse<Book>> {
    ctx.rate_limiter.check_mutation(&identity.username)?;

    let id = catalogue::validate_delete(req)?;
    let book = ctx.book_store.delete(&identity.username, id).await?;

    Ok(ApiResponse::ok("Book deleted successfully", book))
}

/// One page of the caller's catalogue (?skip=N, pages of five)
async fn pagination_dashboard(
    State(ctx): State<AppContext>,
    identity: Identity,
    Query(query): Query<PageQuery>,
) -> LibrisResult<ApiResponse<Vec<Book>>> {
    let skip = catalogue::normalize_skip(query.skip);
    let books = ctx.book_store.list_page(&identity.username, skip).await?;

    Ok(ApiResponse::ok("Read success", books))
}
