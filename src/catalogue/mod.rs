/// Book catalogue
///
/// Owner-scoped book records: every mutation is gated on the caller
/// owning the addressed row, and listings only ever show the caller's
/// own books.

mod store;

pub use store::BookStore;

use crate::error::{LibrisError, LibrisResult};
use serde::Deserialize;

/// Fixed page size for catalogue listings
pub const PAGE_SIZE: i64 = 5;

pub const TITLE_MIN: usize = 3;
/// Maximum title length accepted at creation
pub const CREATE_TITLE_MAX: usize = 30;
/// Maximum title length accepted on edit
pub const EDIT_TITLE_MAX: usize = 50;

/// Create-book request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
}

/// Edit-book request
#[derive(Debug, Clone, Deserialize)]
pub struct EditBookRequest {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
}

/// Delete-book request
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteBookRequest {
    pub id: Option<i64>,
}

/// Listing query (?skip=N)
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
}

/// Book attributes after validation
#[derive(Debug, Clone)]
pub struct BookAttributes {
    pub title: String,
    pub author: String,
    pub price: f64,
    pub category: String,
}

/// Validate a create request (title bound 3-30)
pub fn validate_create(req: CreateBookRequest) -> LibrisResult<BookAttributes> {
    let (title, author, category) = match (
        present(req.title),
        present(req.author),
        present(req.category),
    ) {
        (Some(t), Some(a), Some(c)) => (t, a, c),
        _ => return Err(missing_credentials()),
    };
    let price = req.price.ok_or_else(missing_credentials)?;

    validate_title(&title, CREATE_TITLE_MAX)?;

    Ok(BookAttributes {
        title,
        author,
        price,
        category,
    })
}

/// Validate an edit request (title bound 3-50)
pub fn validate_edit(req: EditBookRequest) -> LibrisResult<(i64, BookAttributes)> {
    let (title, author, category) = match (
        present(req.title),
        present(req.author),
        present(req.category),
    ) {
        (Some(t), Some(a), Some(c)) => (t, a, c),
        _ => return Err(missing_credentials()),
    };
    let price = req.price.ok_or_else(missing_credentials)?;
    let id = req.id.ok_or_else(missing_credentials)?;

    validate_title(&title, EDIT_TITLE_MAX)?;

    Ok((
        id,
        BookAttributes {
            title,
            author,
            price,
            category,
        },
    ))
}

/// Validate a delete request
pub fn validate_delete(req: DeleteBookRequest) -> LibrisResult<i64> {
    req.id.ok_or_else(missing_credentials)
}

/// Clamp a listing offset to zero or more
pub fn normalize_skip(skip: Option<i64>) -> i64 {
    skip.unwrap_or(0).max(0)
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn missing_credentials() -> LibrisError {
    LibrisError::Validation("Missing credentials".to_string())
}

fn validate_title(title: &str, max: usize) -> LibrisResult<()> {
    let len = title.chars().count();
    if !(TITLE_MIN..=max).contains(&len) {
        return Err(LibrisError::Validation(format!(
            "Title should be {}-{} characters",
            TITLE_MIN, max
        )));
    }
    Ok(())
}
