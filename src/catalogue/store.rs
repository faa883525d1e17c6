/// Book store backed by the shared database
///
/// Every mutation authorizes through a single conditional write
/// (`WHERE id = ? AND owner_username = ?`); a zero-row outcome is
/// classified afterwards into not-found versus not-yours. Listings are
/// ordered by the monotonic row id so pages never shuffle.
use super::{BookAttributes, PAGE_SIZE};
use crate::{
    db::models::Book,
    error::{LibrisError, LibrisResult},
    metrics,
};
use chrono::Utc;
use sqlx::SqlitePool;

const BOOK_COLUMNS: &str = "id, title, author, price, category, owner_username, created_at";

/// Owner-gated book store
#[derive(Clone)]
pub struct BookStore {
    db: SqlitePool,
}

impl BookStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a book owned by the caller
    pub async fn create(&self, owner: &str, attrs: BookAttributes) -> LibrisResult<Book> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO book (title, author, price, category, owner_username, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&attrs.title)
        .bind(&attrs.author)
        .bind(attrs.price)
        .bind(&attrs.category)
        .bind(owner)
        .bind(now)
        .execute(&self.db)
        .await?;

        metrics::record_book_mutation("create");
        tracing::debug!("Book {} created by {}", result.last_insert_rowid(), owner);

        Ok(Book {
            id: result.last_insert_rowid(),
            title: attrs.title,
            author: attrs.author,
            price: attrs.price,
            category: attrs.category,
            owner_username: owner.to_string(),
            created_at: now,
        })
    }

    /// Replace a book's attributes, gated on ownership
    pub async fn update(
        &self,
        owner: &str,
        id: i64,
        attrs: BookAttributes,
    ) -> LibrisResult<Book> {
        let result = sqlx::query(
            "UPDATE book SET title = ?1, author = ?2, price = ?3, category = ?4
             WHERE id = ?5 AND owner_username = ?6",
        )
        .bind(&attrs.title)
        .bind(&attrs.author)
        .bind(attrs.price)
        .bind(&attrs.category)
        .bind(id)
        .bind(owner)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            if self.exists(id).await? {
                return Err(LibrisError::Forbidden(
                    "Not allowed to edit, authorisation failed".to_string(),
                ));
            }
            return Err(book_not_found());
        }

        metrics::record_book_mutation("update");

        self.get(id).await?.ok_or_else(book_not_found)
    }

    /// Delete a book, gated on ownership; returns the removed book
    pub async fn delete(&self, owner: &str, id: i64) -> LibrisResult<Book> {
        // Read first only to shape the response; authorization rides
        // on the conditional delete below.
        let existing = self.get(id).await?;

        let result = sqlx::query("DELETE FROM book WHERE id = ?1 AND owner_username = ?2")
            .bind(id)
            .bind(owner)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            if self.exists(id).await? {
                return Err(LibrisError::Forbidden(
                    "Not allowed to delete, authorisation failed".to_string(),
                ));
            }
            return Err(book_not_found());
        }

        metrics::record_book_mutation("delete");
        tracing::debug!("Book {} deleted by {}", id, owner);

        existing.ok_or_else(book_not_found)
    }

    /// One fixed-size page of the caller's books, oldest first
    pub async fn list_page(&self, owner: &str, skip: i64) -> LibrisResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM book WHERE owner_username = ?1 ORDER BY id ASC LIMIT ?2 OFFSET ?3",
            BOOK_COLUMNS
        ))
        .bind(owner)
        .bind(PAGE_SIZE)
        .bind(skip.max(0))
        .fetch_all(&self.db)
        .await?;

        Ok(books)
    }

    /// Count the caller's books
    pub async fn count_for_owner(&self, owner: &str) -> LibrisResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book WHERE owner_username = ?1")
            .bind(owner)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    async fn get(&self, id: i64) -> LibrisResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM book WHERE id = ?1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(book)
    }

    async fn exists(&self, id: i64) -> LibrisResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }
}

fn book_not_found() -> LibrisError {
    LibrisError::NotFound("Book not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> BookStore {
        let pool = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            "CREATE TABLE book (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                price REAL NOT NULL,
                category TEXT NOT NULL,
                owner_username TEXT NOT NULL,
                created_at DATETIME NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        BookStore::new(pool)
    }

    fn attrs(title: &str) -> BookAttributes {
        BookAttributes {
            title: title.to_string(),
            author: "Octavia Butler".to_string(),
            price: 12.5,
            category: "Fiction".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_owner_and_id() {
        let store = setup().await;

        let book = store.create("ada", attrs("Kindred")).await.unwrap();
        assert_eq!(book.owner_username, "ada");
        assert!(book.id > 0);

        let second = store.create("ada", attrs("Dawn")).await.unwrap();
        assert!(second.id > book.id);
    }

    #[tokio::test]
    async fn test_update_own_book() {
        let store = setup().await;
        let book = store.create("ada", attrs("Kindred")).await.unwrap();

        let mut changed = attrs("Kindred (annotated edition)");
        changed.price = 20.0;
        let updated = store.update("ada", book.id, changed).await.unwrap();

        assert_eq!(updated.id, book.id);
        assert_eq!(updated.title, "Kindred (annotated edition)");
        assert_eq!(updated.price, 20.0);
        assert_eq!(updated.owner_username, "ada");
    }

    #[tokio::test]
    async fn test_update_someone_elses_book_is_forbidden() {
        let store = setup().await;
        let book = store.create("ada", attrs("Kindred")).await.unwrap();

        let err = store.update("grace", book.id, attrs("Stolen")).await.unwrap_err();
        match err {
            LibrisError::Forbidden(msg) => {
                assert_eq!(msg, "Not allowed to edit, authorisation failed")
            }
            other => panic!("expected forbidden, got {:?}", other),
        }

        // Untouched
        let page = store.list_page("ada", 0).await.unwrap();
        assert_eq!(page[0].title, "Kindred");
    }

    #[tokio::test]
    async fn test_update_missing_book_is_not_found() {
        let store = setup().await;

        let err = store.update("ada", 999, attrs("Ghost")).await.unwrap_err();
        match err {
            LibrisError::NotFound(msg) => assert_eq!(msg, "Book not found"),
            other => panic!("expected not-found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_own_book_returns_it() {
        let store = setup().await;
        let book = store.create("ada", attrs("Kindred")).await.unwrap();

        let deleted = store.delete("ada", book.id).await.unwrap();
        assert_eq!(deleted.title, "Kindred");

        assert!(store.list_page("ada", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_someone_elses_book_is_forbidden() {
        let store = setup().await;
        let book = store.create("ada", attrs("Kindred")).await.unwrap();

        let err = store.delete("grace", book.id).await.unwrap_err();
        match err {
            LibrisError::Forbidden(msg) => {
                assert_eq!(msg, "Not allowed to delete, authorisation failed")
            }
            other => panic!("expected forbidden, got {:?}", other),
        }

        assert_eq!(store.count_for_owner("ada").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_book_is_not_found() {
        let store = setup().await;

        let err = store.delete("ada", 42).await.unwrap_err();
        assert!(matches!(err, LibrisError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listing_only_shows_own_books() {
        let store = setup().await;
        store.create("ada", attrs("Kindred")).await.unwrap();
        store.create("grace", attrs("Cobol at Sea")).await.unwrap();

        let page = store.list_page("ada", 0).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "Kindred");
    }

    #[tokio::test]
    async fn test_pagination_is_stable_and_complete() {
        let store = setup().await;

        for i in 0..8 {
            store.create("ada", attrs(&format!("Volume {}", i))).await.unwrap();
        }

        let first = store.list_page("ada", 0).await.unwrap();
        let second = store.list_page("ada", 5).await.unwrap();

        assert_eq!(first.len(), 5);
        assert_eq!(second.len(), 3);

        // No overlap, no gap: the two pages cover all eight ids in
        // ascending order.
        let mut ids: Vec<i64> = first.iter().chain(second.iter()).map(|b| b.id).collect();
        let sorted = {
            let mut s = ids.clone();
            s.sort_unstable();
            s.dedup();
            s
        };
        assert_eq!(ids.len(), 8);
        assert_eq!(ids, sorted);

        ids.sort_unstable();
        assert_eq!(ids.len(), 8);
    }

    #[tokio::test]
    async fn test_pagination_past_the_end_is_empty() {
        let store = setup().await;
        store.create("ada", attrs("Kindred")).await.unwrap();

        assert!(store.list_page("ada", 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_skip_reads_from_the_start() {
        let store = setup().await;
        store.create("ada", attrs("Kindred")).await.unwrap();

        let page = store.list_page("ada", -3).await.unwrap();
        assert_eq!(page.len(), 1);
    }
}
