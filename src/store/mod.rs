//! Durable metadata store for catalog records.
//!
//! The ingestion flow and the read paths go through the [`CatalogStore`]
//! trait; the production implementation is SQLite-backed. A record carries
//! both asset references, so a row existing at all means its assets were
//! uploaded first.

pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::book::{Book, BookChanges, BookFilter, NewBook};

pub use sqlite::SqliteCatalogStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("metadata store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a fully assembled record. The store assigns `id` and
    /// `created_at`; the description starts empty.
    async fn insert(
        &self,
        owner_id: Uuid,
        new: &NewBook,
        cover_url: &str,
        file_url: &str,
    ) -> StoreResult<Book>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Book>>;

    /// Apply a full column set to one record in a single conditional write.
    ///
    /// Returns `None` when the record no longer exists, so callers can react
    /// to a concurrent delete instead of resurrecting the row.
    async fn update_by_id(&self, id: Uuid, changes: &BookChanges) -> StoreResult<Option<Book>>;

    /// Remove one record. Returns whether a row was actually deleted.
    async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool>;

    /// Fetch one page of records, newest first, under `filter`.
    async fn list(&self, filter: &BookFilter, offset: i64, limit: i64) -> StoreResult<Vec<Book>>;

    /// Count the records matching `filter`.
    async fn count(&self, filter: &BookFilter) -> StoreResult<i64>;

    /// Probe the backing database for readiness reporting.
    async fn health_check(&self) -> StoreResult<()>;
}
