//! SQLite-backed [`CatalogStore`].
//!
//! Metadata lives in a single `books` table. Timestamps are stored as text
//! and written by one code path, so lexicographic order matches insertion
//! time; listing sorts newest first with `rowid` as the tie-break for rows
//! created in the same instant.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::Sqlite;
use sqlx::{QueryBuilder, SqlitePool};
use uuid::Uuid;

use crate::models::book::{Book, BookChanges, BookFilter, NewBook};
use crate::store::{CatalogStore, StoreResult};

const BOOK_COLUMNS: &str =
    "id, owner_id, title, genre, description, cover_url, file_url, created_at";

#[derive(Clone)]
pub struct SqliteCatalogStore {
    pool: Arc<SqlitePool>,
}

impl SqliteCatalogStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &BookFilter) {
        if let Some(genre) = &filter.genre {
            builder.push(" AND genre = ");
            builder.push_bind(genre.clone());
        }
        if let Some(owner_id) = filter.owner_id {
            builder.push(" AND owner_id = ");
            builder.push_bind(owner_id);
        }
    }
}

/// Apply the schema migration to a fresh or existing database.
///
/// Statements are idempotent, so running this on every startup is safe.
pub async fn apply_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let migration = include_str!("../../migrations/0001_init.sql");
    for statement in migration.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn insert(
        &self,
        owner_id: Uuid,
        new: &NewBook,
        cover_url: &str,
        file_url: &str,
    ) -> StoreResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            "INSERT INTO books (id, owner_id, title, genre, description, cover_url, file_url, created_at)
             VALUES (?, ?, ?, ?, '', ?, ?, ?)
             RETURNING id, owner_id, title, genre, description, cover_url, file_url, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&new.title)
        .bind(&new.genre)
        .bind(cover_url)
        .bind(file_url)
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await?;
        Ok(book)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(book)
    }

    async fn update_by_id(&self, id: Uuid, changes: &BookChanges) -> StoreResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "UPDATE books
             SET title = ?, genre = ?, description = ?, cover_url = ?, file_url = ?
             WHERE id = ?
             RETURNING id, owner_id, title, genre, description, cover_url, file_url, created_at",
        )
        .bind(&changes.title)
        .bind(&changes.genre)
        .bind(&changes.description)
        .bind(&changes.cover_url)
        .bind(&changes.file_url)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(book)
    }

    async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &BookFilter, offset: i64, limit: i64) -> StoreResult<Vec<Book>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE 1 = 1"
        ));
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC, rowid DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let books = builder.build_query_as().fetch_all(&*self.pool).await?;
        Ok(books)
    }

    async fn count(&self, filter: &BookFilter) -> StoreResult<i64> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books WHERE 1 = 1");
        Self::push_filter(&mut builder, filter);

        let count: i64 = builder.build_query_scalar().fetch_one(&*self.pool).await?;
        Ok(count)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.pool)
            .await?;
        Ok(())
    }
}
