//! Represents a catalog record: one book with two remote assets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single book in the catalog.
///
/// Both asset references are permanent URLs into the remote asset store. A
/// record is only ever written with both of them present, so readers never
/// observe a half-ingested book, and neither reference ever points at a
/// staging path.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Book {
    /// Unique identifier, assigned by the metadata store at insert.
    pub id: Uuid,

    /// Identity of the creating caller. Immutable; gates every mutation.
    pub owner_id: Uuid,

    /// Display title.
    pub title: String,

    /// Free-text genre tag, also usable as a listing filter.
    pub genre: String,

    /// Longer free-text description. Empty until set via update.
    pub description: String,

    /// Permanent reference to the cover image (cover-image namespace).
    pub cover_url: String,

    /// Permanent reference to the content file (content-file namespace).
    pub file_url: String,

    /// When this record was created; listing sort key, set once.
    pub created_at: DateTime<Utc>,
}

/// Metadata fields a caller supplies when creating a book.
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub title: String,
    pub genre: String,
}

/// Partial metadata update; `None` carries the stored value forward.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
}

/// Fully merged column set applied by the conditional metadata write.
#[derive(Debug, Clone)]
pub struct BookChanges {
    pub title: String,
    pub description: String,
    pub genre: String,
    pub cover_url: String,
    pub file_url: String,
}

/// Listing filter; fields are optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub genre: Option<String>,
    pub owner_id: Option<Uuid>,
}

/// One page of listing results.
#[derive(Debug, Serialize)]
pub struct BookPage {
    pub items: Vec<Book>,
    pub total_count: i64,
    pub total_pages: i64,
    pub current_page: i64,
}
