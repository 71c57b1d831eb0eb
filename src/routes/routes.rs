//! Defines routes for the book catalog API.
//!
//! ## Structure
//! - **Catalog endpoints**
//!   - `GET    /books` — list records (supports genre, owner, page, page_size)
//!   - `POST   /books` — ingest a new book (multipart; requires bearer token)
//!   - `GET    /books/{id}` — fetch one record
//!   - `PATCH  /books/{id}` — update metadata / replace assets (multipart; auth)
//!   - `DELETE /books/{id}` — remove record and remote assets (auth)
//!
//! - **Health endpoints**
//!   - `GET /healthz`, `GET /readyz`
//!
//! The body limit is sized for two staged assets plus form fields; the
//! per-asset bound itself is enforced while streaming into staging.

use crate::{
    handlers::{
        book_handlers::{create_book, delete_book, get_book, list_books, update_book},
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};

/// Build and return the router for all catalog routes.
///
/// The router carries shared state (`AppState`) to all handlers.
/// `max_body_bytes` must cover a full create request: both assets at the
/// per-asset bound plus multipart overhead.
pub fn routes(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // catalog routes
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/{id}",
            get(get_book).patch(update_book).delete(delete_book),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
}
