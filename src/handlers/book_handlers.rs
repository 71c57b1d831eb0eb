//! HTTP handlers for book catalog operations.
//! Streams multipart uploads into local staging and delegates ingestion,
//! consistency, and cleanup concerns to `CatalogService`.

use crate::{
    auth::CallerId,
    errors::{ApiError, ApiResult},
    models::book::{Book, BookFilter, BookPatch, NewBook},
    services::catalog_service::{Created, DeleteOutcome, Updated},
    staging::{StagedUpload, StagingArea},
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Query params accepted by `GET /books`.
#[derive(Debug, Deserialize)]
pub struct ListBooksQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub genre: Option<String>,
    pub owner: Option<Uuid>,
}

/// A book plus any degraded-success notes, as returned by mutations.
#[derive(Debug, Serialize)]
pub struct BookResponse {
    #[serde(flatten)]
    pub book: Book,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<Created> for BookResponse {
    fn from(created: Created) -> Self {
        Self {
            book: created.book,
            warnings: created.warnings,
        }
    }
}

impl From<Updated> for BookResponse {
    fn from(updated: Updated) -> Self {
        Self {
            book: updated.book,
            warnings: updated.warnings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteBookResponse {
    pub id: Uuid,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_asset_deletes: Vec<crate::assets::AssetKind>,
}

/// Multipart fields recognized by create and update.
#[derive(Default)]
struct BookForm {
    title: Option<String>,
    genre: Option<String>,
    description: Option<String>,
    cover: Option<StagedUpload>,
    content: Option<StagedUpload>,
}

/// POST `/books` — ingest a new book from multipart fields `title`, `genre`,
/// `cover_image`, `book_file`.
pub async fn create_book(
    State(state): State<AppState>,
    caller: CallerId,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(&state.staging, multipart).await?;
    let new = NewBook {
        title: form.title.unwrap_or_default(),
        genre: form.genre.unwrap_or_default(),
    };

    let created = state
        .catalog
        .create(caller, new, form.cover, form.content)
        .await?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(created))))
}

/// GET `/books/{id}` — fetch one record.
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Book>, ApiError> {
    let book = state.catalog.get(id).await?;
    Ok(Json(book))
}

/// GET `/books` — list records, newest first, with optional `genre` and
/// `owner` filters and `page`/`page_size` pagination.
pub async fn list_books(
    State(state): State<AppState>,
    Query(q): Query<ListBooksQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = BookFilter {
        genre: q.genre,
        owner_id: q.owner,
    };
    let page = state.catalog.list(filter, q.page, q.page_size).await?;
    Ok(Json(page))
}

/// PATCH `/books/{id}` — update metadata and/or replace either asset. Any
/// of the multipart fields `title`, `description`, `genre`, `cover_image`,
/// `book_file` may be present.
pub async fn update_book(
    State(state): State<AppState>,
    caller: CallerId,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(&state.staging, multipart).await?;
    let patch = BookPatch {
        title: form.title,
        description: form.description,
        genre: form.genre,
    };

    let updated = state
        .catalog
        .update(caller, id, patch, form.cover, form.content)
        .await?;
    Ok(Json(BookResponse::from(updated)))
}

/// DELETE `/books/{id}` — remove a record and its remote assets.
pub async fn delete_book(
    State(state): State<AppState>,
    caller: CallerId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome: DeleteOutcome = state.catalog.delete(caller, id).await?;
    Ok(Json(DeleteBookResponse {
        id,
        deleted: true,
        failed_asset_deletes: outcome.failed,
    }))
}

/// Collect the recognized multipart fields, streaming file parts straight
/// into the staging area. Unknown fields are skipped.
async fn read_form(staging: &StagingArea, mut multipart: Multipart) -> ApiResult<BookForm> {
    let mut form = BookForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" => form.title = Some(read_text(field).await?),
            "genre" => form.genre = Some(read_text(field).await?),
            "description" => form.description = Some(read_text(field).await?),
            "cover_image" => form.cover = Some(stage_file(staging, field).await?),
            "book_file" => form.content = Some(stage_file(staging, field).await?),
            other => {
                debug!(field = other, "ignoring unrecognized multipart field");
            }
        }
    }
    Ok(form)
}

async fn read_text(field: Field<'_>) -> ApiResult<String> {
    field.text().await.map_err(bad_multipart)
}

/// Stream one file part to disk under the staging area's size bound.
async fn stage_file(staging: &StagingArea, mut field: Field<'_>) -> ApiResult<StagedUpload> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();

    let mut writer = staging.begin(&file_name, &content_type).await?;
    while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
        writer.write(&chunk).await?;
    }
    Ok(writer.finish().await?)
}

fn bad_multipart(err: MultipartError) -> ApiError {
    ApiError::Validation(format!("malformed multipart body: {err}"))
}
