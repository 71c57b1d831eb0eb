//! src/services/catalog_service.rs
//!
//! CatalogService — the asset ingestion and consistency orchestrator. It
//! moves a pair of uploaded binaries from local staging to the remote asset
//! store, persists one metadata record referencing them, and keeps the three
//! leaves (staging disk, remote store, metadata database) consistent across
//! every partial-failure combination:
//!
//! - a record is only written once both assets are durably stored, so no
//!   record ever points at an asset that never landed;
//! - remote objects left behind by a failed sibling or a failed metadata
//!   write are orphans: logged with their URLs, never silently hidden,
//!   never rolled back;
//! - staged local copies never outlive the request on any exit path.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assets::{AssetKind, AssetStore, AssetStoreError, RemoteAssetRef, UploadedAsset};
use crate::auth::{authorize, CallerId};
use crate::errors::{ApiError, ApiResult};
use crate::models::book::{Book, BookChanges, BookFilter, BookPage, BookPatch, NewBook};
use crate::staging::StagedUpload;
use crate::store::CatalogStore;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Result of a successful create.
#[derive(Debug)]
pub struct Created {
    pub book: Book,
    /// Degraded-success notes, e.g. a staged copy that could not be removed.
    pub warnings: Vec<String>,
}

/// Result of a successful update.
#[derive(Debug)]
pub struct Updated {
    pub book: Book,
    pub warnings: Vec<String>,
}

/// Result of a delete. The record is gone; `failed` lists remote assets
/// whose deletion did not succeed and which are now orphans.
#[derive(Debug)]
pub struct DeleteOutcome {
    pub failed: Vec<AssetKind>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    assets: Arc<dyn AssetStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, assets: Arc<dyn AssetStore>) -> Self {
        Self { store, assets }
    }

    /// Ingest a new book: two staged assets plus metadata.
    ///
    /// - Validates before any remote or metadata I/O: both assets present,
    ///   title and genre non-empty.
    /// - Uploads cover and content concurrently; latency is bounded by the
    ///   slower of the two.
    /// - Writes the metadata record in a single insert carrying both
    ///   permanent references, only after both uploads succeeded.
    /// - Removes the staged copies afterwards; a removal failure does not
    ///   fail the request but is surfaced in `warnings`.
    #[tracing::instrument(skip_all, fields(owner = %owner))]
    pub async fn create(
        &self,
        owner: CallerId,
        new: NewBook,
        cover: Option<StagedUpload>,
        content: Option<StagedUpload>,
    ) -> ApiResult<Created> {
        let cover = cover
            .ok_or_else(|| ApiError::Validation("cover image is required".to_string()))?;
        let content = content
            .ok_or_else(|| ApiError::Validation("book file is required".to_string()))?;
        let new = NewBook {
            title: require_text(&new.title, "title")?,
            genre: require_text(&new.genre, "genre")?,
        };

        debug!(
            cover_key = cover.staging_key(),
            content_key = content.staging_key(),
            "uploading staged assets"
        );
        let (cover_result, content_result) = tokio::join!(
            self.assets.upload(AssetKind::Cover, &cover),
            self.assets.upload(AssetKind::Content, &content),
        );
        let (cover_asset, content_asset) = match (cover_result, content_result) {
            (Ok(c), Ok(f)) => (c, f),
            (Err(e), Ok(orphan)) => {
                log_orphan(&orphan, "sibling upload failed");
                discard_both(Some(cover), Some(content)).await;
                return Err(ApiError::AssetUpload {
                    asset: AssetKind::Cover,
                    source: e,
                });
            }
            (Ok(orphan), Err(e)) => {
                log_orphan(&orphan, "sibling upload failed");
                discard_both(Some(cover), Some(content)).await;
                return Err(ApiError::AssetUpload {
                    asset: AssetKind::Content,
                    source: e,
                });
            }
            (Err(e), Err(content_err)) => {
                debug!(error = %content_err, "content upload failed alongside cover");
                discard_both(Some(cover), Some(content)).await;
                return Err(ApiError::AssetUpload {
                    asset: AssetKind::Cover,
                    source: e,
                });
            }
        };

        let book = match self
            .store
            .insert(owner.0, &new, &cover_asset.url, &content_asset.url)
            .await
        {
            Ok(book) => book,
            Err(e) => {
                warn!(
                    cover_url = %cover_asset.url,
                    file_url = %content_asset.url,
                    error = %e,
                    "metadata insert failed; both remote assets orphaned"
                );
                discard_both(Some(cover), Some(content)).await;
                return Err(ApiError::Persist {
                    orphans: vec![cover_asset.url, content_asset.url],
                    source: e,
                });
            }
        };

        let mut warnings = Vec::new();
        cleanup_staged(cover, book.id, &mut warnings).await;
        cleanup_staged(content, book.id, &mut warnings).await;

        info!(book_id = %book.id, title = %book.title, "book created");
        Ok(Created { book, warnings })
    }

    /// Fetch one record.
    pub async fn get(&self, id: Uuid) -> ApiResult<Book> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound(id))
    }

    /// Update metadata and optionally replace either asset.
    ///
    /// - Lookup and ownership check happen before any remote I/O; a
    ///   non-owner triggers none.
    /// - Replacement uploads go to fresh keys and run concurrently when both
    ///   slots are replaced; untouched slots carry the stored reference
    ///   forward. Replaced remote objects are retained, not deleted.
    /// - The metadata write is one conditional update; a record that
    ///   vanished since the lookup yields `NotFound` and the fresh uploads
    ///   become logged orphans.
    #[tracing::instrument(skip_all, fields(caller = %caller, book_id = %id))]
    pub async fn update(
        &self,
        caller: CallerId,
        id: Uuid,
        patch: BookPatch,
        new_cover: Option<StagedUpload>,
        new_content: Option<StagedUpload>,
    ) -> ApiResult<Updated> {
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound(id))?;
        authorize(caller, existing.owner_id)?;

        let patch = BookPatch {
            title: patch
                .title
                .map(|t| require_text(&t, "title"))
                .transpose()?,
            genre: patch
                .genre
                .map(|g| require_text(&g, "genre"))
                .transpose()?,
            description: patch.description,
        };

        let (cover_result, content_result) = tokio::join!(
            self.upload_replacement(AssetKind::Cover, new_cover.as_ref()),
            self.upload_replacement(AssetKind::Content, new_content.as_ref()),
        );
        let (cover_asset, content_asset) = match (cover_result, content_result) {
            (Ok(c), Ok(f)) => (c, f),
            (Err(e), other) => {
                if let Ok(Some(orphan)) = &other {
                    log_orphan(orphan, "sibling replacement failed");
                }
                discard_both(new_cover, new_content).await;
                return Err(ApiError::AssetUpload {
                    asset: AssetKind::Cover,
                    source: e,
                });
            }
            (Ok(cover_ok), Err(e)) => {
                if let Some(orphan) = &cover_ok {
                    log_orphan(orphan, "sibling replacement failed");
                }
                discard_both(new_cover, new_content).await;
                return Err(ApiError::AssetUpload {
                    asset: AssetKind::Content,
                    source: e,
                });
            }
        };

        if cover_asset.is_some() {
            info!(previous = %existing.cover_url, "cover replaced; previous remote object retained");
        }
        if content_asset.is_some() {
            info!(previous = %existing.file_url, "content replaced; previous remote object retained");
        }

        let fresh_urls: Vec<String> = [&cover_asset, &content_asset]
            .into_iter()
            .flatten()
            .map(|a| a.url.clone())
            .collect();
        let changes = BookChanges {
            title: patch.title.unwrap_or(existing.title),
            genre: patch.genre.unwrap_or(existing.genre),
            description: patch.description.unwrap_or(existing.description),
            cover_url: cover_asset
                .map(|a| a.url)
                .unwrap_or(existing.cover_url),
            file_url: content_asset
                .map(|a| a.url)
                .unwrap_or(existing.file_url),
        };

        let updated = self.store.update_by_id(id, &changes).await?;
        let Some(book) = updated else {
            if !fresh_urls.is_empty() {
                warn!(
                    orphans = ?fresh_urls,
                    "record vanished during update; replacement assets orphaned"
                );
            }
            discard_both(new_cover, new_content).await;
            return Err(ApiError::NotFound(id));
        };

        let mut warnings = Vec::new();
        if let Some(staged) = new_cover {
            cleanup_staged(staged, book.id, &mut warnings).await;
        }
        if let Some(staged) = new_content {
            cleanup_staged(staged, book.id, &mut warnings).await;
        }

        info!(book_id = %book.id, "book updated");
        Ok(Updated { book, warnings })
    }

    /// Remove a record and its remote assets.
    ///
    /// Deletion order is remote cover, remote content, metadata row last. A
    /// remote deletion failure is recorded in the outcome and never blocks
    /// the next step; the row is removed regardless. A row already gone at
    /// the final conditional delete yields `NotFound`, so deleting the same
    /// id twice reports `NotFound` the second time.
    #[tracing::instrument(skip_all, fields(caller = %caller, book_id = %id))]
    pub async fn delete(&self, caller: CallerId, id: Uuid) -> ApiResult<DeleteOutcome> {
        let book = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound(id))?;
        authorize(caller, book.owner_id)?;

        let mut failed = Vec::new();
        if !self.delete_remote(AssetKind::Cover, &book.cover_url).await {
            failed.push(AssetKind::Cover);
        }
        if !self.delete_remote(AssetKind::Content, &book.file_url).await {
            failed.push(AssetKind::Content);
        }

        if !self.store.delete_by_id(id).await? {
            return Err(ApiError::NotFound(id));
        }

        info!(failed_asset_deletes = failed.len(), "book deleted");
        Ok(DeleteOutcome { failed })
    }

    /// Fetch one page of records, newest first.
    ///
    /// `page` defaults to 1, `page_size` to 10 and is capped at 100. Totals
    /// reflect the filtered query, so `total_pages` is consistent with what
    /// paging through the same filter would return.
    pub async fn list(
        &self,
        filter: BookFilter,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> ApiResult<BookPage> {
        let current_page = page.unwrap_or(DEFAULT_PAGE).max(1);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        // `page` is caller-controlled; the integer ceiling must yield an
        // empty page, not an overflow.
        let offset = current_page.saturating_sub(1).saturating_mul(page_size);

        let items = self.store.list(&filter, offset, page_size).await?;
        let total_count = self.store.count(&filter).await?;
        let total_pages = (total_count + page_size - 1) / page_size;

        Ok(BookPage {
            items,
            total_count,
            total_pages,
            current_page,
        })
    }

    /// Probe the metadata store, for readiness reporting.
    pub async fn store_ready(&self) -> Result<(), crate::store::StoreError> {
        self.store.health_check().await
    }

    /// Probe the remote asset store, for readiness reporting.
    pub async fn assets_ready(&self) -> Result<(), AssetStoreError> {
        self.assets.health_check().await
    }

    async fn upload_replacement(
        &self,
        kind: AssetKind,
        staged: Option<&StagedUpload>,
    ) -> Result<Option<UploadedAsset>, AssetStoreError> {
        match staged {
            Some(staged) => Ok(Some(self.assets.upload(kind, staged).await?)),
            None => Ok(None),
        }
    }

    /// Returns whether the remote object is gone. An unparseable stored
    /// reference counts as a failed deletion; it is logged and left behind.
    async fn delete_remote(&self, kind: AssetKind, url: &str) -> bool {
        let asset = match RemoteAssetRef::parse(url) {
            Ok(asset) => asset,
            Err(e) => {
                warn!(kind = %kind, url = url, error = %e, "stored asset reference is not parseable");
                return false;
            }
        };
        match self.assets.delete(&asset).await {
            Ok(()) => true,
            Err(e) => {
                warn!(kind = %kind, url = url, error = %e, "remote asset deletion failed; object orphaned");
                false
            }
        }
    }
}

fn require_text(value: &str, field: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn log_orphan(asset: &UploadedAsset, cause: &str) {
    warn!(kind = %asset.kind, url = %asset.url, cause, "remote asset orphaned");
}

async fn discard_both(cover: Option<StagedUpload>, content: Option<StagedUpload>) {
    if let Some(staged) = cover {
        staged.discard().await;
    }
    if let Some(staged) = content {
        staged.discard().await;
    }
}

async fn cleanup_staged(staged: StagedUpload, book_id: Uuid, warnings: &mut Vec<String>) {
    let key = staged.staging_key().to_string();
    if let Err(e) = staged.remove().await {
        warn!(book_id = %book_id, staging_key = %key, error = %e, "staged copy was not removed");
        warnings.push(format!("staged copy {key} was not removed: {e}"));
    }
}
