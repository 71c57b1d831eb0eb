//! Counting fakes for the two external stores.

use async_trait::async_trait;
use bookvault::assets::{AssetKind, AssetStore, AssetStoreError, RemoteAssetRef, UploadedAsset};
use bookvault::models::book::{Book, BookChanges, BookFilter, NewBook};
use bookvault::staging::StagedUpload;
use bookvault::store::{CatalogStore, StoreError, StoreResult};
use chrono::Utc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Remote asset store fake with upload/delete counters and per-kind failure
/// injection.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct MockAssetStore {
    uploads: AtomicUsize,
    deletes: AtomicUsize,
    uploaded: Mutex<Vec<(AssetKind, String)>>,
    deleted: Mutex<Vec<RemoteAssetRef>>,
    fail_upload_cover: AtomicBool,
    fail_upload_content: AtomicBool,
    fail_delete_cover: AtomicBool,
    fail_delete_content: AtomicBool,
    fail_health: AtomicBool,
}

#[allow(dead_code)]
impl MockAssetStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            uploads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            uploaded: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            fail_upload_cover: AtomicBool::new(false),
            fail_upload_content: AtomicBool::new(false),
            fail_delete_cover: AtomicBool::new(false),
            fail_delete_content: AtomicBool::new(false),
            fail_health: AtomicBool::new(false),
        })
    }

    /// Permanent URL this fake hands out for a stored key.
    pub fn url_for(kind: AssetKind, key: &str) -> String {
        format!("http://assets.test/{}/{}", kind.bucket(), key)
    }

    pub fn fail_upload(&self, kind: AssetKind) {
        match kind {
            AssetKind::Cover => self.fail_upload_cover.store(true, Ordering::SeqCst),
            AssetKind::Content => self.fail_upload_content.store(true, Ordering::SeqCst),
        }
    }

    pub fn fail_delete(&self, kind: AssetKind) {
        match kind {
            AssetKind::Cover => self.fail_delete_cover.store(true, Ordering::SeqCst),
            AssetKind::Content => self.fail_delete_content.store(true, Ordering::SeqCst),
        }
    }

    pub fn fail_health(&self) {
        self.fail_health.store(true, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Keys successfully stored, in completion order.
    pub fn uploaded_keys(&self) -> Vec<(AssetKind, String)> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn deleted_refs(&self) -> Vec<RemoteAssetRef> {
        self.deleted.lock().unwrap().clone()
    }

    fn upload_should_fail(&self, kind: AssetKind) -> bool {
        match kind {
            AssetKind::Cover => self.fail_upload_cover.load(Ordering::SeqCst),
            AssetKind::Content => self.fail_upload_content.load(Ordering::SeqCst),
        }
    }

    fn delete_should_fail(&self, kind: AssetKind) -> bool {
        match kind {
            AssetKind::Cover => self.fail_delete_cover.load(Ordering::SeqCst),
            AssetKind::Content => self.fail_delete_content.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl AssetStore for MockAssetStore {
    async fn upload(
        &self,
        kind: AssetKind,
        staged: &StagedUpload,
    ) -> Result<UploadedAsset, AssetStoreError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.upload_should_fail(kind) {
            return Err(AssetStoreError::Unavailable(format!(
                "injected {kind} upload failure"
            )));
        }
        let key = staged.staging_key().to_string();
        self.uploaded.lock().unwrap().push((kind, key.clone()));
        Ok(UploadedAsset {
            kind,
            url: Self::url_for(kind, &key),
            key,
        })
    }

    async fn delete(&self, asset: &RemoteAssetRef) -> Result<(), AssetStoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.delete_should_fail(asset.kind) {
            return Err(AssetStoreError::Unavailable(format!(
                "injected {} delete failure",
                asset.kind
            )));
        }
        self.deleted.lock().unwrap().push(asset.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AssetStoreError> {
        if self.fail_health.load(Ordering::SeqCst) {
            Err(AssetStoreError::Unavailable(
                "injected health failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// In-memory catalog store with call counters and failure injection.
#[allow(dead_code)]
pub struct MemoryCatalogStore {
    books: Mutex<Vec<Book>>,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
    fail_insert: AtomicBool,
    vanish_on_update: AtomicBool,
    vanish_on_delete: AtomicBool,
}

#[allow(dead_code)]
impl MemoryCatalogStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            books: Mutex::new(Vec::new()),
            inserts: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_insert: AtomicBool::new(false),
            vanish_on_update: AtomicBool::new(false),
            vanish_on_delete: AtomicBool::new(false),
        })
    }

    /// Place a record directly, bypassing the ingestion flow.
    pub fn seed(&self, book: Book) {
        self.books.lock().unwrap().push(book);
    }

    pub fn get(&self, id: Uuid) -> Option<Book> {
        self.books.lock().unwrap().iter().find(|b| b.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.books.lock().unwrap().len()
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Make the next insert fail.
    pub fn fail_insert(&self) {
        self.fail_insert.store(true, Ordering::SeqCst);
    }

    /// Make the record disappear right before the next conditional update,
    /// as a concurrent delete would.
    pub fn vanish_on_update(&self) {
        self.vanish_on_update.store(true, Ordering::SeqCst);
    }

    /// Make the record disappear right before the next row delete.
    pub fn vanish_on_delete(&self) {
        self.vanish_on_delete.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn insert(
        &self,
        owner_id: Uuid,
        new: &NewBook,
        cover_url: &str,
        file_url: &str,
    ) -> StoreResult<Book> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected insert failure".to_string()));
        }
        let book = Book {
            id: Uuid::new_v4(),
            owner_id,
            title: new.title.clone(),
            genre: new.genre.clone(),
            description: String::new(),
            cover_url: cover_url.to_string(),
            file_url: file_url.to_string(),
            created_at: Utc::now(),
        };
        self.books.lock().unwrap().push(book.clone());
        Ok(book)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Book>> {
        Ok(self.get(id))
    }

    async fn update_by_id(&self, id: Uuid, changes: &BookChanges) -> StoreResult<Option<Book>> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.vanish_on_update.swap(false, Ordering::SeqCst) {
            self.books.lock().unwrap().retain(|b| b.id != id);
            return Ok(None);
        }
        let mut books = self.books.lock().unwrap();
        match books.iter_mut().find(|b| b.id == id) {
            Some(book) => {
                book.title = changes.title.clone();
                book.genre = changes.genre.clone();
                book.description = changes.description.clone();
                book.cover_url = changes.cover_url.clone();
                book.file_url = changes.file_url.clone();
                Ok(Some(book.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.vanish_on_delete.swap(false, Ordering::SeqCst) {
            self.books.lock().unwrap().retain(|b| b.id != id);
            return Ok(false);
        }
        let mut books = self.books.lock().unwrap();
        let before = books.len();
        books.retain(|b| b.id != id);
        Ok(books.len() < before)
    }

    async fn list(&self, filter: &BookFilter, offset: i64, limit: i64) -> StoreResult<Vec<Book>> {
        let books = self.books.lock().unwrap();
        // Reverse insertion order first so the stable sort leaves same-instant
        // rows newest-insert-first, matching the SQLite tie-break.
        let mut matched: Vec<Book> = books
            .iter()
            .rev()
            .filter(|b| matches_filter(filter, b))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, filter: &BookFilter) -> StoreResult<i64> {
        let books = self.books.lock().unwrap();
        Ok(books.iter().filter(|b| matches_filter(filter, b)).count() as i64)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn matches_filter(filter: &BookFilter, book: &Book) -> bool {
    filter.genre.as_deref().is_none_or(|g| g == book.genre)
        && filter.owner_id.is_none_or(|o| o == book.owner_id)
}
