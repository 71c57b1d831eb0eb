//! Server test utilities.

use std::sync::Arc;

use bookvault::AppState;
use bookvault::auth::TokenVerifier;
use bookvault::routes::routes::routes;
use bookvault::services::catalog_service::CatalogService;
use bookvault::staging::StagingArea;
use tempfile::TempDir;

use super::fixtures::TEST_SECRET;
use super::mocks::{MemoryCatalogStore, MockAssetStore};

/// Per-asset staging bound used by default test servers.
pub const TEST_ASSET_LIMIT: u64 = 1024 * 1024;

/// Request body ceiling, sized well past two assets at the bound.
pub const TEST_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub store: Arc<MemoryCatalogStore>,
    pub assets: Arc<MockAssetStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server over in-memory fakes and temp staging.
    pub async fn new() -> Self {
        Self::with_asset_limit(TEST_ASSET_LIMIT).await
    }

    /// Create a test server with a custom per-asset staging bound.
    pub async fn with_asset_limit(max_asset_bytes: u64) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let staging_path = temp_dir.path().join("staging");
        std::fs::create_dir_all(&staging_path).expect("Failed to create staging directory");

        let store = MemoryCatalogStore::new();
        let assets = MockAssetStore::new();
        let catalog = CatalogService::new(store.clone(), assets.clone());
        let staging = StagingArea::new(&staging_path, max_asset_bytes);
        let verifier = TokenVerifier::new(TEST_SECRET);

        let state = AppState::new(catalog, staging, verifier);
        let router = routes(TEST_BODY_LIMIT).with_state(state.clone());

        Self {
            router,
            state,
            store,
            assets,
            _temp_dir: temp_dir,
        }
    }

    /// How many staged files are currently on disk.
    pub fn staged_file_count(&self) -> usize {
        std::fs::read_dir(self.state.staging.root())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
