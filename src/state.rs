//! Shared application state handed to the router.

use crate::auth::TokenVerifier;
use crate::services::catalog_service::CatalogService;
use crate::staging::StagingArea;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub staging: StagingArea,
    pub verifier: TokenVerifier,
}

impl AppState {
    pub fn new(catalog: CatalogService, staging: StagingArea, verifier: TokenVerifier) -> Self {
        Self {
            catalog,
            staging,
            verifier,
        }
    }
}
