//! Remote asset store abstraction.
//!
//! Book assets live in a remote object store under two fixed namespaces,
//! one per asset kind. The catalog ingestion flow talks to the store through
//! the [`AssetStore`] trait so tests can swap in in-memory fakes; the
//! HTTP-backed production implementation lives in [`http`].

pub mod http;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::staging::StagedUpload;

pub use http::HttpAssetStore;

/// The two kinds of asset attached to every book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Cover,
    Content,
}

impl AssetKind {
    /// Remote namespace (bucket) this kind of asset is stored under.
    pub fn bucket(&self) -> &'static str {
        match self {
            Self::Cover => "book-covers",
            Self::Content => "book-files",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cover => write!(f, "cover"),
            Self::Content => write!(f, "content"),
        }
    }
}

/// Location of one asset inside the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAssetRef {
    pub kind: AssetKind,
    pub key: String,
}

impl RemoteAssetRef {
    pub fn new(kind: AssetKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }

    /// Recover the namespace and key from a stored permanent URL.
    ///
    /// Permanent URLs always end in `/{bucket}/{key}`, so this scans for the
    /// last namespace segment. Pure string work; never touches the network.
    pub fn parse(url: &str) -> Result<Self, AssetStoreError> {
        for kind in [AssetKind::Cover, AssetKind::Content] {
            let marker = format!("/{}/", kind.bucket());
            if let Some(idx) = url.rfind(&marker) {
                let key = &url[idx + marker.len()..];
                if key.is_empty() || key.contains('/') {
                    break;
                }
                return Ok(Self::new(kind, key));
            }
        }
        Err(AssetStoreError::InvalidRef(url.to_string()))
    }
}

impl fmt::Display for RemoteAssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.bucket(), self.key)
    }
}

/// A successfully uploaded asset and its permanent reference.
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    pub kind: AssetKind,
    pub key: String,
    /// Permanent URL, valid for storage in the catalog record.
    pub url: String,
}

#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("asset store request failed")]
    Transport(#[from] reqwest::Error),

    #[error("asset store returned status {status} for {location}")]
    UnexpectedStatus { location: String, status: u16 },

    #[error("failed to read staged file {path}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a remote asset reference: {0}")]
    InvalidRef(String),

    #[error("asset store unavailable: {0}")]
    Unavailable(String),
}

/// Remote object store holding book assets.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload one staged file into the namespace for its kind.
    ///
    /// The remote key is the staging key, which is unique per request, so
    /// replacement uploads never overwrite an asset still referenced by the
    /// catalog.
    async fn upload(
        &self,
        kind: AssetKind,
        staged: &StagedUpload,
    ) -> Result<UploadedAsset, AssetStoreError>;

    /// Delete one asset. Deleting an asset that is already gone succeeds.
    async fn delete(&self, asset: &RemoteAssetRef) -> Result<(), AssetStoreError>;

    /// Probe the store for readiness reporting.
    async fn health_check(&self) -> Result<(), AssetStoreError> {
        Ok(())
    }
}
