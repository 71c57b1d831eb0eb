//! HTTP-backed [`AssetStore`] implementation.
//!
//! Talks to an S3-style object store over its path-based REST interface:
//! `PUT {endpoint}/{bucket}/{key}` to upload, `DELETE` on the same path to
//! remove. Uploads stream from the staged file on disk, so large assets are
//! never buffered whole in memory.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::assets::{AssetKind, AssetStore, AssetStoreError, RemoteAssetRef, UploadedAsset};
use crate::staging::StagedUpload;

pub struct HttpAssetStore {
    client: reqwest::Client,
    endpoint: String,
    public_base: String,
}

impl HttpAssetStore {
    /// Build a client for the store behind `endpoint`.
    ///
    /// `public_base` is the prefix baked into permanent URLs; it may differ
    /// from `endpoint` when assets are served through a CDN or gateway.
    pub fn new(
        endpoint: impl Into<String>,
        public_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AssetStoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: trim_base(endpoint.into()),
            public_base: trim_base(public_base.into()),
        })
    }

    fn object_url(&self, kind: AssetKind, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, kind.bucket(), key)
    }

    fn public_url(&self, kind: AssetKind, key: &str) -> String {
        format!("{}/{}/{}", self.public_base, kind.bucket(), key)
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn upload(
        &self,
        kind: AssetKind,
        staged: &StagedUpload,
    ) -> Result<UploadedAsset, AssetStoreError> {
        let key = staged.staging_key().to_string();
        let location = self.object_url(kind, &key);

        let file = File::open(staged.path())
            .await
            .map_err(|e| AssetStoreError::LocalRead {
                path: staged.path().to_path_buf(),
                source: e,
            })?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .client
            .put(&location)
            .header(CONTENT_TYPE, staged.content_type())
            .header(CONTENT_LENGTH, staged.size_bytes())
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AssetStoreError::UnexpectedStatus {
                location,
                status: response.status().as_u16(),
            });
        }

        debug!(kind = %kind, key = %key, "uploaded asset");
        Ok(UploadedAsset {
            kind,
            key: key.clone(),
            url: self.public_url(kind, &key),
        })
    }

    async fn delete(&self, asset: &RemoteAssetRef) -> Result<(), AssetStoreError> {
        let location = self.object_url(asset.kind, &asset.key);
        let response = self.client.delete(&location).send().await?;
        match response.status() {
            // An asset that is already gone is the outcome we wanted.
            StatusCode::NOT_FOUND => Ok(()),
            s if s.is_success() => Ok(()),
            s => Err(AssetStoreError::UnexpectedStatus {
                location,
                status: s.as_u16(),
            }),
        }
    }

    async fn health_check(&self) -> Result<(), AssetStoreError> {
        let location = format!("{}/healthz", self.endpoint);
        let response = self
            .client
            .get(&location)
            .send()
            .await
            .map_err(|e| AssetStoreError::Unavailable(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AssetStoreError::Unavailable(format!(
                "health probe returned {}",
                response.status()
            )))
        }
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}
