//! Local staging area for uploaded assets.
//!
//! Request bodies are streamed to disk here before the ingestion flow
//! uploads them to the remote asset store. Staged files are request-scoped:
//! a [`StagedUpload`] removes its file when dropped unless it was already
//! removed explicitly, so no exit path leaks a local copy.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Longest file name fragment carried into a staging key.
const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("uploaded asset exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("invalid upload file name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StagingResult<T> = Result<T, StagingError>;

/// Staging store rooted at a single local directory.
#[derive(Clone, Debug)]
pub struct StagingArea {
    root: PathBuf,
    max_bytes: u64,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Create the staging root if it does not exist yet.
    pub async fn ensure_root(&self) -> StagingResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Begin staging one uploaded asset.
    ///
    /// Returns a writer that enforces the per-asset size bound while bytes
    /// stream in, so an oversized body fails before staging completes.
    pub async fn begin(
        &self,
        original_name: &str,
        content_type: &str,
    ) -> StagingResult<StagedWriter> {
        let safe_name = sanitize_file_name(original_name)?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        // Timestamp plus a random token keeps keys unique even when two
        // same-named files land in the same millisecond.
        let mut token = Uuid::new_v4().simple().to_string();
        token.truncate(8);
        let staging_key = format!("{millis}-{token}-{safe_name}");
        let path = self.root.join(&staging_key);
        let file = File::create(&path).await?;
        debug!(staging_key = %staging_key, "staging upload");
        Ok(StagedWriter {
            key: staging_key,
            path,
            file,
            content_type: normalize_content_type(content_type),
            written: 0,
            max_bytes: self.max_bytes,
            finished: false,
        })
    }
}

/// Incremental writer for one staged asset.
///
/// Dropping a writer that was never finished removes the partial file.
pub struct StagedWriter {
    key: String,
    path: PathBuf,
    file: File,
    content_type: String,
    written: u64,
    max_bytes: u64,
    finished: bool,
}

impl StagedWriter {
    /// Append a chunk, rejecting it before anything over the bound hits disk.
    pub async fn write(&mut self, chunk: &[u8]) -> StagingResult<()> {
        let next = self.written + chunk.len() as u64;
        if next > self.max_bytes {
            return Err(StagingError::TooLarge {
                limit: self.max_bytes,
            });
        }
        self.file.write_all(chunk).await?;
        self.written = next;
        Ok(())
    }

    /// Flush and seal the staged file.
    pub async fn finish(mut self) -> StagingResult<StagedUpload> {
        self.file.flush().await?;
        self.finished = true;
        Ok(StagedUpload {
            key: self.key.clone(),
            path: self.path.clone(),
            content_type: self.content_type.clone(),
            size_bytes: self.written,
            removed: false,
        })
    }
}

impl Drop for StagedWriter {
    fn drop(&mut self) {
        if !self.finished {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// A fully staged upload, ready for remote ingestion.
#[derive(Debug)]
pub struct StagedUpload {
    key: String,
    path: PathBuf,
    content_type: String,
    size_bytes: u64,
    removed: bool,
}

impl StagedUpload {
    pub fn staging_key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Remove the staged file.
    ///
    /// A file that is already gone counts as removed, so cleanup stays
    /// idempotent. Failures are reported to the caller but never retried.
    pub async fn remove(mut self) -> StagingResult<()> {
        self.removed = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StagingError::Io(e)),
        }
    }

    /// Best-effort removal for failure paths; logs instead of returning.
    pub async fn discard(self) {
        let key = self.key.clone();
        if let Err(e) = self.remove().await {
            warn!(staging_key = %key, error = %e, "failed to remove staged file");
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Reduce a client-supplied file name to a safe key fragment.
///
/// Takes the basename, replaces anything outside `[A-Za-z0-9._-]`, and
/// bounds the length. Rejects names with nothing usable left.
fn sanitize_file_name(original: &str) -> StagingResult<String> {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let mut safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    safe.truncate(MAX_NAME_LEN);
    if safe.is_empty() || !safe.bytes().any(|b| b.is_ascii_alphanumeric()) {
        return Err(StagingError::InvalidName(original.to_string()));
    }
    Ok(safe)
}

fn normalize_content_type(declared: &str) -> String {
    let trimmed = declared.trim();
    if trimmed.is_empty() {
        "application/octet-stream".to_string()
    } else {
        trimmed.to_string()
    }
}
