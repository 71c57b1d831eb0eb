//! Shared fixtures: staging areas, staged bytes, seeded records, tokens.

use bookvault::auth::Claims;
use bookvault::models::book::Book;
use bookvault::staging::{StagedUpload, StagingArea};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tempfile::TempDir;
use uuid::Uuid;

/// Secret shared between minted test tokens and the server under test.
pub const TEST_SECRET: &str = "bookvault-test-secret";

/// A staging area rooted in a temp directory that lives as long as the
/// fixture.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct StagingFixture {
    pub area: StagingArea,
    _dir: TempDir,
}

#[allow(dead_code)]
impl StagingFixture {
    pub fn new() -> Self {
        Self::with_limit(1024 * 1024)
    }

    pub fn with_limit(max_bytes: u64) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp staging dir");
        let area = StagingArea::new(dir.path(), max_bytes);
        Self { area, _dir: dir }
    }

    /// Stage one upload with the given bytes.
    pub async fn stage(&self, name: &str, content_type: &str, bytes: &[u8]) -> StagedUpload {
        let mut writer = self
            .area
            .begin(name, content_type)
            .await
            .expect("failed to begin staging");
        writer.write(bytes).await.expect("failed to write staged bytes");
        writer.finish().await.expect("failed to finish staging")
    }

    /// How many staged files are currently on disk.
    pub fn staged_file_count(&self) -> usize {
        std::fs::read_dir(self.area.root())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Mint a bearer token for `caller`, valid for an hour.
#[allow(dead_code)]
pub fn mint_token(caller: Uuid) -> String {
    mint_token_with(TEST_SECRET, &caller.to_string(), Utc::now() + Duration::hours(1))
}

#[allow(dead_code)]
pub fn mint_token_with(secret: &str, sub: &str, expires: chrono::DateTime<Utc>) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: expires.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to mint token")
}

/// A fully-populated record for seeding stores directly.
#[allow(dead_code)]
pub fn sample_book(owner: Uuid) -> Book {
    Book {
        id: Uuid::new_v4(),
        owner_id: owner,
        title: "Dune".to_string(),
        genre: "scifi".to_string(),
        description: String::new(),
        cover_url: "http://assets.test/book-covers/seed-cover.png".to_string(),
        file_url: "http://assets.test/book-files/seed-file.pdf".to_string(),
        created_at: Utc::now(),
    }
}
