use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Default per-asset size bound (30 MB).
const DEFAULT_MAX_ASSET_BYTES: u64 = 30 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; built once at startup
/// and passed to the components that need it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Directory holding request-scoped staged uploads.
    pub staging_dir: String,
    /// Base URL of the remote asset store (S3-style PUT/DELETE per key).
    pub asset_store_url: String,
    /// Base URL under which stored assets are publicly reachable.
    /// Defaults to `asset_store_url`.
    pub asset_public_url: String,
    /// Maximum accepted size per staged asset, in bytes.
    pub max_asset_bytes: u64,
    /// Timeout applied to every remote asset store request, in seconds.
    pub upload_timeout_secs: u64,
    /// Secret used to verify caller bearer tokens. Required.
    pub jwt_secret: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Book catalog API with remote asset offload")]
pub struct Args {
    /// Host to bind to (overrides BOOKVAULT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BOOKVAULT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides BOOKVAULT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory for staged uploads (overrides BOOKVAULT_STAGING_DIR)
    #[arg(long)]
    pub staging_dir: Option<String>,

    /// Remote asset store base URL (overrides BOOKVAULT_ASSET_STORE_URL)
    #[arg(long)]
    pub asset_store_url: Option<String>,

    /// Public base URL for stored assets (overrides BOOKVAULT_ASSET_PUBLIC_URL)
    #[arg(long)]
    pub asset_public_url: Option<String>,

    /// Maximum accepted bytes per asset (overrides BOOKVAULT_MAX_ASSET_BYTES)
    #[arg(long)]
    pub max_asset_bytes: Option<u64>,

    /// Remote request timeout in seconds (overrides BOOKVAULT_UPLOAD_TIMEOUT_SECS)
    #[arg(long)]
    pub upload_timeout_secs: Option<u64>,

    /// Token verification secret (overrides BOOKVAULT_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into an AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::merge(args)
    }

    /// Merge pre-parsed args with the environment. Split out from arg
    /// parsing so callers can build a config without touching the process
    /// arguments.
    pub fn merge(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("BOOKVAULT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("BOOKVAULT_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing BOOKVAULT_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading BOOKVAULT_PORT"),
        };
        let env_db = env::var("BOOKVAULT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/bookvault.db".into());
        let env_staging =
            env::var("BOOKVAULT_STAGING_DIR").unwrap_or_else(|_| "./data/staging".into());
        let env_store = env::var("BOOKVAULT_ASSET_STORE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:9000".into());
        let env_public = env::var("BOOKVAULT_ASSET_PUBLIC_URL").ok();
        let env_max_bytes = match env::var("BOOKVAULT_MAX_ASSET_BYTES") {
            Ok(value) => Some(value.parse::<u64>().with_context(|| {
                format!("parsing BOOKVAULT_MAX_ASSET_BYTES value `{}`", value)
            })?),
            Err(_) => None,
        };
        let env_timeout = match env::var("BOOKVAULT_UPLOAD_TIMEOUT_SECS") {
            Ok(value) => Some(value.parse::<u64>().with_context(|| {
                format!("parsing BOOKVAULT_UPLOAD_TIMEOUT_SECS value `{}`", value)
            })?),
            Err(_) => None,
        };
        let env_secret = env::var("BOOKVAULT_JWT_SECRET").ok();

        // --- Merge ---
        let asset_store_url = args
            .asset_store_url
            .unwrap_or(env_store)
            .trim_end_matches('/')
            .to_string();
        let asset_public_url = args
            .asset_public_url
            .or(env_public)
            .unwrap_or_else(|| asset_store_url.clone())
            .trim_end_matches('/')
            .to_string();
        let jwt_secret = args
            .jwt_secret
            .or(env_secret)
            .context("BOOKVAULT_JWT_SECRET (or --jwt-secret) is required")?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            staging_dir: args.staging_dir.unwrap_or(env_staging),
            asset_store_url,
            asset_public_url,
            max_asset_bytes: args
                .max_asset_bytes
                .or(env_max_bytes)
                .unwrap_or(DEFAULT_MAX_ASSET_BYTES),
            upload_timeout_secs: args.upload_timeout_secs.or(env_timeout).unwrap_or(30),
            jwt_secret,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
