use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, str::FromStr};

/// Upper bound S3 accepts for a presigned URL lifetime (7 days).
const MAX_PRESIGN_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub s3_endpoint: Option<String>,
    pub s3_region: String,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub presign_expiry_secs: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Video storage API issuing presigned S3 URLs")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_STORAGE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_STORAGE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Metadata database URL (overrides VIDEO_STORAGE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Custom S3 endpoint, e.g. http://localhost:9000 for MinIO
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// S3 region (overrides VIDEO_STORAGE_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Static S3 access key; the default AWS credential chain is used when unset
    #[arg(long)]
    pub s3_access_key: Option<String>,

    /// Static S3 secret key
    #[arg(long)]
    pub s3_secret_key: Option<String>,

    /// Lifetime of issued presigned URLs in seconds
    #[arg(long)]
    pub presign_expiry_secs: Option<u64>,

    /// Apply the metadata schema and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::merge(args)?;
        Ok((cfg, migrate))
    }

    fn merge(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("VIDEO_STORAGE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("VIDEO_STORAGE_PORT", 8080u16)?;
        let env_db = env::var("VIDEO_STORAGE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/videos.db".into());
        let env_region =
            env::var("VIDEO_STORAGE_S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let env_expiry = parse_env("VIDEO_STORAGE_PRESIGN_EXPIRY_SECS", 3600u64)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            s3_endpoint: args
                .s3_endpoint
                .or_else(|| env::var("VIDEO_STORAGE_S3_ENDPOINT").ok()),
            s3_region: args.s3_region.unwrap_or(env_region),
            s3_access_key: args
                .s3_access_key
                .or_else(|| env::var("VIDEO_STORAGE_S3_ACCESS_KEY").ok()),
            s3_secret_key: args
                .s3_secret_key
                .or_else(|| env::var("VIDEO_STORAGE_S3_SECRET_KEY").ok()),
            presign_expiry_secs: args.presign_expiry_secs.unwrap_or(env_expiry),
        };
        cfg.validate()?;

        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.presign_expiry_secs == 0 || self.presign_expiry_secs > MAX_PRESIGN_EXPIRY_SECS {
            bail!(
                "presign expiry must be between 1 and {} seconds, got {}",
                MAX_PRESIGN_EXPIRY_SECS,
                self.presign_expiry_secs
            );
        }
        if self.s3_access_key.is_some() != self.s3_secret_key.is_some() {
            bail!("S3 access key and secret key must be configured together");
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read a numeric env var, falling back to `default` when it is unset.
fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
