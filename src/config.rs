use anyhow::{Context, Result};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Development fallback; boot logs a warning whenever it is in effect.
pub const DEV_JWT_SECRET: &str = "pdf-tools-hub-dev-secret";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments, built once at boot and
/// injected into the application state.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Public directory produced artifacts are served from.
    pub uploads_dir: PathBuf,
    /// Scratch directory for received uploads.
    pub temp_dir: PathBuf,
    pub jwt_secret: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub artifact_ttl: Duration,
    pub sweep_interval: Duration,
    /// Upper bound for a whole multipart request body.
    pub max_request_bytes: usize,
    /// Take the caller address from `X-Forwarded-For` instead of the peer.
    pub trust_proxy: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "PDF Tools Hub API")]
pub struct Args {
    /// Host to bind to (overrides PDFHUB_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PDFHUB_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides PDFHUB_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory produced files are served from (overrides PDFHUB_UPLOADS_DIR)
    #[arg(long)]
    pub uploads_dir: Option<PathBuf>,

    /// Directory for in-flight uploads (overrides PDFHUB_TEMP_DIR)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Secret used to sign admin tokens (overrides PDFHUB_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,

    /// Admin login seeded at boot (overrides PDFHUB_ADMIN_EMAIL)
    #[arg(long)]
    pub admin_email: Option<String>,

    /// Admin password seeded at boot (overrides PDFHUB_ADMIN_PASSWORD)
    #[arg(long)]
    pub admin_password: Option<String>,

    /// Seconds an artifact stays downloadable (overrides PDFHUB_ARTIFACT_TTL_SECS)
    #[arg(long)]
    pub artifact_ttl_secs: Option<u64>,

    /// Seconds between expiry sweeps (overrides PDFHUB_SWEEP_INTERVAL_SECS)
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,

    /// Maximum multipart request size in bytes (overrides PDFHUB_MAX_REQUEST_BYTES)
    #[arg(long)]
    pub max_request_bytes: Option<usize>,

    /// Trust X-Forwarded-For for caller addresses (overrides PDFHUB_TRUST_PROXY)
    #[arg(long)]
    pub trust_proxy: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("PDFHUB_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parse("PDFHUB_PORT", 5000u16)?;
        let env_db = env::var("PDFHUB_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/pdfhub.db".into());
        let env_uploads = env::var("PDFHUB_UPLOADS_DIR").unwrap_or_else(|_| "./uploads".into());
        let env_temp = env::var("PDFHUB_TEMP_DIR").unwrap_or_else(|_| "./temp".into());
        let env_secret = env::var("PDFHUB_JWT_SECRET").ok();
        let env_ttl = env_parse("PDFHUB_ARTIFACT_TTL_SECS", 600u64)?;
        let env_sweep = env_parse("PDFHUB_SWEEP_INTERVAL_SECS", 30u64)?;
        let env_max_request = env_parse("PDFHUB_MAX_REQUEST_BYTES", 100 * 1024 * 1024usize)?;
        let env_trust_proxy = env_parse("PDFHUB_TRUST_PROXY", false)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            uploads_dir: args.uploads_dir.unwrap_or_else(|| env_uploads.into()),
            temp_dir: args.temp_dir.unwrap_or_else(|| env_temp.into()),
            jwt_secret: args
                .jwt_secret
                .or(env_secret)
                .unwrap_or_else(|| DEV_JWT_SECRET.into()),
            admin_email: args.admin_email.or_else(|| env::var("PDFHUB_ADMIN_EMAIL").ok()),
            admin_password: args
                .admin_password
                .or_else(|| env::var("PDFHUB_ADMIN_PASSWORD").ok()),
            artifact_ttl: Duration::from_secs(args.artifact_ttl_secs.unwrap_or(env_ttl)),
            sweep_interval: Duration::from_secs(
                args.sweep_interval_secs.unwrap_or(env_sweep).max(1),
            ),
            max_request_bytes: args.max_request_bytes.unwrap_or(env_max_request),
            trust_proxy: args.trust_proxy || env_trust_proxy,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

// Hand-written so the JWT secret and admin password never reach the logs.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("uploads_dir", &self.uploads_dir)
            .field("temp_dir", &self.temp_dir)
            .field("admin_email", &self.admin_email)
            .field("artifact_ttl", &self.artifact_ttl)
            .field("sweep_interval", &self.sweep_interval)
            .field("max_request_bytes", &self.max_request_bytes)
            .field("trust_proxy", &self.trust_proxy)
            .finish_non_exhaustive()
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
