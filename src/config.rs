use crate::services::{
    listing::SpacesCredentials, redirect_service::RedirectDefaults, tracking::MetaSettings,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub default_bucket: Option<String>,
    pub default_prefix: String,
    pub default_pattern: String,
    pub region: String,
    pub spaces_credentials: Option<SpacesCredentials>,
    pub meta: Option<MetaSettings>,
    pub event_name: String,
    pub tracking_timeout: Duration,
    pub json_logs: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Redirects to the latest installer in a Spaces bucket")]
pub struct Args {
    /// Host to bind to (overrides LATEST_INSTALLER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides LATEST_INSTALLER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Bucket used when a request names none (overrides SPACES_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix to list under (overrides SPACES_PREFIX)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Regex keys must match (overrides FILE_PATTERN)
    #[arg(long)]
    pub pattern: Option<String>,

    /// Spaces region (overrides SPACES_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Upper bound for a conversion event send (overrides TRACKING_TIMEOUT_MS)
    #[arg(long)]
    pub tracking_timeout_ms: Option<u64>,

    /// Emit JSON log lines (also enabled by LOG_FORMAT=json)
    #[arg(long)]
    pub json_logs: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();
        Self::from_sources(args, |name| env::var(name).ok())
    }

    /// Merge `args` over values looked up through `env`.
    pub fn from_sources(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        // --- Environment fallback ---
        let env_host = var("LATEST_INSTALLER_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&var, "LATEST_INSTALLER_PORT", 3000u16)?;
        let env_timeout_ms = parse_var(&var, "TRACKING_TIMEOUT_MS", 3000u64)?;

        let spaces_credentials = match (var("SPACES_KEY"), var("SPACES_SECRET")) {
            (Some(access_key), Some(secret_key)) => Some(SpacesCredentials {
                access_key,
                secret_key,
            }),
            _ => None,
        };

        let meta = match (var("FB_PIXEL_ID"), var("FB_ACCESS_TOKEN")) {
            (Some(pixel_id), Some(access_token)) => Some(MetaSettings {
                pixel_id,
                access_token,
                api_version: var("FB_API_VERSION").unwrap_or_else(|| "v21.0".into()),
                test_event_code: var("FB_TEST_EVENT_CODE"),
            }),
            _ => None,
        };

        let env_json_logs = var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            default_bucket: args.bucket.or_else(|| var("SPACES_BUCKET")),
            default_prefix: args
                .prefix
                .or_else(|| env("SPACES_PREFIX"))
                .unwrap_or_default(),
            default_pattern: args
                .pattern
                .or_else(|| var("FILE_PATTERN"))
                .unwrap_or_else(|| ".*".into()),
            region: args
                .region
                .or_else(|| var("SPACES_REGION"))
                .unwrap_or_else(|| "nyc3".into()),
            spaces_credentials,
            meta,
            event_name: var("FB_EVENT_NAME").unwrap_or_else(|| "Lead".into()),
            tracking_timeout: Duration::from_millis(
                args.tracking_timeout_ms.unwrap_or(env_timeout_ms),
            ),
            json_logs: args.json_logs || env_json_logs,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn redirect_defaults(&self) -> RedirectDefaults {
        RedirectDefaults {
            bucket: self.default_bucket.clone(),
            prefix: self.default_prefix.clone(),
            pattern: self.default_pattern.clone(),
            region: self.region.clone(),
        }
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}

// Secrets stay out of the startup log line.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("default_bucket", &self.default_bucket)
            .field("default_prefix", &self.default_prefix)
            .field("default_pattern", &self.default_pattern)
            .field("region", &self.region)
            .field("spaces_credentials", &self.spaces_credentials.is_some())
            .field(
                "meta_pixel_id",
                &self.meta.as_ref().map(|m| m.pixel_id.as_str()),
            )
            .field("event_name", &self.event_name)
            .field("tracking_timeout", &self.tracking_timeout)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}
