//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use anyhow::{Context, bail, ensure};
use studio_core::provider::gemini::DEFAULT_BASE_URL;
use studio_core::{GeminiConfig, PoolConfig};

/// Runtime configuration for studio-server.
///
/// Everything except the provider API key has a default.  Out-of-range
/// values fail startup rather than being clamped.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8080"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Whole-call bound on one provider request, 5..=120 seconds.
    pub gemini_timeout_secs: u64,
    /// Retry hint returned when a 429 carries none.
    pub quota_retry_after_secs: u64,

    /// How long a strategy waits for the provider.
    pub strategy_wait_secs: u64,

    pub pool_core: usize,
    pub pool_max: usize,
    pub pool_queue: usize,

    /// Directory generated images are written to.
    pub storage_path: String,

    /// Request body limit in MiB; base64 source images are large.
    pub max_body_mb: usize,

    /// Comma-separated CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("gemini_api_key", &"[REDACTED]")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_timeout_secs", &self.gemini_timeout_secs)
            .field("pool_core", &self.pool_core)
            .field("pool_max", &self.pool_max)
            .field("pool_queue", &self.pool_queue)
            .field("storage_path", &self.storage_path)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Build [`Config`] from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("STUDIO_GEMINI_API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .context("STUDIO_GEMINI_API_KEY (or GEMINI_API_KEY) must be set")?;

        let cfg = Self {
            bind_address: get("STUDIO_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_owned()),
            log_level: get("STUDIO_LOG").unwrap_or_else(|| "info".to_owned()),
            log_json: get("STUDIO_LOG_JSON").is_some_and(|v| flag(&v)),
            gemini_api_key,
            gemini_model: get("STUDIO_GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-2.5-flash-image".to_owned()),
            gemini_base_url: get("STUDIO_GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            gemini_timeout_secs: parse_or(&get, "STUDIO_GEMINI_TIMEOUT_SECS", 60)?,
            quota_retry_after_secs: parse_or(&get, "STUDIO_QUOTA_RETRY_AFTER_SECS", 60)?,
            strategy_wait_secs: parse_or(&get, "STUDIO_STRATEGY_WAIT_SECS", 30)?,
            pool_core: parse_or(&get, "STUDIO_POOL_CORE", 4)?,
            pool_max: parse_or(&get, "STUDIO_POOL_MAX", 8)?,
            pool_queue: parse_or(&get, "STUDIO_POOL_QUEUE", 100)?,
            storage_path: get("STUDIO_STORAGE_PATH")
                .unwrap_or_else(|| "./generated-images".to_owned()),
            max_body_mb: parse_or(&get, "STUDIO_MAX_BODY_MB", 20)?,
            cors_allowed_origins: get("STUDIO_CORS_ORIGINS"),
            enable_swagger: get("STUDIO_ENABLE_SWAGGER").is_none_or(|v| flag(&v)),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        in_range("STUDIO_GEMINI_TIMEOUT_SECS", self.gemini_timeout_secs, 5, 120)?;
        in_range("STUDIO_STRATEGY_WAIT_SECS", self.strategy_wait_secs, 1, 600)?;
        in_range("STUDIO_POOL_CORE", self.pool_core, 1, 100)?;
        in_range("STUDIO_POOL_MAX", self.pool_max, 1, 200)?;
        in_range("STUDIO_POOL_QUEUE", self.pool_queue, 1, 1000)?;
        in_range("STUDIO_MAX_BODY_MB", self.max_body_mb, 1, 100)?;
        ensure!(
            self.pool_core <= self.pool_max,
            "STUDIO_POOL_CORE ({}) must not exceed STUDIO_POOL_MAX ({})",
            self.pool_core,
            self.pool_max
        );
        Ok(())
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            base_url: self.gemini_base_url.clone(),
            timeout: Duration::from_secs(self.gemini_timeout_secs),
            default_retry_after_secs: self.quota_retry_after_secs,
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            core: self.pool_core,
            max: self.pool_max,
            queue: self.pool_queue,
        }
    }

    pub fn strategy_wait(&self) -> Duration {
        Duration::from_secs(self.strategy_wait_secs)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb * 1024 * 1024
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is not valid: {e}")),
    }
}

fn in_range<T>(key: &str, value: T, min: T, max: T) -> anyhow::Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        bail!("{key}={value} is out of range ({min}..={max})");
    }
    Ok(())
}
