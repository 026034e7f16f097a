//! Service configuration using clap.
//!
//! Every flag can also be supplied through an environment variable so the
//! service can be configured from container environment variables alone.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use lineagekit_core::Dialect;

/// LineageKit - SQL lineage over HTTP
#[derive(Parser, Debug, Clone)]
#[command(name = "lineagekit")]
#[command(about = "Serve SQL table and column lineage over HTTP", long_about = None)]
#[command(version)]
pub struct ServiceConfig {
    /// Address to bind
    #[arg(long, env = "LINEAGEKIT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "LINEAGEKIT_PORT", default_value = "8000")]
    pub port: u16,

    /// Log output format
    #[arg(long, env = "LINEAGEKIT_LOG_FORMAT", default_value = "text", value_enum)]
    pub log_format: LogFormat,

    /// Default log level (RUST_LOG takes precedence when set)
    #[arg(long, env = "LINEAGEKIT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Requests admitted per client within one rate limit window
    #[arg(long, env = "LINEAGEKIT_RATE_LIMIT", default_value = "100")]
    pub rate_limit: u32,

    /// Length of the rate limit window in seconds
    #[arg(long, env = "LINEAGEKIT_RATE_LIMIT_WINDOW_SECS", default_value = "60")]
    pub rate_limit_window_secs: u64,

    /// Largest accepted SQL payload in megabytes
    #[arg(long, env = "LINEAGEKIT_MAX_REQUEST_SIZE_MB", default_value = "50")]
    pub max_request_size_mb: u64,

    /// Upper bound on the time spent analyzing one request
    #[arg(long, env = "LINEAGEKIT_REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Dialect used when a request does not name one
    #[arg(long, env = "LINEAGEKIT_DEFAULT_DIALECT", default_value = "ansi")]
    pub default_dialect: String,

    /// OpenMetadata API base URL (e.g. https://openmetadata.example.com/api/v1)
    #[arg(long, env = "OPENMETADATA_URL", value_name = "URL")]
    pub openmetadata_url: Option<String>,

    /// OpenMetadata bearer token
    #[arg(long, env = "OPENMETADATA_API_KEY", value_name = "KEY", hide_env_values = true)]
    pub openmetadata_api_key: Option<String>,

    /// Timeout for each OpenMetadata request in seconds
    #[arg(long, env = "OPENMETADATA_TIMEOUT_SECS", default_value = "10")]
    pub openmetadata_timeout_secs: u64,

    /// How long fetched table columns stay cached, in seconds
    #[arg(long, env = "OPENMETADATA_CACHE_TTL_SECS", default_value = "300")]
    pub openmetadata_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Connection settings for the metadata catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_format: LogFormat::Text,
            log_level: "info".to_string(),
            rate_limit: 100,
            rate_limit_window_secs: 60,
            max_request_size_mb: 50,
            request_timeout_secs: 30,
            default_dialect: "ansi".to_string(),
            openmetadata_url: None,
            openmetadata_api_key: None,
            openmetadata_timeout_secs: 10,
            openmetadata_cache_ttl_secs: 300,
        }
    }
}

impl ServiceConfig {
    /// Rejects settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit == 0 {
            bail!("--rate-limit must be at least 1");
        }
        if self.rate_limit_window_secs == 0 {
            bail!("--rate-limit-window-secs must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            bail!("--request-timeout-secs must be at least 1");
        }
        if self.openmetadata_timeout_secs == 0 {
            bail!("--openmetadata-timeout-secs must be at least 1");
        }
        if self.max_request_size_mb == 0 {
            bail!("--max-request-size-mb must be at least 1");
        }
        self.default_dialect
            .parse::<Dialect>()
            .with_context(|| format!("invalid --default-dialect '{}'", self.default_dialect))?;
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Maximum accepted request body, in bytes.
    pub fn max_request_bytes(&self) -> usize {
        usize::try_from(self.max_request_size_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }

    /// Catalog settings, present only when both the URL and the key are set.
    pub fn catalog(&self) -> Option<CatalogSettings> {
        let base_url = self.openmetadata_url.as_deref()?.trim();
        let api_key = self.openmetadata_api_key.as_deref()?.trim();
        if base_url.is_empty() || api_key.is_empty() {
            return None;
        }
        Some(CatalogSettings {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(self.openmetadata_timeout_secs),
            cache_ttl: Duration::from_secs(self.openmetadata_cache_ttl_secs),
        })
    }
}
