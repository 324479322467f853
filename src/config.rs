//! Application configuration loaded from environment variables.

use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::error::RelayError;
use crate::sienge::{Credentials, DateRange};

/// Largest page size the upstream accepts.
pub const MAX_PAGE_LIMIT: u32 = 200;

/// Application configuration loaded from environment variables.
#[derive(Clone, Deserialize)]
pub struct Config {
    // === Sienge Credentials ===
    /// API username.
    pub sienge_user: String,

    /// API password.
    pub sienge_password: String,

    // === Upstream Endpoints ===
    /// Supply contracts listing URL.
    #[serde(default = "default_api_url")]
    pub sienge_api_url: String,

    /// Measurements listing URL; enables measurement enrichment when set.
    #[serde(default)]
    pub sienge_measurements_url: Option<String>,

    // === Pagination ===
    /// First contract start date (YYYY-MM-DD).
    #[serde(default = "default_start_date")]
    pub contract_start_date: String,

    /// Last contract end date (YYYY-MM-DD).
    #[serde(default = "default_end_date")]
    pub contract_end_date: String,

    /// Records per upstream page (1..=200).
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Maximum pages fetched per listing before giving up.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    // === HTTP Client ===
    /// Outbound request timeout in milliseconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    /// Idle connections kept per upstream host.
    #[serde(default = "default_pool_size")]
    pub http_pool_size: usize,

    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for every non-API path.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Expose Prometheus metrics on `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_api_url() -> String {
    "https://api.sienge.com.br/silvapacker/public/api/v1/supply-contracts/all".to_string()
}

fn default_start_date() -> String {
    DateRange::DEFAULT.start_param()
}

fn default_end_date() -> String {
    DateRange::DEFAULT.end_param()
}

fn default_page_limit() -> u32 {
    MAX_PAGE_LIMIT
}

fn default_max_pages() -> u32 {
    1000
}

fn default_http_timeout() -> u64 {
    30_000
}

fn default_pool_size() -> usize {
    10
}

fn default_port() -> u16 {
    8000
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Load configuration and reject it unless it validates.
    pub fn from_env() -> crate::Result<Self> {
        Self::load()?.checked()
    }

    /// Return the configuration if it passes [`Config::validate`].
    pub fn checked(self) -> crate::Result<Self> {
        self.validate().map_err(RelayError::InvalidConfig)?;
        Ok(self)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.sienge_user.trim().is_empty() {
            return Err("SIENGE_USER is required".to_string());
        }

        if self.sienge_password.is_empty() {
            return Err("SIENGE_PASSWORD is required".to_string());
        }

        validate_url("SIENGE_API_URL", &self.sienge_api_url)?;
        if let Some(url) = &self.sienge_measurements_url {
            validate_url("SIENGE_MEASUREMENTS_URL", url)?;
        }

        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(format!("PAGE_LIMIT must be between 1 and {}", MAX_PAGE_LIMIT));
        }

        if self.max_pages == 0 {
            return Err("MAX_PAGES must be at least 1".to_string());
        }

        if self.http_timeout_ms == 0 {
            return Err("HTTP_TIMEOUT_MS must be positive".to_string());
        }

        self.date_range()?;

        Ok(())
    }

    /// Upstream credentials.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.sienge_user.clone(), self.sienge_password.clone())
    }

    /// Configured contract date window.
    pub fn date_range(&self) -> Result<DateRange, String> {
        DateRange::parse(&self.contract_start_date, &self.contract_end_date)
            .map_err(|e| format!("CONTRACT_START_DATE/CONTRACT_END_DATE: {}", e))
    }

    /// Check if measurement enrichment is configured.
    pub fn measurements_enabled(&self) -> bool {
        self.sienge_measurements_url.is_some()
    }
}

fn validate_url(name: &str, value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", name, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("{} must use http or https, got {}", name, other)),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sienge_user", &self.sienge_user)
            .field("sienge_password", &"<redacted>")
            .field("sienge_api_url", &self.sienge_api_url)
            .field("sienge_measurements_url", &self.sienge_measurements_url)
            .field("contract_start_date", &self.contract_start_date)
            .field("contract_end_date", &self.contract_end_date)
            .field("page_limit", &self.page_limit)
            .field("max_pages", &self.max_pages)
            .field("http_timeout_ms", &self.http_timeout_ms)
            .field("http_pool_size", &self.http_pool_size)
            .field("port", &self.port)
            .field("static_dir", &self.static_dir)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("rust_log", &self.rust_log)
            .field("verbose", &self.verbose)
            .finish()
    }
}
