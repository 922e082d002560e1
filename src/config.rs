//! Configuration management
//!
//! Every run is driven by an explicit [`Config`] that is passed down to the
//! exchange client and the pagination loop. Values come from built-in
//! defaults, an optional JSON file, `DELTA_BASE_URL` from the environment
//! (or `.env`), and finally command-line overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public REST endpoint of Delta Exchange India
pub const DEFAULT_BASE_URL: &str = "https://api.india.delta.exchange";

/// Environment variable that overrides the base URL
pub const BASE_URL_ENV: &str = "DELTA_BASE_URL";

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// REST API base URL, without trailing slash
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum candles requested per call
    pub limit_per_request: u32,
    /// Pause between pagination requests in milliseconds
    pub request_delay_ms: u64,
    /// Candle resolution used when none is given on the command line
    pub resolution: String,
    /// Directory receiving the CSV output
    pub output_dir: PathBuf,
    /// Rows shown by the ticker ranking
    pub top_n: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
            limit_per_request: 2000,
            request_delay_ms: 100,
            resolution: "1d".to_string(),
            output_dir: PathBuf::from("."),
            top_n: 10,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }

    /// Resolve the configuration for a run
    ///
    /// Precedence, lowest first: defaults, config file, `DELTA_BASE_URL`,
    /// explicit base URL argument.
    pub fn load(path: Option<&Path>, base_url: Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)
                .with_context(|| format!("Failed to load config from {}", p.display()))?,
            None => Config::default(),
        };

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        if let Some(url) = base_url {
            config.base_url = url;
        }

        config.base_url = config.base_url.trim().trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the fetch loop cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("base_url must not be empty");
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("base_url must start with http:// or https://: {}", self.base_url);
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than 0");
        }
        if self.limit_per_request == 0 {
            anyhow::bail!("limit_per_request must be greater than 0");
        }
        if self.top_n == 0 {
            anyhow::bail!("top_n must be greater than 0");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}
