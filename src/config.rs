//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tradelens.toml` files.

use crate::agent::{ClientConfig, StreamMode, StreamOptions};
use crate::cli::{Args, Command};
use crate::models::Currency;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".tradelens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// CSV source locations.
    #[serde(default)]
    pub data: DataConfig,

    /// Analysis API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Reveal settings for chat answers.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Dashboard display settings.
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Where the trade CSVs live. Each entry is a path or an `http(s)://` URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_imports_path")]
    pub imports_path: String,

    #[serde(default = "default_exports_path")]
    pub exports_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            imports_path: default_imports_path(),
            exports_path: default_exports_path(),
        }
    }
}

fn default_imports_path() -> String {
    "data/imports.csv".to_string()
}

fn default_exports_path() -> String {
    "data/exports.csv".to_string()
}

/// Analysis API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the analysis backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout_seconds: self.timeout_seconds,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    120 // 2 min
}

/// Typewriter reveal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Minimum characters per revealed chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Delay between chunks in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Pause between the dataset and expert answers in milliseconds.
    #[serde(default = "default_agent_pause_ms")]
    pub agent_pause_ms: u64,

    /// Split by words or by sentences.
    #[serde(default)]
    pub mode: StreamMode,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            delay_ms: default_delay_ms(),
            agent_pause_ms: default_agent_pause_ms(),
            mode: StreamMode::default(),
        }
    }
}

impl StreamConfig {
    pub fn options(&self) -> StreamOptions {
        StreamOptions {
            chunk_size: self.chunk_size,
            delay: Duration::from_millis(self.delay_ms),
            mode: self.mode,
        }
    }

    pub fn agent_pause(&self) -> Duration {
        Duration::from_millis(self.agent_pause_ms)
    }
}

fn default_chunk_size() -> usize {
    80
}

fn default_delay_ms() -> u64 {
    40
}

fn default_agent_pause_ms() -> u64 {
    500
}

/// Dashboard display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Currency values are projected into.
    #[serde(default)]
    pub currency: Currency,

    /// Slices shown before the rest is folded into `Others`.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            top_n: default_top_n(),
        }
    }
}

fn default_top_n() -> usize {
    crate::analysis::DEFAULT_TOP_N
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, and only
    /// override when they were actually given.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref imports) = args.imports {
            self.data.imports_path = imports.clone();
        }
        if let Some(ref exports) = args.exports {
            self.data.exports_path = exports.clone();
        }

        if let Some(ref api_url) = args.api_url {
            self.api.base_url = api_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }

        if let Some(currency) = args.currency {
            self.display.currency = currency;
        }
        if let Some(top) = args.top {
            self.display.top_n = top;
        }

        if let Some(Command::Chat {
            mode,
            chunk_size,
            delay_ms,
        }) = &args.command
        {
            if let Some(mode) = mode {
                self.stream.mode = *mode;
            }
            if let Some(chunk_size) = chunk_size {
                self.stream.chunk_size = *chunk_size;
            }
            if let Some(delay_ms) = delay_ms {
                self.stream.delay_ms = *delay_ms;
            }
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
