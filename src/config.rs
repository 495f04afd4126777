//! Configuration for OGS Insight
//!
//! Layered loading: an optional TOML file, then environment variables
//! prefixed with `OGS_INSIGHT` (sections separated by `__`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! api_base_url = "https://online-go.com"
//! review_socket_url = "wss://ai.online-go.com/"
//! request_timeout_secs = 30
//!
//! [ingestion]
//! target_games = 50
//! page_size = 25
//! board_size = 19
//! throttle_ms = 600
//! review_list_backoff_ms = 1000
//! review_error_delay_ms = 600
//!
//! [retry]
//! max_attempts = 3
//! backoff_step_ms = 800
//!
//! [review_stream]
//! timeout_secs = 15
//!
//! [cache]
//! capacity = 1024
//! ```

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "OGS_INSIGHT";

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub ingestion: IngestionSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub review_stream: ReviewStreamSettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

/// Upstream endpoints and credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_review_socket_url")]
    pub review_socket_url: String,

    /// Sent as `Authorization: Bearer` and used instead of an anonymous token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Wait after a failed anonymous-token request before asking again
    #[serde(default = "default_auth_cooldown")]
    pub auth_failure_cooldown_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            review_socket_url: default_review_socket_url(),
            bearer_token: None,
            request_timeout_secs: default_request_timeout(),
            auth_failure_cooldown_secs: default_auth_cooldown(),
        }
    }
}

/// Pipeline pacing and selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionSettings {
    /// Stop after this many analyzed games
    #[serde(default = "default_target_games")]
    pub target_games: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Only square boards of this size are analyzed
    #[serde(default = "default_board_size")]
    pub board_size: u32,

    /// Pause after each analyzed game
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Pause after a failed review-list request
    #[serde(default = "default_review_list_backoff_ms")]
    pub review_list_backoff_ms: u64,

    /// Pause after a failed review fetch
    #[serde(default = "default_throttle_ms")]
    pub review_error_delay_ms: u64,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            target_games: default_target_games(),
            page_size: default_page_size(),
            board_size: default_board_size(),
            throttle_ms: default_throttle_ms(),
            review_list_backoff_ms: default_review_list_backoff_ms(),
            review_error_delay_ms: default_throttle_ms(),
        }
    }
}

impl IngestionSettings {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn review_list_backoff(&self) -> Duration {
        Duration::from_millis(self.review_list_backoff_ms)
    }

    pub fn review_error_delay(&self) -> Duration {
        Duration::from_millis(self.review_error_delay_ms)
    }
}

/// Retry schedule for directory and review-list requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff grows by this step per attempt (800, 1600, 2400 ms, ...)
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step_ms(),
        }
    }
}

/// AI review channel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewStreamSettings {
    #[serde(default = "default_stream_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_client_version")]
    pub client_version: String,

    #[serde(default = "default_language_version")]
    pub language_version: String,
}

impl Default for ReviewStreamSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_stream_timeout(),
            language: default_language(),
            client_version: default_client_version(),
            language_version: default_language_version(),
        }
    }
}

impl ReviewStreamSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum cached responses; 0 disables the cache
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

// Default value helpers
fn default_api_base_url() -> String {
    "https://online-go.com".to_string()
}

fn default_review_socket_url() -> String {
    "wss://ai.online-go.com/".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_auth_cooldown() -> u64 {
    8
}

fn default_target_games() -> u32 {
    50
}

fn default_page_size() -> u32 {
    25
}

fn default_board_size() -> u32 {
    19
}

fn default_throttle_ms() -> u64 {
    600
}

fn default_review_list_backoff_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_step_ms() -> u64 {
    800
}

fn default_stream_timeout() -> u64 {
    15
}

fn default_language() -> String {
    "en".to_string()
}

fn default_client_version() -> String {
    "5.1-8955-gf723043f".to_string()
}

fn default_language_version() -> String {
    "56583ff4aa3a8b724c611b750e451d61".to_string()
}

fn default_cache_capacity() -> usize {
    1024
}

impl InsightConfig {
    /// Load configuration from an optional file plus environment overrides
    ///
    /// A missing file is not an error; defaults fill every absent field.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Config file not found, using defaults: {:?}", path);
        }

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<InsightConfig>()?;

        tracing::debug!("Loaded configuration: {:?}", config.redacted());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| InsightError::Other(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Copy safe to log: the bearer token is masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.server.bearer_token.is_some() {
            copy.server.bearer_token = Some("***".to_string());
        }
        copy
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        PathBuf::from("ogs-insight.toml")
    }
}
