//! Anonymous token acquisition for the review channel
//!
//! The channel accepts unauthenticated connections, so a missing token only
//! degrades the session. A failed acquisition is remembered for a cooldown
//! window instead of being retried on every game.

use crate::config::ServerSettings;
use crate::error::{InsightError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Something that may supply a JWT for the review channel
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Option<String>;
}

/// Fixed token, or none at all
#[async_trait]
impl TokenSource for Option<String> {
    async fn token(&self) -> Option<String> {
        self.clone()
    }
}

#[derive(Debug, Deserialize)]
struct UiConfig {
    anon_jwt: Option<String>,
}

#[derive(Debug, Default)]
struct TokenState {
    jwt: Option<String>,
    last_failure: Option<Instant>,
}

/// Fetches and caches the anonymous JWT from `/api/v1/ui/config`
///
/// Concurrent callers share one in-flight request: the state lock is held
/// across the fetch.
pub struct AnonTokenProvider {
    client: Client,
    config_url: String,
    configured: Option<String>,
    cooldown: Duration,
    state: Mutex<TokenState>,
    requests: AtomicU32,
}

impl AnonTokenProvider {
    pub fn new(server: &ServerSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(server.request_timeout_secs))
            .build()
            .map_err(|e| InsightError::network(e.to_string()))?;

        Ok(Self {
            client,
            config_url: format!(
                "{}/api/v1/ui/config",
                server.api_base_url.trim_end_matches('/')
            ),
            configured: server.bearer_token.clone(),
            cooldown: Duration::from_secs(server.auth_failure_cooldown_secs),
            state: Mutex::new(TokenState::default()),
            requests: AtomicU32::new(0),
        })
    }

    /// Number of token requests sent so far
    pub fn requests_sent(&self) -> u32 {
        self.requests.load(Ordering::Relaxed)
    }

    async fn fetch(&self) -> Result<Option<String>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let response = self
            .client
            .get(&self.config_url)
            .send()
            .await
            .map_err(|e| InsightError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InsightError::NetworkFailure {
                status: Some(status.as_u16()),
                message: format!("UI config request failed ({})", status),
            });
        }

        let config = response
            .json::<UiConfig>()
            .await
            .map_err(|e| InsightError::MalformedMessage(e.to_string()))?;
        Ok(config.anon_jwt.filter(|jwt| !jwt.is_empty()))
    }
}

#[async_trait]
impl TokenSource for AnonTokenProvider {
    async fn token(&self) -> Option<String> {
        if let Some(token) = &self.configured {
            return Some(token.clone());
        }

        let mut state = self.state.lock().await;
        if let Some(jwt) = &state.jwt {
            return Some(jwt.clone());
        }
        if let Some(failed_at) = state.last_failure {
            if failed_at.elapsed() < self.cooldown {
                debug!("Anonymous token in cooldown, continuing unauthenticated");
                return None;
            }
        }

        match self.fetch().await {
            Ok(jwt) => {
                state.jwt = jwt.clone();
                jwt
            }
            Err(e) => {
                warn!("Anonymous token unavailable: {}", e);
                state.last_failure = Some(Instant::now());
                None
            }
        }
    }
}
