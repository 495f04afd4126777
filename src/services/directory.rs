//! HTTP client for the OGS game directory
//!
//! Read-only REST endpoints: a player's finished games (paginated), the AI
//! reviews listed for a game, and a single game record. Every request goes
//! through the shared retry schedule.

use super::normalize::{normalize_game, normalize_games_page, normalize_review_list};
use super::retry::{retry_request, Delay, RetryPolicy, TokioDelay};
use super::GameDirectory;
use crate::config::{RetrySettings, ServerSettings};
use crate::error::{InsightError, Result};
use crate::types::{GameId, GameRecord, GamesPage, PageQuery, PlayerId, ReviewSummary};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Build the directory URL for one page of a player's finished games
pub fn games_url(base_url: &str, player: PlayerId, page: u32, query: &PageQuery) -> Result<Url> {
    let mut url = endpoint(base_url, &format!("api/v1/players/{}/games/", player))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &query.page_size.to_string())
            .append_pair("source", "play")
            .append_pair("ended__isnull", "false")
            .append_pair("annulled", "false")
            .append_pair("ordering", "-ended");
        if let Some(ranked) = query.ranked {
            pairs.append_pair("ranked", if ranked { "true" } else { "false" });
        }
    }
    Ok(url)
}

pub fn review_list_url(base_url: &str, game: GameId) -> Result<Url> {
    endpoint(base_url, &format!("api/v1/games/{}/ai_reviews", game))
}

pub fn game_url(base_url: &str, game: GameId) -> Result<Url> {
    endpoint(base_url, &format!("api/v1/games/{}", game))
}

fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let joined = format!("{}/{}", base_url.trim_end_matches('/'), path);
    Url::parse(&joined)
        .map_err(|e| InsightError::Other(format!("Invalid API URL {}: {}", joined, e)))
}

/// Directory service backed by `reqwest`
pub struct OgsHttpDirectory {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
    policy: RetryPolicy,
    delay: Arc<dyn Delay>,
}

impl OgsHttpDirectory {
    pub fn new(server: &ServerSettings, retry: &RetrySettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(server.request_timeout_secs))
            .build()
            .map_err(|e| InsightError::network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: server.api_base_url.clone(),
            bearer_token: server.bearer_token.clone(),
            policy: RetryPolicy::from(retry),
            delay: Arc::new(TokioDelay),
        })
    }

    /// Replace the backoff clock
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    /// One GET, no retry
    async fn get_json(&self, url: &Url) -> Result<Value> {
        debug!("GET {}", url);

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.bearer_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| InsightError::network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(InsightError::RateLimited(format!("{} was throttled", url.path())));
        }
        if !status.is_success() {
            return Err(InsightError::NetworkFailure {
                status: Some(status.as_u16()),
                message: format!("Request failed ({})", status),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| InsightError::MalformedMessage(e.to_string()))
    }

    async fn get_with_retry(&self, url: &Url, what: &str) -> Result<Value> {
        retry_request(&self.policy, self.delay.as_ref(), what, || self.get_json(url)).await
    }
}

#[async_trait]
impl GameDirectory for OgsHttpDirectory {
    async fn fetch_games_page(
        &self,
        player: PlayerId,
        page: u32,
        query: &PageQuery,
    ) -> Result<GamesPage> {
        let url = games_url(&self.base_url, player, page, query)?;
        let body = self.get_with_retry(&url, "games page").await?;
        let page = normalize_games_page(&body)?;
        debug!(
            "Directory page for player {}: {} games, has_next={}",
            player,
            page.results.len(),
            page.has_next
        );
        Ok(page)
    }

    async fn fetch_review_list(&self, game: GameId) -> Result<Vec<ReviewSummary>> {
        let url = review_list_url(&self.base_url, game)?;
        let body = self.get_with_retry(&url, "review list").await?;
        Ok(normalize_review_list(&body))
    }

    async fn fetch_game(&self, game: GameId) -> Result<GameRecord> {
        let url = game_url(&self.base_url, game)?;
        let body = self.get_with_retry(&url, "game record").await?;
        normalize_game(&body)
    }
}
