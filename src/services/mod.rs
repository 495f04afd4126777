//! Services layer for OGS Insight
//!
//! Remote collaborators of the ingestion pipeline: the paginated game
//! directory (HTTP), the AI review channel (WebSocket), anonymous token
//! acquisition, and caching decorators around both sources.

pub mod auth;
pub mod cached;
pub mod directory;
pub mod normalize;
pub mod retry;
pub mod review_stream;

pub use auth::{AnonTokenProvider, TokenSource};
pub use cached::{CachedDirectory, CachedReviewSource};
pub use directory::OgsHttpDirectory;
pub use retry::{Delay, RetryPolicy, TokioDelay};
pub use review_stream::AiReviewSocket;

use crate::error::Result;
use crate::types::{GameId, GameRecord, GamesPage, PageQuery, PlayerId, ReviewMetadata, ReviewSummary};
use async_trait::async_trait;

/// Paginated directory of finished games
#[async_trait]
pub trait GameDirectory: Send + Sync {
    /// One page of a player's finished games, newest first
    async fn fetch_games_page(
        &self,
        player: PlayerId,
        page: u32,
        query: &PageQuery,
    ) -> Result<GamesPage>;

    /// AI reviews listed for a game, oldest first
    async fn fetch_review_list(&self, game: GameId) -> Result<Vec<ReviewSummary>>;

    /// A single game record
    async fn fetch_game(&self, game: GameId) -> Result<GameRecord>;
}

/// Source of review evaluation data
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Review metadata for `game`, bounded by the source's own timeout
    async fn fetch_review(&self, game: GameId, review: &ReviewSummary) -> Result<ReviewMetadata>;
}
