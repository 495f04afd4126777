//! OGS Insight - Move-Quality Analysis for online-go.com Players
//!
//! Walks a player's finished games on online-go.com, pulls the AI review for
//! each one, and reports how closely the player's moves matched the engine:
//! - Accuracy, average score and win-rate loss per phase and side
//! - Cumulative mistake / severe / blunder counts
//! - Bucketed move-quality histograms and board annotations
//!
//! # Architecture
//!
//! - **Types**: Canonical game and review records
//! - **Analysis**: Loss series, bucket classification, phase accumulation
//! - **Services**: Game directory (HTTP), review channel (WebSocket), caching
//! - **Pipeline**: Sequential, throttled ingestion into a profile session
//!
//! # Example
//!
//! ```ignore
//! use ogs_insight_core::{GameFilter, IngestionPipeline, InsightConfig, PlayerId, SessionHandle};
//!
//! #[tokio::main]
//! async fn main() -> ogs_insight_core::Result<()> {
//!     let config = InsightConfig::load(&InsightConfig::default_path())?;
//!     let pipeline = IngestionPipeline::from_config(&config)?;
//!     let session = SessionHandle::new();
//!
//!     let outcome = pipeline
//!         .load_profile(&session, PlayerId(1526), GameFilter::default())
//!         .await;
//!     let summary = session.read(|s| s.summary(GameFilter::default())).await;
//!     println!("{:?} {:?}", outcome.status, summary.map(|s| s.accuracy));
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod services;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use analysis::{
    aggregate, build_report, AggregateResult, GameAnalysis, GameReport, PhaseStats, SideAggregate,
};
pub use cache::{MemoryCache, SessionCache};
pub use config::InsightConfig;
pub use error::{InsightError, Result};
pub use pipeline::{
    next_progress, IngestionPipeline, ProgressEvent, RunOutcome, RunStatus, SingleGame,
};
pub use services::{GameDirectory, ReviewSource};
pub use session::{GameFilter, LoadStatus, PlayerProfile, ProfileSummary, SessionHandle};
pub use types::{GameId, GameRecord, PlayerId, ReviewMetadata, Side};
pub use utils::format::{format_rank, parse_player_id};
