//! Move-quality analysis
//!
//! Turns review time series into per-move losses, classifies moves into
//! quality buckets, and folds them into phase-segmented statistics:
//!
//! ```text
//! ReviewMetadata ─▶ series::loss_series ─▶ GameAnalysis
//!                                              │
//!        phase + buckets + accumulator ◀── report::build_report
//!                                              │
//!                               aggregate::aggregate ─▶ AggregateResult
//! ```

pub mod accumulator;
pub mod aggregate;
pub mod buckets;
pub mod phase;
pub mod quality;
pub mod report;
pub mod series;

pub use accumulator::{MistakeCounts, PhaseAccumulator, PhaseStats};
pub use aggregate::{aggregate, AggregateResult, SideAggregate};
pub use buckets::{Bucket, BucketCatalog, Histogram, SCORE_BUCKETS, WINRATE_BUCKETS};
pub use phase::{side_of_move, Phase, PhaseSet};
pub use quality::{annotations, move_quality, position_metrics, MoveAnnotation, MoveQuality};
pub use report::{build_report, GameReport};
pub use series::loss_series;

use crate::types::{GameId, ReviewMetadata};
use serde::{Deserialize, Serialize};

/// A game's review together with its derived loss series
///
/// Computed once when the review is fetched and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameAnalysis {
    pub game_id: GameId,
    pub review: ReviewMetadata,
    /// Score loss per move, index 0 = move 1
    pub score_losses: Vec<Option<f64>>,
    /// Win-rate loss (fraction) per move
    pub winrate_losses: Vec<Option<f64>>,
}

impl GameAnalysis {
    pub fn from_review(game_id: GameId, review: ReviewMetadata) -> Self {
        let move_count = review.moves.len();
        Self {
            game_id,
            score_losses: loss_series(&review.scores, move_count),
            winrate_losses: loss_series(&review.win_rates, move_count),
            review,
        }
    }

    pub fn move_count(&self) -> usize {
        self.review.moves.len()
    }

    /// Score loss of 1-based `move_number`
    pub fn score_loss(&self, move_number: usize) -> Option<f64> {
        move_number
            .checked_sub(1)
            .and_then(|i| self.score_losses.get(i).copied().flatten())
    }

    pub fn winrate_loss(&self, move_number: usize) -> Option<f64> {
        move_number
            .checked_sub(1)
            .and_then(|i| self.winrate_losses.get(i).copied().flatten())
    }
}
