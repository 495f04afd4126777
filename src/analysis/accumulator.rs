//! Running move-quality counters for one (player, phase) slice
//!
//! Accumulators stay raw while games are being folded together and are
//! finalized once at the end, so rounding happens exactly once.

use super::buckets::{Histogram, SCORE_BUCKETS, WINRATE_BUCKETS};
use serde::{Deserialize, Serialize};

/// A move whose score loss is at or below this counts as accurate
pub const ACCURACY_THRESHOLD: f64 = 0.5;
/// Win-rate loss that counts as a mistake
pub const MISTAKE_THRESHOLD: f64 = 0.10;
/// Win-rate loss that counts as a severe mistake
pub const SEVERE_THRESHOLD: f64 = 0.20;
/// Win-rate loss that counts as a blunder
pub const BLUNDER_THRESHOLD: f64 = 0.40;

/// Cumulative mistake tallies: a blunder is also severe and also a mistake
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeCounts {
    pub total: u32,
    pub severe: u32,
    pub blunder: u32,
}

impl MistakeCounts {
    fn merge(&mut self, other: &MistakeCounts) {
        self.total += other.total;
        self.severe += other.severe;
        self.blunder += other.blunder;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseAccumulator {
    pub moves: u32,
    pub accurate_moves: u32,
    pub score_loss_sum: f64,
    /// Sum of win-rate losses as fractions (0.0-1.0)
    pub win_loss_sum: f64,
    pub mistakes: MistakeCounts,
    pub score_buckets: Histogram,
    pub winrate_buckets: Histogram,
}

impl Default for PhaseAccumulator {
    fn default() -> Self {
        Self {
            moves: 0,
            accurate_moves: 0,
            score_loss_sum: 0.0,
            win_loss_sum: 0.0,
            mistakes: MistakeCounts::default(),
            score_buckets: Histogram::for_catalog(&SCORE_BUCKETS),
            winrate_buckets: Histogram::for_catalog(&WINRATE_BUCKETS),
        }
    }
}

impl PhaseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one move with a known score loss
    ///
    /// The win-rate loss may be unknown for the same move; it then only
    /// affects the move count and score-based counters.
    pub fn record(&mut self, score_loss: f64, winrate_loss: Option<f64>) {
        self.moves += 1;
        if score_loss <= ACCURACY_THRESHOLD {
            self.accurate_moves += 1;
        }
        self.score_loss_sum += score_loss;
        self.score_buckets
            .increment(SCORE_BUCKETS.classify_index(score_loss));

        if let Some(loss) = winrate_loss {
            self.win_loss_sum += loss;
            self.winrate_buckets
                .increment(WINRATE_BUCKETS.classify_index(loss * 100.0));
            if loss >= MISTAKE_THRESHOLD {
                self.mistakes.total += 1;
            }
            if loss >= SEVERE_THRESHOLD {
                self.mistakes.severe += 1;
            }
            if loss >= BLUNDER_THRESHOLD {
                self.mistakes.blunder += 1;
            }
        }
    }

    /// Add another accumulator's raw counters field by field
    pub fn merge(&mut self, other: &PhaseAccumulator) {
        self.moves += other.moves;
        self.accurate_moves += other.accurate_moves;
        self.score_loss_sum += other.score_loss_sum;
        self.win_loss_sum += other.win_loss_sum;
        self.mistakes.merge(&other.mistakes);
        self.score_buckets.merge(&other.score_buckets);
        self.winrate_buckets.merge(&other.winrate_buckets);
    }

    /// Snapshot as percentages and averages; the accumulator is untouched
    pub fn finalize(&self) -> PhaseStats {
        let (accuracy, avg_score_loss, avg_win_loss) = if self.moves == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let moves = f64::from(self.moves);
            (
                100.0 * f64::from(self.accurate_moves) / moves,
                self.score_loss_sum / moves,
                100.0 * self.win_loss_sum / moves,
            )
        };

        PhaseStats {
            moves: self.moves,
            accuracy: round_to(accuracy, 1),
            avg_score_loss: round_to(avg_score_loss, 2),
            avg_win_loss: round_to(avg_win_loss, 1),
            mistakes: self.mistakes,
            score_buckets: self.score_buckets.clone(),
            winrate_buckets: self.winrate_buckets.clone(),
        }
    }
}

/// Finalized statistics for one slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub moves: u32,
    /// Percentage of accurate moves
    pub accuracy: f64,
    /// Average score loss in points
    pub avg_score_loss: f64,
    /// Average win-rate loss in percentage points
    pub avg_win_loss: f64,
    pub mistakes: MistakeCounts,
    pub score_buckets: Histogram,
    pub winrate_buckets: Histogram,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
