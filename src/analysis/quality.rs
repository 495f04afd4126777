//! Viewer-facing data for a single game: bucket counts per phase and side,
//! board annotations, and the evaluation at a given move

use super::buckets::{Histogram, SCORE_BUCKETS};
use super::phase::{side_of_move, Phase};
use super::series::value_at_move;
use super::GameAnalysis;
use crate::types::{BoardMove, Side};
use serde::Serialize;

/// Score-bucket counts for both sides
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideHistograms {
    pub black: Histogram,
    pub white: Histogram,
}

impl SideHistograms {
    fn new() -> Self {
        Self {
            black: Histogram::for_catalog(&SCORE_BUCKETS),
            white: Histogram::for_catalog(&SCORE_BUCKETS),
        }
    }

    pub fn side(&self, side: Side) -> &Histogram {
        match side {
            Side::Black => &self.black,
            Side::White => &self.white,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut Histogram {
        match side {
            Side::Black => &mut self.black,
            Side::White => &mut self.white,
        }
    }
}

/// Move-quality distribution of a whole game, for both players
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveQuality {
    pub all: SideHistograms,
    pub opening: SideHistograms,
    pub middle: SideHistograms,
    pub end: SideHistograms,
}

impl MoveQuality {
    pub fn phase(&self, phase: Phase) -> &SideHistograms {
        match phase {
            Phase::Opening => &self.opening,
            Phase::Middle => &self.middle,
            Phase::End => &self.end,
        }
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut SideHistograms {
        match phase {
            Phase::Opening => &mut self.opening,
            Phase::Middle => &mut self.middle,
            Phase::End => &mut self.end,
        }
    }
}

pub fn move_quality(analysis: &GameAnalysis) -> MoveQuality {
    let mut quality = MoveQuality {
        all: SideHistograms::new(),
        opening: SideHistograms::new(),
        middle: SideHistograms::new(),
        end: SideHistograms::new(),
    };
    let initial = analysis.review.initial_player;

    for move_number in 1..=analysis.move_count() {
        let Some(loss) = analysis.score_loss(move_number) else {
            continue;
        };
        let side = side_of_move(move_number, initial);
        let bucket = SCORE_BUCKETS.classify_index(loss);
        quality.all.side_mut(side).increment(bucket);
        quality
            .phase_mut(Phase::of_move(move_number))
            .side_mut(side)
            .increment(bucket);
    }

    quality
}

/// Markup for the external board renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveAnnotation {
    pub move_number: usize,
    /// One-based board coordinates
    pub x: u32,
    pub y: u32,
    pub label: &'static str,
    pub color: Option<&'static str>,
    pub value: f64,
}

/// One annotation per placed stone with a known score loss; passes and
/// unreadable entries have no board position and are skipped
pub fn annotations(analysis: &GameAnalysis) -> Vec<MoveAnnotation> {
    analysis
        .review
        .moves
        .iter()
        .enumerate()
        .filter_map(|(index, mv)| {
            let move_number = index + 1;
            let BoardMove::Play { x, y } = *mv else {
                return None;
            };
            let loss = analysis.score_loss(move_number)?;
            let bucket = SCORE_BUCKETS.classify(loss);
            Some(MoveAnnotation {
                move_number,
                x: x + 1,
                y: y + 1,
                label: bucket.label,
                color: bucket.color,
                value: loss,
            })
        })
        .collect()
}

/// Score and win rate at a position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionMetrics {
    pub score: Option<f64>,
    /// Fraction, 0.0-1.0
    pub win_rate: Option<f64>,
}

/// Evaluation after `move_number` (0 = initial position when available)
pub fn position_metrics(analysis: &GameAnalysis, move_number: usize) -> PositionMetrics {
    let review = &analysis.review;
    let moves = review.moves.len();
    PositionMetrics {
        score: value_at_move(&review.scores, moves, move_number),
        win_rate: value_at_move(&review.win_rates, moves, move_number),
    }
}
