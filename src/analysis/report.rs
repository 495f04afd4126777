//! Per-game, per-player move-quality report

use super::accumulator::{PhaseAccumulator, PhaseStats};
use super::phase::{side_of_move, Phase, PhaseSet};
use super::GameAnalysis;
use crate::types::{GameId, GameRecord, GameResult, PlayerId, Side};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReport {
    pub game_id: GameId,
    pub label: String,
    pub result: GameResult,
    pub player_side: Side,
    pub ranked: bool,
    /// Finalized statistics for display
    pub phases: PhaseSet<PhaseStats>,
    /// Raw counters kept for re-aggregation across games
    pub raw_phases: PhaseSet<PhaseAccumulator>,
}

/// Build the report for `player` in one game
///
/// Returns `None` when the player did not play the game or no analysis is
/// available. Each counted move updates exactly two accumulators: the total
/// and its own phase.
pub fn build_report(
    game: &GameRecord,
    analysis: Option<&GameAnalysis>,
    player: PlayerId,
) -> Option<GameReport> {
    let player_side = game.side_of(player)?;
    let analysis = analysis?;

    let mut raw_phases: PhaseSet<PhaseAccumulator> = PhaseSet::default();
    let initial_side = analysis.review.initial_player;

    for move_number in 1..=analysis.move_count() {
        let Some(score_loss) = analysis.score_loss(move_number) else {
            continue;
        };
        if side_of_move(move_number, initial_side) != player_side {
            continue;
        }
        let winrate_loss = analysis.winrate_loss(move_number);
        raw_phases.total.record(score_loss, winrate_loss);
        raw_phases
            .phase_mut(Phase::of_move(move_number))
            .record(score_loss, winrate_loss);
    }

    Some(GameReport {
        game_id: game.id,
        label: game.label(),
        result: game.result_for(player),
        player_side,
        ranked: game.ranked,
        phases: raw_phases.map(PhaseAccumulator::finalize),
        raw_phases,
    })
}
