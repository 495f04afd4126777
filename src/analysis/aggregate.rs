//! Fold many per-game reports into combined and per-side totals

use super::accumulator::{PhaseAccumulator, PhaseStats};
use super::phase::PhaseSet;
use super::report::{build_report, GameReport};
use super::GameAnalysis;
use crate::types::{GameId, GameRecord, GameResult, PlayerId, Side};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Finalized totals for one routing bucket (combined, black or white)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideAggregate {
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub phases: PhaseSet<PhaseStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub combined: SideAggregate,
    pub black: SideAggregate,
    pub white: SideAggregate,
    /// Reports that contributed, in input order
    pub reports: Vec<GameReport>,
}

#[derive(Debug, Default)]
struct RawAggregate {
    games: u32,
    wins: u32,
    losses: u32,
    phases: PhaseSet<PhaseAccumulator>,
}

impl RawAggregate {
    fn absorb(&mut self, report: &GameReport) {
        self.games += 1;
        match report.result {
            GameResult::Win => self.wins += 1,
            GameResult::Loss => self.losses += 1,
            GameResult::Unknown => {}
        }
        self.phases
            .zip_mut(&report.raw_phases, |acc, raw| acc.merge(raw));
    }

    fn finalize(&self) -> SideAggregate {
        SideAggregate {
            games: self.games,
            wins: self.wins,
            losses: self.losses,
            phases: self.phases.map(PhaseAccumulator::finalize),
        }
    }
}

/// Aggregate every game that yields a report for `player`
///
/// Raw counters are summed across reports and finalized once at the end.
/// The fold is commutative: input order changes only the order of `reports`.
pub fn aggregate<'a>(
    games: impl IntoIterator<Item = &'a GameRecord>,
    analyses: &HashMap<GameId, GameAnalysis>,
    player: PlayerId,
) -> AggregateResult {
    let mut combined = RawAggregate::default();
    let mut black = RawAggregate::default();
    let mut white = RawAggregate::default();
    let mut reports = Vec::new();

    for game in games {
        let Some(report) = build_report(game, analyses.get(&game.id), player) else {
            continue;
        };
        combined.absorb(&report);
        match report.player_side {
            Side::Black => black.absorb(&report),
            Side::White => white.absorb(&report),
        }
        reports.push(report);
    }

    AggregateResult {
        combined: combined.finalize(),
        black: black.finalize(),
        white: white.finalize(),
        reports,
    }
}
