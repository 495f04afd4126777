//! End-to-end move-quality scenarios: review data in, finalized statistics out

mod common;

use common::{game, review_with_losses, ME};
use ogs_insight_core::analysis::{
    aggregate, annotations, build_report, loss_series, move_quality, position_metrics, Phase,
    GameAnalysis, SCORE_BUCKETS,
};
use ogs_insight_core::types::{GameId, GameResult, Side};
use std::collections::HashMap;

#[test]
fn test_loss_series_with_baseline() {
    let series = vec![Some(0.0), Some(1.0), Some(3.0), Some(2.0)];
    assert_eq!(
        loss_series(&series, 3),
        vec![Some(1.0), Some(2.0), Some(1.0)]
    );
}

#[test]
fn test_black_player_five_moves() {
    let record = game(1, 19, true, Some(false));
    let analysis = GameAnalysis::from_review(
        GameId(1),
        review_with_losses(&[0.2, 1.0, 2.0, 6.5, 0.1], Side::Black),
    );

    let report = build_report(&record, Some(&analysis), ME).unwrap();
    assert_eq!(report.player_side, Side::Black);
    assert_eq!(report.result, GameResult::Win);

    // Black moves 1, 3, 5 with losses 0.2, 2.0, 0.1
    let total = &report.phases.total;
    assert_eq!(total.moves, 3);
    assert_eq!(total.accuracy, 66.7);
    assert_eq!(total.avg_score_loss, 0.77);
    assert_eq!(report.phases.opening, report.phases.total);
    assert_eq!(report.phases.middle.moves, 0);
    assert_eq!(report.phases.end.moves, 0);
    assert_eq!(total.score_buckets.counts(), &[2, 0, 1, 0, 0]);
}

#[test]
fn test_aggregate_over_both_sides_and_phases() {
    let games = vec![
        game(1, 19, true, Some(false)),
        game(2, 19, false, Some(true)),
        game(3, 19, true, None),
    ];
    let mut analyses = HashMap::new();
    analyses.insert(
        GameId(1),
        GameAnalysis::from_review(GameId(1), review_with_losses(&vec![0.25; 160], Side::Black)),
    );
    analyses.insert(
        GameId(2),
        GameAnalysis::from_review(GameId(2), review_with_losses(&vec![1.0; 70], Side::Black)),
    );
    analyses.insert(
        GameId(3),
        GameAnalysis::from_review(GameId(3), review_with_losses(&[8.0, 8.0], Side::White)),
    );

    let result = aggregate(&games, &analyses, ME);
    let combined = &result.combined;

    assert_eq!(combined.games, 3);
    assert_eq!((combined.wins, combined.losses), (1, 1));
    assert_eq!(result.black.games, 2);
    assert_eq!(result.white.games, 1);

    // Game 1: 80 black moves (30 opening, 45 middle, 5 end)
    // Game 2: 35 white moves (30 opening, 5 middle)
    // Game 3: white moved first, so black only has move 2
    let phases = &combined.phases;
    assert_eq!(phases.total.moves, 80 + 35 + 1);
    assert_eq!(phases.opening.moves, 30 + 30 + 1);
    assert_eq!(phases.middle.moves, 45 + 5);
    assert_eq!(phases.end.moves, 5);
    assert_eq!(
        phases.opening.moves + phases.middle.moves + phases.end.moves,
        phases.total.moves
    );
    assert_eq!(result.white.phases.total.accuracy, 0.0);
    // 80 accurate black moves out of 81
    assert_eq!(result.black.phases.total.moves, 81);
    assert_eq!(result.black.phases.total.accuracy, 98.8);
}

#[test]
fn test_viewer_helpers_share_one_analysis() {
    let analysis = GameAnalysis::from_review(
        GameId(9),
        review_with_losses(&[0.25, 4.0, 0.75], Side::Black),
    );

    let quality = move_quality(&analysis);
    assert_eq!(quality.all.black.total(), 2);
    assert_eq!(quality.all.white.total(), 1);
    assert_eq!(quality.phase(Phase::Opening), &quality.all);

    let marks = annotations(&analysis);
    assert_eq!(marks.len(), 3);
    assert_eq!(marks[1].label, SCORE_BUCKETS.classify(4.0).label);
    assert_eq!((marks[0].x, marks[0].y), (1, 1));

    let start = position_metrics(&analysis, 0);
    assert_eq!(start.score, Some(0.0));
    assert_eq!(start.win_rate, Some(0.5));
    let after_two = position_metrics(&analysis, 2);
    assert_eq!(after_two.score, Some(-3.75));
}
