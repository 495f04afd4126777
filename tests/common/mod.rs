//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use ogs_insight_core::error::{InsightError, Result};
use ogs_insight_core::services::{Delay, ReviewSource};
use ogs_insight_core::types::{
    BoardMove, GameId, GameRecord, PlayerId, PlayerRef, ReviewMetadata, ReviewSummary, Side,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub const ME: PlayerId = PlayerId(1001);
pub const OPPONENT: PlayerId = PlayerId(2002);

/// A finished game between `ME` and `OPPONENT`
pub fn game(id: u64, size: u32, me_black: bool, i_lost: Option<bool>) -> GameRecord {
    let me = PlayerRef {
        id: Some(ME),
        username: Some("tester".to_string()),
        ranking: Some(27.0),
        icon: None,
    };
    let other = PlayerRef {
        id: Some(OPPONENT),
        username: Some("rival".to_string()),
        ranking: Some(28.0),
        icon: None,
    };
    let (black, white) = if me_black { (me, other) } else { (other, me) };
    let (black_lost, white_lost) = match i_lost {
        None => (None, None),
        Some(lost) if me_black => (Some(lost), Some(!lost)),
        Some(lost) => (Some(!lost), Some(lost)),
    };
    GameRecord {
        id: GameId(id),
        width: size,
        height: size,
        black,
        white,
        ranked: id % 2 == 0,
        ended: None,
        outcome: "Resignation".to_string(),
        black_lost,
        white_lost,
    }
}

/// Review whose score series yields exactly `losses`, baseline included
pub fn review_with_losses(losses: &[f64], initial: Side) -> ReviewMetadata {
    let mut scores = vec![Some(0.0)];
    let mut win_rates = vec![Some(0.5)];
    let mut score = 0.0;
    let mut win_rate = 0.5;
    for (i, loss) in losses.iter().enumerate() {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        score += sign * loss;
        win_rate += sign * loss / 100.0;
        scores.push(Some(score));
        win_rates.push(Some(win_rate));
    }
    ReviewMetadata {
        moves: (0..losses.len() as u32)
            .map(|i| BoardMove::Play { x: i % 19, y: i / 19 })
            .collect(),
        scores,
        win_rates,
        initial_player: initial,
        width: 19,
        height: 19,
    }
}

pub fn summary(game: u64) -> ReviewSummary {
    ReviewSummary {
        id: game * 10,
        uuid: format!("review-{}", game),
    }
}

/// Delay that records requested waits and returns immediately
#[derive(Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Review source answering from fixed data; listed games time out
#[derive(Default)]
pub struct ScriptedReviews {
    reviews: HashMap<GameId, ReviewMetadata>,
    timeouts: HashSet<GameId>,
    requested: Mutex<Vec<GameId>>,
}

impl ScriptedReviews {
    pub fn with_review(mut self, game: u64, review: ReviewMetadata) -> Self {
        self.reviews.insert(GameId(game), review);
        self
    }

    pub fn with_timeout(mut self, game: u64) -> Self {
        self.timeouts.insert(GameId(game));
        self
    }

    pub fn requested(&self) -> Vec<GameId> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewSource for ScriptedReviews {
    async fn fetch_review(&self, game: GameId, _review: &ReviewSummary) -> Result<ReviewMetadata> {
        self.requested.lock().unwrap().push(game);
        if self.timeouts.contains(&game) {
            return Err(InsightError::Timeout(Duration::from_secs(15)));
        }
        self.reviews
            .get(&game)
            .cloned()
            .ok_or(InsightError::NoReviewAvailable(game))
    }
}
