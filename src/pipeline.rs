//! Sequential, throttled ingestion of a player's reviewed games
//!
//! One request in flight at a time. The loop walks the directory page by
//! page, skips boards of the wrong size without a request, picks the latest
//! AI review for each remaining game, and commits every analyzed game into
//! the session until the target count is reached or the directory runs dry.
//!
//! Per-game failures are recorded and the loop moves on; a directory failure
//! ends the run but keeps what was already committed.

use crate::analysis::GameAnalysis;
use crate::cache::session_cache;
use crate::config::{IngestionSettings, InsightConfig};
use crate::error::{InsightError, Result};
use crate::services::{
    AiReviewSocket, AnonTokenProvider, CachedDirectory, CachedReviewSource, Delay, GameDirectory,
    OgsHttpDirectory, ReviewSource, TokioDelay,
};
use crate::session::{GameFilter, LoadStatus, LoadTicket, SessionHandle};
use crate::types::{GameId, GameRecord, PageQuery, PlayerId};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Capacity of the progress channel
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    BoardSize,
    NoReview,
}

/// Incremental progress of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    PageLoaded {
        page: u32,
        games: usize,
        has_next: bool,
    },
    GameSkipped {
        game_id: GameId,
        reason: SkipReason,
    },
    /// Review list unavailable; the game is passed over after a backoff
    ReviewListThrottled {
        game_id: GameId,
        message: String,
    },
    GameAnalyzed {
        game_id: GameId,
        analyzed: u32,
        target: u32,
    },
    GameFailed {
        game_id: GameId,
        message: String,
    },
    Finished {
        status: RunStatus,
        analyzed: u32,
    },
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Exhausted,
    Failed(String),
    /// A newer load started; this run's remaining results were discarded
    Superseded,
}

impl RunStatus {
    fn to_load_status(&self) -> Option<LoadStatus> {
        match self {
            RunStatus::Completed => Some(LoadStatus::Completed),
            RunStatus::Exhausted => Some(LoadStatus::Exhausted),
            RunStatus::Failed(message) => Some(LoadStatus::Failed(message.clone())),
            RunStatus::Superseded => None,
        }
    }
}

/// Next progress event, or `None` once the pipeline is gone
///
/// A subscriber that falls behind skips the dropped events and keeps
/// listening.
pub async fn next_progress(events: &mut broadcast::Receiver<ProgressEvent>) -> Option<ProgressEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Progress subscriber lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub analyzed: u32,
    pub pages: u32,
}

/// A game loaded on demand together with its analysis
#[derive(Debug, Clone)]
pub struct SingleGame {
    pub game: GameRecord,
    pub analysis: GameAnalysis,
}

pub struct IngestionPipeline {
    directory: Arc<dyn GameDirectory>,
    reviews: Arc<dyn ReviewSource>,
    delay: Arc<dyn Delay>,
    settings: IngestionSettings,
    events: broadcast::Sender<ProgressEvent>,
}

impl IngestionPipeline {
    pub fn new(
        directory: Arc<dyn GameDirectory>,
        reviews: Arc<dyn ReviewSource>,
        settings: IngestionSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            directory,
            reviews,
            delay: Arc::new(TokioDelay),
            settings,
            events,
        }
    }

    /// Wire the HTTP directory and review channel behind a shared session cache
    pub fn from_config(config: &InsightConfig) -> Result<Self> {
        let cache = session_cache(&config.cache);

        let directory = OgsHttpDirectory::new(&config.server, &config.retry)?;
        let tokens = AnonTokenProvider::new(&config.server)?;
        let socket = AiReviewSocket::new(
            config.server.review_socket_url.clone(),
            config.review_stream.clone(),
            Arc::new(tokens),
        );

        Ok(Self::new(
            Arc::new(CachedDirectory::new(directory, cache.clone())),
            Arc::new(CachedReviewSource::new(socket, cache)),
            config.ingestion.clone(),
        ))
    }

    /// Replace the throttle clock
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn settings(&self) -> &IngestionSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ProgressEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Start a fresh load for `player` and run it to a terminal status
    pub async fn load_profile(
        &self,
        session: &SessionHandle,
        player: PlayerId,
        filter: GameFilter,
    ) -> RunOutcome {
        info!("Loading profile for player {}", player);
        let ticket = session.begin_load(player).await;
        self.run(session, &ticket, filter).await
    }

    /// Drive one load identified by `ticket`
    pub async fn run(
        &self,
        session: &SessionHandle,
        ticket: &LoadTicket,
        filter: GameFilter,
    ) -> RunOutcome {
        let mut outcome = RunOutcome {
            status: RunStatus::Completed,
            analyzed: 0,
            pages: 0,
        };
        let status = self.ingest(session, ticket, filter, &mut outcome).await;
        outcome.status = status;

        if let Some(load_status) = outcome.status.to_load_status() {
            if !session.finish(ticket, load_status).await {
                outcome.status = RunStatus::Superseded;
            }
        }

        info!(
            "Ingestion for player {} finished: {:?} ({} analyzed, {} pages)",
            ticket.player(),
            outcome.status,
            outcome.analyzed,
            outcome.pages
        );
        self.emit(ProgressEvent::Finished {
            status: outcome.status.clone(),
            analyzed: outcome.analyzed,
        });
        outcome
    }

    async fn ingest(
        &self,
        session: &SessionHandle,
        ticket: &LoadTicket,
        filter: GameFilter,
        outcome: &mut RunOutcome,
    ) -> RunStatus {
        let player = ticket.player();
        let target = self.settings.target_games;
        let query = PageQuery {
            page_size: self.settings.page_size,
            ranked: filter.ranked_query(),
        };
        let mut page = 1;

        loop {
            if outcome.analyzed >= target {
                return RunStatus::Completed;
            }
            if !session.is_current(ticket) {
                return RunStatus::Superseded;
            }

            let games_page = match self.directory.fetch_games_page(player, page, &query).await {
                Ok(games_page) => games_page,
                Err(e) => {
                    error!("Directory page {} for player {} failed: {}", page, player, e);
                    return RunStatus::Failed(format!("Failed to load games: {}", e));
                }
            };
            outcome.pages += 1;
            self.emit(ProgressEvent::PageLoaded {
                page,
                games: games_page.results.len(),
                has_next: games_page.has_next,
            });

            for game in games_page.results {
                if outcome.analyzed >= target {
                    break;
                }
                if !session.is_current(ticket) {
                    return RunStatus::Superseded;
                }
                if !game.is_board(self.settings.board_size) {
                    self.emit(ProgressEvent::GameSkipped {
                        game_id: game.id,
                        reason: SkipReason::BoardSize,
                    });
                    continue;
                }

                if !self.ingest_game(session, ticket, game, outcome).await {
                    return RunStatus::Superseded;
                }
            }

            if !games_page.has_next {
                return if outcome.analyzed >= target {
                    RunStatus::Completed
                } else {
                    RunStatus::Exhausted
                };
            }
            page += 1;
        }
    }

    /// Fetch, analyze and commit one game; `false` once the load is stale
    async fn ingest_game(
        &self,
        session: &SessionHandle,
        ticket: &LoadTicket,
        game: GameRecord,
        outcome: &mut RunOutcome,
    ) -> bool {
        let game_id = game.id;

        let reviews = match self.directory.fetch_review_list(game_id).await {
            Ok(reviews) => reviews,
            Err(e) => {
                warn!("Review list for game {} unavailable: {}", game_id, e);
                self.emit(ProgressEvent::ReviewListThrottled {
                    game_id,
                    message: e.to_string(),
                });
                self.delay.wait(self.settings.review_list_backoff()).await;
                return true;
            }
        };
        let Some(latest) = reviews.last() else {
            debug!("Game {} has no AI review", game_id);
            self.emit(ProgressEvent::GameSkipped {
                game_id,
                reason: SkipReason::NoReview,
            });
            return true;
        };

        match self.reviews.fetch_review(game_id, latest).await {
            Ok(review) => {
                let analysis = GameAnalysis::from_review(game_id, review);
                if !session.commit_game(ticket, game, analysis).await {
                    return false;
                }
                outcome.analyzed += 1;
                debug!(
                    "Analyzed game {} ({}/{})",
                    game_id, outcome.analyzed, self.settings.target_games
                );
                self.emit(ProgressEvent::GameAnalyzed {
                    game_id,
                    analyzed: outcome.analyzed,
                    target: self.settings.target_games,
                });
                self.delay.wait(self.settings.throttle()).await;
            }
            Err(InsightError::NoReviewAvailable(_)) => {
                self.emit(ProgressEvent::GameSkipped {
                    game_id,
                    reason: SkipReason::NoReview,
                });
            }
            Err(e) => {
                warn!("Review for game {} failed: {}", game_id, e);
                let message = e.to_string();
                if !session.record_error(ticket, game_id, message.clone()).await {
                    return false;
                }
                self.emit(ProgressEvent::GameFailed { game_id, message });
                self.delay.wait(self.settings.review_error_delay()).await;
            }
        }
        true
    }

    /// Load one game and its latest review outside of a profile run
    pub async fn analyze_single_game(&self, game_id: GameId) -> Result<SingleGame> {
        let game = self.directory.fetch_game(game_id).await?;
        let reviews = self.directory.fetch_review_list(game_id).await?;
        let latest = reviews
            .last()
            .ok_or(InsightError::NoReviewAvailable(game_id))?;
        let review = self.reviews.fetch_review(game_id, latest).await?;

        Ok(SingleGame {
            game,
            analysis: GameAnalysis::from_review(game_id, review),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoardMove, GamesPage, PlayerRef, ReviewMetadata, ReviewSummary, Side};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const ME: PlayerId = PlayerId(7);

    fn game(id: u64, size: u32) -> GameRecord {
        GameRecord {
            id: GameId(id),
            width: size,
            height: size,
            black: PlayerRef {
                id: Some(ME),
                ..Default::default()
            },
            white: PlayerRef {
                id: Some(PlayerId(8)),
                ..Default::default()
            },
            ranked: true,
            ended: None,
            outcome: String::new(),
            black_lost: Some(false),
            white_lost: Some(true),
        }
    }

    #[derive(Default)]
    struct FakeDirectory {
        pages: Vec<GamesPage>,
        reviewed: Vec<u64>,
        list_calls: Mutex<Vec<GameId>>,
    }

    #[async_trait]
    impl GameDirectory for FakeDirectory {
        async fn fetch_games_page(&self, _p: PlayerId, page: u32, _q: &PageQuery) -> Result<GamesPage> {
            self.pages
                .get(page as usize - 1)
                .cloned()
                .ok_or_else(|| InsightError::network("no such page"))
        }

        async fn fetch_review_list(&self, game: GameId) -> Result<Vec<ReviewSummary>> {
            self.list_calls.lock().unwrap().push(game);
            if self.reviewed.contains(&game.0) {
                Ok(vec![ReviewSummary {
                    id: game.0,
                    uuid: format!("uuid-{}", game.0),
                }])
            } else {
                Ok(Vec::new())
            }
        }

        async fn fetch_game(&self, game: GameId) -> Result<GameRecord> {
            Ok(game_record(game.0))
        }
    }

    fn game_record(id: u64) -> GameRecord {
        game(id, 19)
    }

    struct FakeReviews;

    #[async_trait]
    impl ReviewSource for FakeReviews {
        async fn fetch_review(&self, _game: GameId, _review: &ReviewSummary) -> Result<ReviewMetadata> {
            Ok(ReviewMetadata {
                moves: vec![BoardMove::Play { x: 3, y: 3 }],
                scores: vec![Some(0.0), Some(0.3)],
                win_rates: vec![Some(0.5), Some(0.49)],
                initial_player: Side::Black,
                width: 19,
                height: 19,
            })
        }
    }

    #[derive(Default)]
    struct NoDelay {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Delay for NoDelay {
        async fn wait(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    fn pipeline(directory: FakeDirectory, target: u32) -> (IngestionPipeline, Arc<NoDelay>) {
        let delay = Arc::new(NoDelay::default());
        let settings = IngestionSettings {
            target_games: target,
            ..Default::default()
        };
        let pipeline = IngestionPipeline::new(Arc::new(directory), Arc::new(FakeReviews), settings)
            .with_delay(delay.clone());
        (pipeline, delay)
    }

    #[tokio::test]
    async fn test_stops_at_target() {
        let directory = FakeDirectory {
            pages: vec![GamesPage {
                results: (1..=5).map(|id| game(id, 19)).collect(),
                has_next: true,
            }],
            reviewed: vec![1, 2, 3, 4, 5],
            ..Default::default()
        };
        let (pipeline, delay) = pipeline(directory, 2);
        let session = SessionHandle::new();

        let outcome = pipeline.load_profile(&session, ME, GameFilter::default()).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.analyzed, 2);
        assert_eq!(session.snapshot().await.games.len(), 2);
        assert_eq!(*delay.waits.lock().unwrap(), vec![Duration::from_millis(600); 2]);
    }

    #[tokio::test]
    async fn test_wrong_board_size_makes_no_request() {
        let directory = FakeDirectory {
            pages: vec![GamesPage {
                results: vec![game(1, 9), game(2, 13), game(3, 19)],
                has_next: false,
            }],
            reviewed: vec![1, 2, 3],
            ..Default::default()
        };
        let (pipeline, _delay) = pipeline(directory, 50);
        let mut events = pipeline.subscribe();
        let session = SessionHandle::new();

        let outcome = pipeline.load_profile(&session, ME, GameFilter::default()).await;

        assert_eq!(outcome.status, RunStatus::Exhausted);
        assert_eq!(outcome.analyzed, 1);
        let mut skipped = HashMap::new();
        while let Ok(event) = events.try_recv() {
            if let ProgressEvent::GameSkipped { game_id, reason } = event {
                skipped.insert(game_id, reason);
            }
        }
        assert_eq!(skipped.get(&GameId(1)), Some(&SkipReason::BoardSize));
        assert_eq!(skipped.get(&GameId(2)), Some(&SkipReason::BoardSize));
        assert_eq!(session.snapshot().await.status, LoadStatus::Exhausted);
    }

    #[tokio::test]
    async fn test_single_game_without_review() {
        let directory = FakeDirectory::default();
        let (pipeline, _delay) = pipeline(directory, 50);
        let result = pipeline.analyze_single_game(GameId(4)).await;
        assert!(matches!(result, Err(InsightError::NoReviewAvailable(GameId(4)))));
    }

    #[tokio::test]
    async fn test_single_game_with_review() {
        let directory = FakeDirectory {
            reviewed: vec![4],
            ..Default::default()
        };
        let (pipeline, _delay) = pipeline(directory, 50);
        let single = pipeline.analyze_single_game(GameId(4)).await.unwrap();
        assert_eq!(single.game.id, GameId(4));
        assert_eq!(single.analysis.score_loss(1), Some(0.3));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_receiving() {
        let (sender, mut events) = broadcast::channel(2);
        for game in 1..=5 {
            sender
                .send(ProgressEvent::GameFailed {
                    game_id: GameId(game),
                    message: "timeout".to_string(),
                })
                .unwrap();
        }

        let first = next_progress(&mut events).await;
        assert!(matches!(
            first,
            Some(ProgressEvent::GameFailed { game_id: GameId(4), .. })
        ));
        assert!(next_progress(&mut events).await.is_some());

        drop(sender);
        assert!(next_progress(&mut events).await.is_none());
    }
}
