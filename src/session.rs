//! Profile session state and its load lifecycle
//!
//! A [`SessionHandle`] owns everything one profile load produces: games in
//! directory order, their analyses, per-game errors and the final status.
//! Every load is identified by a [`LoadTicket`]; starting a new load bumps
//! the generation, and writes carrying an older ticket are dropped.

use crate::analysis::{aggregate, AggregateResult, GameAnalysis};
use crate::types::{GameId, GameRecord, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Which games take part in a load and in aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameFilter {
    pub include_ranked: bool,
    pub include_free: bool,
}

impl Default for GameFilter {
    fn default() -> Self {
        Self {
            include_ranked: true,
            include_free: true,
        }
    }
}

impl GameFilter {
    pub fn ranked_only() -> Self {
        Self {
            include_ranked: true,
            include_free: false,
        }
    }

    pub fn free_only() -> Self {
        Self {
            include_ranked: false,
            include_free: true,
        }
    }

    pub fn matches(&self, game: &GameRecord) -> bool {
        if game.ranked {
            self.include_ranked
        } else {
            self.include_free
        }
    }

    /// Directory `ranked` query: narrowed only when exactly one kind is wanted
    pub fn ranked_query(&self) -> Option<bool> {
        match (self.include_ranked, self.include_free) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }
}

/// Status of the session's most recent load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum LoadStatus {
    Idle,
    Loading,
    /// Target reached
    Completed,
    /// Directory ran out of games before the target
    Exhausted,
    /// Directory failure; results gathered before it are kept
    Failed(String),
}

/// Display identity of the profiled player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfile {
    pub player_id: PlayerId,
    pub name: String,
    pub rank: Option<String>,
    pub avatar: Option<String>,
}

impl PlayerProfile {
    /// Taken from the first game the player appears in
    pub fn derive(player: PlayerId, games: &[GameRecord]) -> Self {
        let found = games
            .iter()
            .find_map(|game| game.side_of(player).map(|side| game.player(side)));

        match found {
            Some(entry) => Self {
                player_id: player,
                name: entry.display_name().to_string(),
                rank: entry.rank(),
                avatar: entry.icon.clone(),
            },
            None => Self {
                player_id: player,
                name: format!("Player {}", player),
                rank: None,
                avatar: None,
            },
        }
    }
}

/// Headline numbers for a filtered set of games
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub total_games: usize,
    pub ranked_games: usize,
    pub free_games: usize,
    pub wins: u32,
    pub losses: u32,
    /// Overall accuracy percentage
    pub accuracy: f64,
    pub aggregate: AggregateResult,
}

/// Everything one profile load produced
#[derive(Debug, Clone)]
pub struct ProfileSession {
    pub player: Option<PlayerId>,
    /// Analyzed games in directory order
    pub games: Vec<GameRecord>,
    pub analyses: HashMap<GameId, GameAnalysis>,
    pub errors: BTreeMap<GameId, String>,
    pub status: LoadStatus,
    pub profile: Option<PlayerProfile>,
}

impl Default for ProfileSession {
    fn default() -> Self {
        Self {
            player: None,
            games: Vec::new(),
            analyses: HashMap::new(),
            errors: BTreeMap::new(),
            status: LoadStatus::Idle,
            profile: None,
        }
    }
}

impl ProfileSession {
    pub fn filtered_games(&self, filter: GameFilter) -> Vec<&GameRecord> {
        self.games.iter().filter(|game| filter.matches(game)).collect()
    }

    pub fn aggregate(&self, filter: GameFilter) -> Option<AggregateResult> {
        let player = self.player?;
        Some(aggregate(self.filtered_games(filter), &self.analyses, player))
    }

    pub fn summary(&self, filter: GameFilter) -> Option<ProfileSummary> {
        let games = self.filtered_games(filter);
        let ranked_games = games.iter().filter(|game| game.ranked).count();
        let total_games = games.len();
        let aggregate = self.aggregate(filter)?;

        Some(ProfileSummary {
            total_games,
            ranked_games,
            free_games: total_games - ranked_games,
            wins: aggregate.combined.wins,
            losses: aggregate.combined.losses,
            accuracy: aggregate.combined.phases.total.accuracy,
            aggregate,
        })
    }
}

/// Proof of which load a write belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    player: PlayerId,
}

impl LoadTicket {
    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Shared handle to the caller-owned profile session
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<ProfileSession>>,
    generation: Arc<AtomicU64>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the session for `player` and supersede any load in flight
    pub async fn begin_load(&self, player: PlayerId) -> LoadTicket {
        let mut session = self.inner.write().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *session = ProfileSession {
            player: Some(player),
            status: LoadStatus::Loading,
            ..Default::default()
        };
        debug!("Started load {} for player {}", generation, player);
        LoadTicket { generation, player }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Append an analyzed game; `false` when the ticket is stale
    pub async fn commit_game(
        &self,
        ticket: &LoadTicket,
        game: GameRecord,
        analysis: GameAnalysis,
    ) -> bool {
        let mut session = self.inner.write().await;
        if !self.is_current(ticket) {
            debug!("Discarding game {} from superseded load", game.id);
            return false;
        }
        session.analyses.insert(game.id, analysis);
        session.games.push(game);
        true
    }

    pub async fn record_error(&self, ticket: &LoadTicket, game: GameId, message: String) -> bool {
        let mut session = self.inner.write().await;
        if !self.is_current(ticket) {
            return false;
        }
        session.errors.insert(game, message);
        true
    }

    /// Set the terminal status and derive the player profile
    pub async fn finish(&self, ticket: &LoadTicket, status: LoadStatus) -> bool {
        let mut session = self.inner.write().await;
        if !self.is_current(ticket) {
            return false;
        }
        session.profile = Some(PlayerProfile::derive(ticket.player, &session.games));
        session.status = status;
        true
    }

    /// Attach an analysis fetched on demand, outside any load
    pub async fn attach_analysis(&self, analysis: GameAnalysis) {
        let mut session = self.inner.write().await;
        session.errors.remove(&analysis.game_id);
        session.analyses.insert(analysis.game_id, analysis);
    }

    pub async fn read<R>(&self, f: impl FnOnce(&ProfileSession) -> R) -> R {
        let session = self.inner.read().await;
        f(&session)
    }

    pub async fn snapshot(&self) -> ProfileSession {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoardMove, PlayerRef, ReviewMetadata, Side};

    const ME: PlayerId = PlayerId(1);

    fn game(id: u64, ranked: bool) -> GameRecord {
        GameRecord {
            id: GameId(id),
            width: 19,
            height: 19,
            black: PlayerRef {
                id: Some(ME),
                username: Some("me".to_string()),
                ranking: Some(32.0),
                icon: Some("https://img/me.png".to_string()),
            },
            white: PlayerRef {
                id: Some(PlayerId(2)),
                ..Default::default()
            },
            ranked,
            ended: None,
            outcome: "Resignation".to_string(),
            black_lost: Some(false),
            white_lost: Some(true),
        }
    }

    fn analysis(id: u64) -> GameAnalysis {
        GameAnalysis::from_review(
            GameId(id),
            ReviewMetadata {
                moves: vec![BoardMove::Pass; 2],
                scores: vec![Some(0.0), Some(0.25), Some(2.0)],
                win_rates: vec![],
                initial_player: Side::Black,
                width: 19,
                height: 19,
            },
        )
    }

    #[test]
    fn test_filter_ranked_query() {
        assert_eq!(GameFilter::default().ranked_query(), None);
        assert_eq!(GameFilter::ranked_only().ranked_query(), Some(true));
        assert_eq!(GameFilter::free_only().ranked_query(), Some(false));
        let none = GameFilter {
            include_ranked: false,
            include_free: false,
        };
        assert_eq!(none.ranked_query(), None);
        assert!(!none.matches(&game(1, true)));
    }

    #[test]
    fn test_profile_falls_back_to_player_id() {
        let profile = PlayerProfile::derive(PlayerId(99), &[game(1, true)]);
        assert_eq!(profile.name, "Player 99");
        assert!(profile.rank.is_none());

        let profile = PlayerProfile::derive(ME, &[game(1, true)]);
        assert_eq!(profile.name, "me");
        assert_eq!(profile.rank.as_deref(), Some("3d"));
        assert_eq!(profile.avatar.as_deref(), Some("https://img/me.png"));
    }

    #[tokio::test]
    async fn test_stale_ticket_is_discarded() {
        let handle = SessionHandle::new();
        let first = handle.begin_load(ME).await;
        assert!(handle.commit_game(&first, game(1, true), analysis(1)).await);

        let second = handle.begin_load(ME).await;
        assert!(!handle.is_current(&first));
        assert!(!handle.commit_game(&first, game(2, true), analysis(2)).await);
        assert!(!handle.finish(&first, LoadStatus::Completed).await);

        let session = handle.snapshot().await;
        assert!(session.games.is_empty());
        assert_eq!(session.status, LoadStatus::Loading);

        assert!(handle.finish(&second, LoadStatus::Exhausted).await);
        assert_eq!(handle.snapshot().await.status, LoadStatus::Exhausted);
    }

    #[tokio::test]
    async fn test_summary_respects_filter() {
        let handle = SessionHandle::new();
        let ticket = handle.begin_load(ME).await;
        handle.commit_game(&ticket, game(1, true), analysis(1)).await;
        handle.commit_game(&ticket, game(2, false), analysis(2)).await;
        handle.finish(&ticket, LoadStatus::Completed).await;

        let all = handle
            .read(|s| s.summary(GameFilter::default()))
            .await
            .unwrap();
        assert_eq!(all.total_games, 2);
        assert_eq!(all.ranked_games, 1);
        assert_eq!(all.free_games, 1);
        assert_eq!(all.wins, 2);
        assert_eq!(all.accuracy, 100.0);

        let ranked = handle
            .read(|s| s.summary(GameFilter::ranked_only()))
            .await
            .unwrap();
        assert_eq!(ranked.total_games, 1);
        assert_eq!(ranked.aggregate.reports.len(), 1);
    }
}
