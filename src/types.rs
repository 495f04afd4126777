//! Core data types for OGS Insight
//!
//! Canonical shapes of what the upstream services deliver: game records from
//! the game directory, review summaries, and review metadata (move list plus
//! the score and win-rate series). Everything here is produced once at the
//! ingestion boundary (see [`crate::services::normalize`]) and read-only
//! afterwards.

use crate::utils::format::{display_name, format_rank};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Upstream numeric game identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upstream numeric player identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stone colour of a player or a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Black,
    White,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Black => Side::White,
            Side::White => Side::Black,
        }
    }

    /// Parse an upstream colour name; anything but "white" is black
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("white") {
            Side::White
        } else {
            Side::Black
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Black => "black",
            Side::White => "white",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a game from one player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Loss,
    /// Player absent or result flag missing
    Unknown,
}

impl GameResult {
    pub fn short(&self) -> &'static str {
        match self {
            GameResult::Win => "W",
            GameResult::Loss => "L",
            GameResult::Unknown => "N/A",
        }
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short())
    }
}

/// One participant as listed on a game record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: Option<PlayerId>,
    pub username: Option<String>,
    /// Numeric OGS ranking (30.0 = 1 dan)
    pub ranking: Option<f64>,
    /// Avatar URL
    pub icon: Option<String>,
}

impl PlayerRef {
    pub fn display_name(&self) -> &str {
        display_name(self.username.as_deref())
    }

    pub fn rank(&self) -> Option<String> {
        self.ranking.and_then(format_rank)
    }
}

/// A finished game as listed by the game directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub width: u32,
    pub height: u32,
    pub black: PlayerRef,
    pub white: PlayerRef,
    pub ranked: bool,
    pub ended: Option<DateTime<Utc>>,
    /// Free-form outcome, e.g. "Resignation" or "6.5 points"
    pub outcome: String,
    pub black_lost: Option<bool>,
    pub white_lost: Option<bool>,
}

static OUTCOME_POINTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)").expect("valid outcome regex"));

impl GameRecord {
    pub fn is_board(&self, size: u32) -> bool {
        self.width == size && self.height == size
    }

    /// Which side the player took, if they played this game at all
    pub fn side_of(&self, player: PlayerId) -> Option<Side> {
        if self.black.id == Some(player) {
            Some(Side::Black)
        } else if self.white.id == Some(player) {
            Some(Side::White)
        } else {
            None
        }
    }

    pub fn player(&self, side: Side) -> &PlayerRef {
        match side {
            Side::Black => &self.black,
            Side::White => &self.white,
        }
    }

    pub fn opponent_of(&self, player: PlayerId) -> Option<&PlayerRef> {
        self.side_of(player).map(|side| self.player(side.opposite()))
    }

    pub fn result_for(&self, player: PlayerId) -> GameResult {
        let lost = match self.side_of(player) {
            Some(Side::Black) => self.black_lost,
            Some(Side::White) => self.white_lost,
            None => return GameResult::Unknown,
        };
        match lost {
            Some(true) => GameResult::Loss,
            Some(false) => GameResult::Win,
            None => GameResult::Unknown,
        }
    }

    /// Compact result such as "W + R", "L + T" or "W + 6.5"
    pub fn result_summary_for(&self, player: PlayerId) -> String {
        let side = match self.result_for(player) {
            GameResult::Win => "W",
            GameResult::Loss => "L",
            GameResult::Unknown => "N",
        };
        let outcome = self.outcome.to_lowercase();
        if outcome.contains("resign") {
            return format!("{} + R", side);
        }
        if outcome.contains("time") {
            return format!("{} + T", side);
        }
        match OUTCOME_POINTS.captures(&outcome) {
            Some(caps) => format!("{} + {}", side, &caps[1]),
            None => format!("{} + ?", side),
        }
    }

    /// "Black vs White" display label
    pub fn label(&self) -> String {
        format!(
            "{} vs {}",
            self.black.display_name(),
            self.white.display_name()
        )
    }

    /// End date as YYYY-MM-DD
    pub fn ended_date(&self) -> Option<String> {
        self.ended.map(|ended| ended.format("%Y-%m-%d").to_string())
    }
}

/// One page of a player's game directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamesPage {
    pub results: Vec<GameRecord>,
    pub has_next: bool,
}

/// Query options for a directory page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page_size: u32,
    /// `Some(true)` ranked only, `Some(false)` free only, `None` both
    pub ranked: Option<bool>,
}

/// An AI review listed for a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub id: u64,
    pub uuid: String,
}

/// A board move as recorded in the review's game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardMove {
    /// Zero-based board coordinates
    Play { x: u32, y: u32 },
    Pass,
    /// An entry that could not be read; it still occupies its move number
    Unknown,
}

/// Evaluation data delivered by the review channel for one game
///
/// `scores` and `win_rates` are aligned with the move list and hold either
/// `moves.len()` or `moves.len() + 1` samples; the longer form includes the
/// position before move 1. Unknown samples are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    pub moves: Vec<BoardMove>,
    pub scores: Vec<Option<f64>>,
    pub win_rates: Vec<Option<f64>>,
    pub initial_player: Side,
    pub width: u32,
    pub height: u32,
}
