//! Ingestion-boundary normalization
//!
//! The directory and review services answer with loosely shaped JSON: player
//! ids appear at the top level or under `players`, review ids under `id` or
//! `ai_review_id`, moves as objects or arrays. Every such fallback lives
//! here; the rest of the crate only sees the canonical types.

use crate::error::{InsightError, Result};
use crate::types::{
    BoardMove, GameId, GameRecord, GamesPage, PlayerId, PlayerRef, ReviewMetadata, ReviewSummary,
    Side,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

/// Board size assumed when a review omits its dimensions
const DEFAULT_BOARD_SIZE: u32 = 19;

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u32(value: Option<&Value>) -> Option<u32> {
    value.and_then(as_u64).and_then(|n| u32::try_from(n).ok())
}

fn as_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn normalize_player(id: Option<&Value>, details: Option<&Value>) -> PlayerRef {
    let details = details.filter(|d| d.is_object());
    let id = id
        .and_then(as_u64)
        .or_else(|| details.and_then(|d| d.get("id")).and_then(as_u64))
        .map(PlayerId);

    let username = details.and_then(|d| {
        as_str(d.get("username"))
            .or_else(|| as_str(d.get("name")))
            .or_else(|| as_str(d.get("display_name")))
    });
    let ranking = details.and_then(|d| {
        d.get("ranking")
            .and_then(Value::as_f64)
            .or_else(|| d.get("rank").and_then(Value::as_f64))
    });
    let icon = details.and_then(|d| as_str(d.get("icon")));

    PlayerRef {
        id,
        username,
        ranking,
        icon,
    }
}

/// Canonical game record from a directory entry
pub fn normalize_game(value: &Value) -> Result<GameRecord> {
    let id = value
        .get("id")
        .and_then(as_u64)
        .map(GameId)
        .ok_or_else(|| InsightError::MalformedMessage("game record without id".to_string()))?;

    let players = value.get("players");
    let black = normalize_player(
        value.get("black").filter(|v| !v.is_object()),
        players
            .and_then(|p| p.get("black"))
            .or_else(|| value.get("black").filter(|v| v.is_object())),
    );
    let white = normalize_player(
        value.get("white").filter(|v| !v.is_object()),
        players
            .and_then(|p| p.get("white"))
            .or_else(|| value.get("white").filter(|v| v.is_object())),
    );

    let ended = value
        .get("ended")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(GameRecord {
        id,
        width: as_u32(value.get("width")).unwrap_or(0),
        height: as_u32(value.get("height")).unwrap_or(0),
        black,
        white,
        ranked: value.get("ranked").and_then(Value::as_bool).unwrap_or(false),
        ended,
        outcome: as_str(value.get("outcome")).unwrap_or_default(),
        black_lost: value.get("black_lost").and_then(Value::as_bool),
        white_lost: value.get("white_lost").and_then(Value::as_bool),
    })
}

/// Directory page: `results` plus whether a `next` page exists
///
/// Entries that cannot be normalized are dropped, not fatal.
pub fn normalize_games_page(value: &Value) -> Result<GamesPage> {
    let results = value
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| InsightError::MalformedMessage("games page without results".to_string()))?;

    let games = results
        .iter()
        .filter_map(|entry| match normalize_game(entry) {
            Ok(game) => Some(game),
            Err(e) => {
                debug!("Dropping directory entry: {}", e);
                None
            }
        })
        .collect();

    let has_next = match value.get("next") {
        Some(Value::Null) | None => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    };

    Ok(GamesPage {
        results: games,
        has_next,
    })
}

/// Review summaries from `{results: [...]}` or a bare array
///
/// Summaries without an id or uuid are dropped. Any other shape is an empty
/// list.
pub fn normalize_review_list(value: &Value) -> Vec<ReviewSummary> {
    let entries = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    entries
        .iter()
        .filter_map(|entry| {
            let id = entry
                .get("id")
                .and_then(as_u64)
                .or_else(|| entry.get("ai_review_id").and_then(as_u64))?;
            let uuid = as_str(entry.get("uuid"))?;
            Some(ReviewSummary { id, uuid })
        })
        .collect()
}

fn coordinate(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
}

fn parse_move(value: &Value) -> Option<BoardMove> {
    let (x, y) = match value {
        Value::Array(parts) => (coordinate(parts.first()?)?, coordinate(parts.get(1)?)?),
        Value::Object(map) => (coordinate(map.get("x")?)?, coordinate(map.get("y")?)?),
        _ => return None,
    };
    if x < 0 || y < 0 {
        return Some(BoardMove::Pass);
    }
    Some(BoardMove::Play {
        x: u32::try_from(x).ok()?,
        y: u32::try_from(y).ok()?,
    })
}

/// Every upstream entry yields exactly one move so move numbers stay aligned
/// with the score series
fn normalize_move(value: &Value) -> BoardMove {
    parse_move(value).unwrap_or_else(|| {
        debug!("Unreadable move entry {}", value);
        BoardMove::Unknown
    })
}

fn normalize_series(value: Option<&Value>) -> Vec<Option<f64>> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| v.as_f64().filter(|f| f.is_finite()))
                .collect()
        })
        .unwrap_or_default()
}

/// Canonical review metadata from the channel's `metadata` payload
pub fn normalize_review_metadata(value: &Value) -> Result<ReviewMetadata> {
    let game_state = value
        .get("game_state")
        .filter(|v| v.is_object())
        .ok_or_else(|| InsightError::MalformedMessage("review metadata without game_state".to_string()))?;

    let moves = game_state
        .get("moves")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(normalize_move).collect())
        .unwrap_or_default();

    let initial_player = game_state
        .get("initial_player")
        .and_then(Value::as_str)
        .map(Side::from_name)
        .unwrap_or(Side::Black);

    Ok(ReviewMetadata {
        moves,
        scores: normalize_series(value.get("scores")),
        win_rates: normalize_series(value.get("win_rates")),
        initial_player,
        width: as_u32(game_state.get("width")).unwrap_or(DEFAULT_BOARD_SIZE),
        height: as_u32(game_state.get("height")).unwrap_or(DEFAULT_BOARD_SIZE),
    })
}
