//! Player reference parsing and display formatting

use crate::types::PlayerId;
use once_cell::sync::Lazy;
use regex::Regex;

static PLAYER_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"player/(\d+)|user/view/(\d+)").expect("Valid player URL regex")
});

/// Parse a player id from a bare number or a profile URL
///
/// Accepts `12345`, `https://online-go.com/player/12345/name` and
/// `https://online-go.com/user/view/12345`.
pub fn parse_player_id(input: &str) -> Option<PlayerId> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.parse().ok().map(PlayerId);
    }
    let caps = PLAYER_URL.captures(trimmed)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
        .map(PlayerId)
}

/// Format an OGS numeric ranking as kyu/dan ("5k", "2d")
pub fn format_rank(ranking: f64) -> Option<String> {
    if !ranking.is_finite() {
        return None;
    }
    if ranking >= 30.0 {
        let dan = (ranking - 29.0).round().max(1.0);
        Some(format!("{}d", dan as i64))
    } else {
        let kyu = (30.0 - ranking).round().max(1.0);
        Some(format!("{}k", kyu as i64))
    }
}

pub fn display_name(username: Option<&str>) -> &str {
    match username {
        Some(name) if !name.is_empty() => name,
        _ => "Unknown",
    }
}

/// Truncate at a character boundary, appending "..." when shortened
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
