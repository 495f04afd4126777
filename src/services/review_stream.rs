//! AI review channel client
//!
//! Protocol over a WebSocket with JSON array frames `[event, payload]`:
//!
//! 1. `["authenticate", {jwt, device_id, ...}]` when a token is available
//! 2. `["ai-review-connect", {uuid, game_id, ai_review_id}]`
//! 3. wait for `[<review uuid>, {metadata: {game_state, scores, win_rates}}]`
//!
//! Frames that are not arrays are ignored. The whole exchange is bounded by a
//! single timeout and the socket is closed once it ends.

use super::auth::TokenSource;
use super::normalize::normalize_review_metadata;
use super::ReviewSource;
use crate::config::ReviewStreamSettings;
use crate::error::{InsightError, Result};
use crate::types::{GameId, ReviewMetadata, ReviewSummary};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use uuid::Uuid;

/// `authenticate` frame
pub fn authenticate_frame(jwt: &str, device_id: &str, settings: &ReviewStreamSettings) -> String {
    json!([
        "authenticate",
        {
            "jwt": jwt,
            "device_id": device_id,
            "user_agent": format!("ogs-insight/{}", env!("CARGO_PKG_VERSION")),
            "language": settings.language,
            "language_version": settings.language_version,
            "client_version": settings.client_version,
        }
    ])
    .to_string()
}

/// `ai-review-connect` frame
pub fn connect_frame(game: GameId, review: &ReviewSummary) -> String {
    json!([
        "ai-review-connect",
        {
            "uuid": review.uuid,
            "game_id": game.0,
            "ai_review_id": review.id,
        }
    ])
    .to_string()
}

/// Inspect one text frame
///
/// Returns the `metadata` object when the frame answers `uuid`, `None` for
/// frames to ignore, and `MalformedMessage` when the frame is not JSON.
pub fn match_review_frame(text: &str, uuid: &str) -> Result<Option<Value>> {
    let frame: Value = serde_json::from_str(text)
        .map_err(|e| InsightError::MalformedMessage(format!("review frame: {}", e)))?;

    let Value::Array(parts) = frame else {
        return Ok(None);
    };
    if parts.first().and_then(Value::as_str) != Some(uuid) {
        return Ok(None);
    }
    let metadata = parts
        .get(1)
        .and_then(|payload| payload.get("metadata"))
        .filter(|metadata| metadata.get("game_state").is_some());
    Ok(metadata.cloned())
}

/// Review source over the OGS AI WebSocket
pub struct AiReviewSocket {
    socket_url: String,
    settings: ReviewStreamSettings,
    tokens: Arc<dyn TokenSource>,
}

impl AiReviewSocket {
    pub fn new(
        socket_url: impl Into<String>,
        settings: ReviewStreamSettings,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            socket_url: socket_url.into(),
            settings,
            tokens,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    async fn exchange(&self, game: GameId, review: &ReviewSummary) -> Result<Value> {
        let jwt = self.tokens.token().await;

        let (socket, _response) = tokio_tungstenite::connect_async(self.socket_url.as_str())
            .await
            .map_err(|e| InsightError::network(format!("review channel: {}", e)))?;
        let (mut write, mut read) = socket.split();

        match &jwt {
            Some(jwt) => {
                let device_id = Uuid::new_v4().to_string();
                write
                    .send(Message::Text(authenticate_frame(jwt, &device_id, &self.settings)))
                    .await
                    .map_err(|e| InsightError::network(e.to_string()))?;
            }
            None => debug!("Connecting to review channel unauthenticated"),
        }
        write
            .send(Message::Text(connect_frame(game, review)))
            .await
            .map_err(|e| InsightError::network(e.to_string()))?;

        let outcome = loop {
            let Some(message) = read.next().await else {
                break Err(InsightError::network("review channel ended before metadata"));
            };
            match message {
                Ok(Message::Text(text)) => match match_review_frame(&text, &review.uuid) {
                    Ok(Some(metadata)) => break Ok(metadata),
                    Ok(None) => continue,
                    Err(e) => break Err(e),
                },
                Ok(Message::Close(frame)) => {
                    break Err(InsightError::network(format!(
                        "review channel closed: {:?}",
                        frame
                    )))
                }
                Ok(_) => continue,
                Err(e) => break Err(InsightError::network(e.to_string())),
            }
        };

        if let Err(e) = write.close().await {
            debug!("Closing review channel: {}", e);
        }
        outcome
    }
}

#[async_trait]
impl ReviewSource for AiReviewSocket {
    async fn fetch_review(&self, game: GameId, review: &ReviewSummary) -> Result<ReviewMetadata> {
        debug!("Requesting AI review {} for game {}", review.id, game);

        let bound = self.timeout();
        let metadata = match tokio::time::timeout(bound, self.exchange(game, review)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("AI review for game {} timed out after {:?}", game, bound);
                return Err(InsightError::Timeout(bound));
            }
        };

        normalize_review_metadata(&metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ReviewSummary {
        ReviewSummary {
            id: 55,
            uuid: "abc-123".to_string(),
        }
    }

    #[test]
    fn test_connect_frame() {
        let frame: Value = serde_json::from_str(&connect_frame(GameId(9), &summary())).unwrap();
        assert_eq!(
            frame,
            json!(["ai-review-connect", {"uuid": "abc-123", "game_id": 9, "ai_review_id": 55}])
        );
    }

    #[test]
    fn test_authenticate_frame() {
        let settings = ReviewStreamSettings::default();
        let frame: Value =
            serde_json::from_str(&authenticate_frame("jwt-1", "dev-1", &settings)).unwrap();
        assert_eq!(frame[0], "authenticate");
        assert_eq!(frame[1]["jwt"], "jwt-1");
        assert_eq!(frame[1]["device_id"], "dev-1");
        assert_eq!(frame[1]["language"], "en");
        assert_eq!(frame[1]["client_version"], settings.client_version.as_str());
    }

    #[test]
    fn test_match_review_frame() {
        let hit = r#"["abc-123", {"metadata": {"game_state": {"moves": []}, "scores": [0.1]}}]"#;
        let metadata = match_review_frame(hit, "abc-123").unwrap().unwrap();
        assert_eq!(metadata["scores"], json!([0.1]));

        let other_uuid = r#"["zzz", {"metadata": {"game_state": {}}}]"#;
        assert!(match_review_frame(other_uuid, "abc-123").unwrap().is_none());

        let progress = r#"["abc-123", {"metadata": {"scores": [0.1]}}]"#;
        assert!(match_review_frame(progress, "abc-123").unwrap().is_none());

        assert!(match_review_frame(r#"{"hello": 1}"#, "abc-123").unwrap().is_none());
    }

    #[test]
    fn test_unparseable_frame_is_malformed() {
        assert!(matches!(
            match_review_frame("not json", "abc-123"),
            Err(InsightError::MalformedMessage(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_channel_is_network_failure() {
        let socket = AiReviewSocket::new(
            "ws://127.0.0.1:9/",
            ReviewStreamSettings::default(),
            Arc::new(None::<String>),
        );
        let result = socket.fetch_review(GameId(1), &summary()).await;
        assert!(matches!(result, Err(InsightError::NetworkFailure { .. })));
    }
}
