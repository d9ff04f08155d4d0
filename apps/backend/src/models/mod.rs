//! API request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use learnflow_core::{CollectionId, Feedback, SessionMode, SessionView, Side};

// === Sessions ===

/// Body of `POST /api/sessions`: `{collectionId, mode, wordIds?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub collection_id: CollectionId,
    #[serde(flatten)]
    pub mode: SessionMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub session: SessionView,
}

/// Result of a learner action, with the session as it stands afterwards.
///
/// `feedback` is absent when the action produced nothing to show, such as a
/// pronunciation score that arrived after the session was abandoned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub feedback: Option<Feedback>,
    pub session: SessionView,
}

// === Exercise actions ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChooseOptionRequest {
    pub option: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellingRequest {
    pub answer: String,
}

/// Microphone permission as reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicrophonePermission {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRecordingRequest {
    pub microphone: MicrophonePermission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecordingRequest {
    /// The recorded clip, base64 encoded.
    pub audio_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickTokenRequest {
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectMatchRequest {
    pub side: Side,
    pub pair_id: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_learn_mode() {
        let req: CreateSessionRequest = serde_json::from_value(json!({
            "collectionId": 12,
            "mode": "learn",
            "wordIds": [1, 2]
        }))
        .unwrap();
        assert_eq!(req.collection_id, 12);
        assert_eq!(req.mode, SessionMode::Learn { word_ids: vec![1, 2] });
    }

    #[test]
    fn test_create_request_repeat_mode() {
        let req: CreateSessionRequest =
            serde_json::from_value(json!({"collectionId": 3, "mode": "repeat"})).unwrap();
        assert_eq!(req.mode, SessionMode::Repeat);
    }

    #[test]
    fn test_select_match_request() {
        let req: SelectMatchRequest =
            serde_json::from_value(json!({"side": "right", "pairId": 4})).unwrap();
        assert_eq!(req.side, Side::Right);
        assert_eq!(req.pair_id, 4);
    }
}
