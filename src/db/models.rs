// Data models
use serde::{Deserialize, Serialize};

/// An affirmation record as served by the backend and cached locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affirmation {
    pub id: String,
    pub title: String,
    pub text: String,
    /// Path relative to the API base; resolve with `ApiClient::resolve_audio_url`.
    pub audio_url: String,
    /// JSON-encoded word timings; parse with `rsvp::parse_word_timings`.
    #[serde(default)]
    pub word_timings: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
}

/// A completed listen of an affirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListeningSession {
    pub id: i64,
    pub affirmation_id: String,
    /// Local date as YYYY-MM-DD.
    pub listened_on: String,
    pub duration_ms: i64,
}
