use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of a live transcription session as reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Backend identifier for the session
    pub session_id: String,
    /// Meeting this session is transcribing
    pub meeting_id: String,
    /// Human-readable meeting topic
    pub meeting_topic: String,
    /// Start timestamp; may lack a zone suffix, in which case it is UTC
    pub started_at: String,
    /// Number of participants detected so far
    pub participant_count: u32,
    /// Cumulative number of segments emitted
    pub segment_count: u64,
}

/// One attributed utterance of transcript text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Opaque identifier, used as the incremental-fetch cursor
    pub id: String,
    /// Display name (or raw label) of the speaker
    pub speaker: String,
    /// Wall-clock emission time as rendered by the backend
    pub time: String,
    /// Transcribed text
    pub text: String,
    /// Short initials for avatar rendering
    pub initials: String,
    /// CSS-style color class assigned by the backend
    #[serde(rename = "colorClass")]
    pub color_class: String,
}

/// A speaker label known to the backend plus its current display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerInfo {
    pub speaker_id: String,
    pub label: String,
    #[serde(default)]
    pub mapped_name: String,
}

/// Response of `GET /api/live/segments/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentsResponse {
    pub session: SessionInfo,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

/// Response of `GET /api/live/speakers/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeakersResponse {
    #[serde(default)]
    pub speakers: Vec<SpeakerInfo>,
    #[serde(default)]
    pub mapping: HashMap<String, String>,
}

/// Body of `PUT /api/live/speakers/{id}` — always the full mapping
#[derive(Debug, Serialize)]
pub struct SaveMappingRequest {
    pub mapping: HashMap<String, String>,
}

/// Lifecycle state of a recording bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    Joining,
    InMeeting,
    Recording,
    Completed,
    Error,
    /// Any status string this client does not know about
    #[serde(other)]
    Unknown,
}

impl BotStatus {
    /// Terminal states mean the bot's meeting is over
    pub fn is_terminal(self) -> bool {
        matches!(self, BotStatus::Completed | BotStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BotStatus::Joining => "joining",
            BotStatus::InMeeting => "in_meeting",
            BotStatus::Recording => "recording",
            BotStatus::Completed => "completed",
            BotStatus::Error => "error",
            BotStatus::Unknown => "unknown",
        }
    }
}

/// One entry of `GET /api/bot/sessions`
#[derive(Debug, Clone, Deserialize)]
pub struct BotSessionSummary {
    pub id: String,
    #[serde(default)]
    pub status: Option<BotStatus>,
    #[serde(default)]
    pub meeting_id: Option<String>,
}

/// One entry of `GET /api/live/sessions`
#[derive(Debug, Clone, Deserialize)]
pub struct LiveSessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub meeting_topic: Option<String>,
}

/// Response of `GET /api/bot/{id}/status`
#[derive(Debug, Clone, Deserialize)]
pub struct BotStatusResponse {
    pub status: BotStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Body of `POST /api/bot/dispatch`
#[derive(Debug, Serialize)]
pub struct DispatchRequest {
    /// Meeting URL or identifier the bot should join
    pub meeting_id: String,
}

/// Response of `POST /api/bot/dispatch`
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchResponse {
    pub session: BotSessionSummary,
}

/// Error payload the backend attaches to non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
