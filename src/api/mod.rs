pub mod types;

use reqwest::StatusCode;
use std::collections::HashMap;
use thiserror::Error;

use types::{
    BotSessionSummary, BotStatusResponse, DispatchRequest, DispatchResponse, ErrorBody,
    LiveSessionSummary, SaveMappingRequest, SegmentsResponse, SpeakersResponse,
};

/// Errors produced by backend calls.
///
/// `NotFound` is deliberately its own variant: a 404 on a session-scoped
/// endpoint means "session ended/unknown" and callers react to it differently
/// from every other failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend error {status}: {detail}")]
    Backend { status: StatusCode, detail: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Thin typed wrapper over the backend's HTTP API.
///
/// One instance is shared by every poller; `reqwest::Client` already pools
/// connections internally.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a response to `ApiError` unless it is 2xx.
    async fn check(path: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()));
        }
        // Prefer the backend's structured detail, fall back to raw body text
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.detail)
            .unwrap_or(body);
        Err(ApiError::Backend { status, detail })
    }

    /// List bot-driven sessions currently running; empty means none active.
    pub async fn list_bot_sessions(&self) -> Result<Vec<BotSessionSummary>> {
        let path = "/api/bot/sessions";
        log::debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        Ok(Self::check(path, response).await?.json().await?)
    }

    /// List manually-started live sessions; empty means none active.
    pub async fn list_live_sessions(&self) -> Result<Vec<LiveSessionSummary>> {
        let path = "/api/live/sessions";
        log::debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        Ok(Self::check(path, response).await?.json().await?)
    }

    /// Initialize a placeholder session so the monitor has something to show.
    pub async fn init_live_session(
        &self,
        session_id: &str,
        meeting_id: &str,
        meeting_topic: &str,
    ) -> Result<()> {
        let path = format!("/api/live/segments/{}/init", session_id);
        log::debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(&path))
            .query(&[("meeting_id", meeting_id), ("meeting_topic", meeting_topic)])
            .send()
            .await?;
        Self::check(&path, response).await?;
        Ok(())
    }

    /// Fetch the session snapshot plus segments newer than `since_id`.
    /// `since_id` is omitted entirely on the first call of a session.
    pub async fn fetch_segments(
        &self,
        session_id: &str,
        since_id: Option<&str>,
    ) -> Result<SegmentsResponse> {
        let path = format!("/api/live/segments/{}", session_id);
        log::debug!("GET {} since_id={:?}", path, since_id);
        let mut request = self.client.get(self.url(&path));
        if let Some(cursor) = since_id {
            request = request.query(&[("since_id", cursor)]);
        }
        let response = request.send().await?;
        Ok(Self::check(&path, response).await?.json().await?)
    }

    /// Fetch the known speaker labels and the current label→name mapping.
    pub async fn fetch_speakers(&self, session_id: &str) -> Result<SpeakersResponse> {
        let path = format!("/api/live/speakers/{}", session_id);
        log::debug!("GET {}", path);
        let response = self.client.get(self.url(&path)).send().await?;
        Ok(Self::check(&path, response).await?.json().await?)
    }

    /// Replace the session's speaker mapping wholesale.
    pub async fn save_speaker_mapping(
        &self,
        session_id: &str,
        mapping: &HashMap<String, String>,
    ) -> Result<()> {
        let path = format!("/api/live/speakers/{}", session_id);
        log::debug!("PUT {}", path);
        let body = SaveMappingRequest {
            mapping: mapping.clone(),
        };
        let response = self.client.put(self.url(&path)).json(&body).send().await?;
        Self::check(&path, response).await?;
        Ok(())
    }

    /// Current lifecycle status of a recording bot.
    pub async fn bot_status(&self, session_id: &str) -> Result<BotStatusResponse> {
        let path = format!("/api/bot/{}/status", session_id);
        log::debug!("GET {}", path);
        let response = self.client.get(self.url(&path)).send().await?;
        Ok(Self::check(&path, response).await?.json().await?)
    }

    /// Send a recording bot into a meeting by URL.
    pub async fn dispatch_bot(&self, meeting_id: &str) -> Result<DispatchResponse> {
        let path = "/api/bot/dispatch";
        log::debug!("POST {}", path);
        let body = DispatchRequest {
            meeting_id: meeting_id.to_string(),
        };
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        Ok(Self::check(path, response).await?.json().await?)
    }
}
