//! Finding the session worth watching.
//!
//! Priority order: a bot-driven session beats a manually-started live
//! session, and when nothing at all is running we initialize a placeholder
//! session so downstream consumers always have a session id to poll.

use crate::api::{ApiClient, Result};
use crate::live::{DEMO_MEETING_ID, DEMO_MEETING_TOPIC, DEMO_SESSION_ID};

/// Which path discovery took to a session id.
///
/// The monitor treats these almost identically; the exception is the
/// placeholder, which has no recording bot behind it and is therefore
/// never checked for termination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveredSession {
    /// First entry of the bot session list.
    Bot { session_id: String },
    /// First entry of the live session list.
    Live { session_id: String },
    /// Freshly-initialized placeholder session.
    Placeholder,
}

impl DiscoveredSession {
    pub fn session_id(&self) -> &str {
        match self {
            DiscoveredSession::Bot { session_id } => session_id,
            DiscoveredSession::Live { session_id } => session_id,
            DiscoveredSession::Placeholder => DEMO_SESSION_ID,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, DiscoveredSession::Placeholder)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DiscoveredSession::Bot { .. } => "bot",
            DiscoveredSession::Live { .. } => "live",
            DiscoveredSession::Placeholder => "placeholder",
        }
    }
}

/// Run the discovery chain once.
///
/// A failed or empty list at one step falls through to the next; only a
/// failure to initialize the placeholder makes the whole attempt fail,
/// and the caller simply retries on its next tick.
pub async fn discover_active(client: &ApiClient) -> Result<DiscoveredSession> {
    match client.list_bot_sessions().await {
        Ok(sessions) => {
            if let Some(first) = sessions.into_iter().next() {
                log::info!("discovered bot session {}", first.id);
                return Ok(DiscoveredSession::Bot { session_id: first.id });
            }
        }
        Err(err) => log::warn!("bot session list failed: {}", err),
    }

    match client.list_live_sessions().await {
        Ok(sessions) => {
            if let Some(first) = sessions.into_iter().next() {
                log::info!("discovered live session {}", first.session_id);
                return Ok(DiscoveredSession::Live {
                    session_id: first.session_id,
                });
            }
        }
        Err(err) => log::warn!("live session list failed: {}", err),
    }

    client
        .init_live_session(DEMO_SESSION_ID, DEMO_MEETING_ID, DEMO_MEETING_TOPIC)
        .await?;
    log::info!("no active session, initialized placeholder {}", DEMO_SESSION_ID);
    Ok(DiscoveredSession::Placeholder)
}
