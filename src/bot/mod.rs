//! Sending a recording bot into a meeting and waiting for it to arrive.

use std::fmt;
use std::time::Duration;

use anyhow::anyhow;

use crate::api::types::BotStatus;
use crate::api::ApiClient;

/// How often the bot's join progress is polled after dispatch.
pub const JOIN_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Coarse join-phase view of a bot status, for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinProgress {
    /// Dispatch accepted, no meaningful status yet.
    Pending,
    /// The bot is connecting to the meeting.
    Joining,
    /// The bot is in the meeting; the live view is worth watching now.
    Ready,
    /// The bot will not make it into the meeting.
    Failed,
}

impl JoinProgress {
    pub fn of(status: BotStatus) -> Self {
        match status {
            BotStatus::Joining => JoinProgress::Joining,
            BotStatus::InMeeting | BotStatus::Recording => JoinProgress::Ready,
            BotStatus::Completed | BotStatus::Error => JoinProgress::Failed,
            BotStatus::Unknown => JoinProgress::Pending,
        }
    }
}

impl fmt::Display for JoinProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JoinProgress::Pending => "waiting for the bot to start",
            JoinProgress::Joining => "bot is joining the meeting",
            JoinProgress::Ready => "bot is in the meeting",
            JoinProgress::Failed => "bot failed to join",
        };
        write!(f, "{}", label)
    }
}

/// Dispatch a bot to `meeting_url` and return the new session id.
///
/// Backend rejections (bad URL, quota, ...) surface as the error detail the
/// backend sent.
pub async fn dispatch(client: &ApiClient, meeting_url: &str) -> anyhow::Result<String> {
    let response = client.dispatch_bot(meeting_url).await?;
    log::info!("dispatched bot session {}", response.session.id);
    Ok(response.session.id)
}

/// Poll the bot's status every `poll` until it reaches the meeting.
///
/// Status-endpoint failures are ignored and retried; the backend needs a
/// moment to register a fresh session. Returns an error when the bot
/// reports `error`, or finishes without ever entering the meeting.
pub async fn wait_until_ready(
    client: &ApiClient,
    session_id: &str,
    poll: Duration,
) -> anyhow::Result<()> {
    let mut tick = tokio::time::interval(poll);
    let mut last = JoinProgress::Pending;
    loop {
        tick.tick().await;
        let response = match client.bot_status(session_id).await {
            Ok(response) => response,
            Err(err) => {
                log::debug!("status poll for {} failed, retrying: {}", session_id, err);
                continue;
            }
        };
        let progress = JoinProgress::of(response.status);
        if progress != last {
            log::info!("bot {}: {}", session_id, progress);
            last = progress;
        }
        match progress {
            JoinProgress::Ready => return Ok(()),
            JoinProgress::Failed => {
                let message = response.error_message.unwrap_or_else(|| {
                    format!("bot ended with status {}", response.status.as_str())
                });
                return Err(anyhow!(message));
            }
            JoinProgress::Pending | JoinProgress::Joining => {}
        }
    }
}
