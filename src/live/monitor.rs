//! The monitor loop: discover a session, poll it, notice when it ends.
//!
//! One spawned task drives three cadences (segments, speakers, clock) off a
//! single `select!` loop, so every state transition happens on one thread of
//! control and the shutdown latch can never fire twice.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::types::{BotStatus, SessionInfo, SpeakerInfo, TranscriptSegment};
use crate::api::ApiClient;
use crate::flag::LiveFlag;
use crate::live::clock;
use crate::live::discovery::{discover_active, DiscoveredSession};
use crate::live::speakers::SpeakerDirectory;
use crate::live::state::LiveViewState;
use crate::live::{CLOCK_TICK, SEGMENT_POLL_INTERVAL, SPEAKER_POLL_INTERVAL};

/// Poll cadences for one monitor. Defaults match the reference intervals;
/// tests shrink them to keep runs fast.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub segment_poll: Duration,
    pub speaker_poll: Duration,
    pub clock_tick: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            segment_poll: SEGMENT_POLL_INTERVAL,
            speaker_poll: SPEAKER_POLL_INTERVAL,
            clock_tick: CLOCK_TICK,
        }
    }
}

/// Why a watched session stopped being watchable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// Bot reported `completed`.
    Completed,
    /// Bot reported `error`, with the backend's message when it sent one.
    Error { message: Option<String> },
    /// The bot status endpoint no longer knows the session.
    Gone,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Completed => write!(f, "completed"),
            EndReason::Error { message: Some(m) } => write!(f, "error: {}", m),
            EndReason::Error { message: None } => write!(f, "error"),
            EndReason::Gone => write!(f, "session not found"),
        }
    }
}

/// Everything a consumer can observe about the monitor, as a stream.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// Discovery picked (or re-picked) a session to watch.
    Discovered { session: DiscoveredSession },
    /// New transcript lines, already deduplicated, in arrival order.
    NewSegments { segments: Vec<TranscriptSegment> },
    /// The speaker mapping changed server-side.
    SpeakersChanged { mapping: HashMap<String, String> },
    /// Once per clock tick while a session is active.
    Clock { elapsed: String },
    /// Discovery could not reach the backend or create a placeholder;
    /// retried on the next tick. Transient poll failures are not reported.
    ConnectionLost { message: String },
    /// The watched session vanished mid-poll; discovery restarts.
    SessionLost { session_id: String },
    /// Terminal: the session is over. Sent exactly once, then the loop stops.
    Ended { session_id: String, reason: EndReason },
}

struct Shared {
    client: ApiClient,
    config: MonitorConfig,
    state: Mutex<LiveViewState>,
    directory: SpeakerDirectory,
    session: Mutex<Option<DiscoveredSession>>,
    // Serializes segment polling against mapping saves: a poll started
    // before an invalidation must not apply its stale rows after it.
    poll_gate: tokio::sync::Mutex<()>,
    events: broadcast::Sender<MonitorEvent>,
    // Raised while a discovered session is being watched
    flag: LiveFlag,
    ended: AtomicBool,
}

impl Shared {
    fn new(client: ApiClient, config: MonitorConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            client,
            config,
            state: Mutex::new(LiveViewState::new()),
            directory: SpeakerDirectory::new(),
            session: Mutex::new(None),
            poll_gate: tokio::sync::Mutex::new(()),
            events,
            flag: LiveFlag::new(),
            ended: AtomicBool::new(false),
        }
    }

    fn send(&self, event: MonitorEvent) {
        // Nobody listening is fine; state stays readable through the handle
        let _ = self.events.send(event);
    }

    /// Fire the end latch. Every later call is a no-op.
    fn finish(&self, session_id: &str, reason: EndReason) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        self.flag.stop();
        log::info!("session {} ended ({})", session_id, reason);
        self.send(MonitorEvent::Ended {
            session_id: session_id.to_string(),
            reason,
        });
    }
}

/// Builder for a running monitor.
pub struct LiveMonitor {
    client: ApiClient,
    config: MonitorConfig,
}

impl LiveMonitor {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            config: MonitorConfig::default(),
        }
    }

    pub fn with_config(client: ApiClient, config: MonitorConfig) -> Self {
        Self { client, config }
    }

    /// Spawn the polling loop and hand back its control handle.
    pub fn start(self) -> MonitorHandle {
        let shared = Arc::new(Shared::new(self.client, self.config));
        let task = tokio::spawn(run(Arc::clone(&shared)));
        MonitorHandle { shared, task }
    }
}

/// Control handle for a spawned monitor. Dropping it aborts the loop.
pub struct MonitorHandle {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Subscribe to the event stream. Slow consumers may observe a lagged
    /// error and should resubscribe or catch up via the snapshot getters.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.shared.events.subscribe()
    }

    pub fn session(&self) -> Option<DiscoveredSession> {
        self.shared.session.lock().unwrap().clone()
    }

    pub fn session_info(&self) -> Option<SessionInfo> {
        self.shared.state.lock().unwrap().session().cloned()
    }

    pub fn segments(&self) -> Vec<TranscriptSegment> {
        self.shared.state.lock().unwrap().segments().to_vec()
    }

    pub fn speakers(&self) -> Vec<SpeakerInfo> {
        self.shared.state.lock().unwrap().speakers().to_vec()
    }

    pub fn mapping(&self) -> HashMap<String, String> {
        self.shared.state.lock().unwrap().mapping().clone()
    }

    /// Elapsed wall-clock display for the active session, `HH:MM:SS`.
    pub fn elapsed(&self) -> Option<String> {
        let state = self.shared.state.lock().unwrap();
        state
            .session()
            .map(|info| clock::elapsed_display(&info.started_at, Utc::now()))
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state.lock().unwrap().is_connected()
    }

    pub fn is_saving(&self) -> bool {
        self.shared.directory.is_saving()
    }

    pub fn has_ended(&self) -> bool {
        self.shared.ended.load(Ordering::SeqCst)
    }

    /// Clone of the shared "a session is live" flag. The monitor raises it
    /// on discovery and clears it when the session is lost, ends, or the
    /// monitor stops; any component holding a clone can check it.
    pub fn live_flag(&self) -> LiveFlag {
        self.shared.flag.clone()
    }

    /// Replace the active session's speaker mapping.
    ///
    /// On success the transcript is refetched under the new names before
    /// this returns; on failure local state is untouched.
    pub async fn save_mapping(&self, mapping: HashMap<String, String>) -> anyhow::Result<()> {
        let session = self
            .session()
            .ok_or_else(|| anyhow!("no active session to save a mapping for"))?;
        let _gate = self.shared.poll_gate.lock().await;
        self.shared
            .directory
            .save(
                &self.shared.client,
                session.session_id(),
                &mapping,
                &self.shared.state,
            )
            .await?;
        let mapping = self.shared.state.lock().unwrap().mapping().clone();
        self.shared.send(MonitorEvent::SpeakersChanged { mapping });
        Ok(())
    }

    /// Stop polling immediately.
    pub fn stop(self) {
        self.shared.flag.stop();
        self.task.abort();
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shared.flag.stop();
        self.task.abort();
    }
}

async fn run(shared: Arc<Shared>) {
    let mut segment_tick = tokio::time::interval(shared.config.segment_poll);
    let mut speaker_tick = tokio::time::interval(shared.config.speaker_poll);
    let mut clock_tick = tokio::time::interval(shared.config.clock_tick);

    loop {
        tokio::select! {
            _ = segment_tick.tick() => on_segment_tick(&shared).await,
            _ = speaker_tick.tick() => on_speaker_tick(&shared).await,
            _ = clock_tick.tick() => on_clock_tick(&shared),
        }
        if shared.ended.load(Ordering::SeqCst) {
            break;
        }
    }
}

/// Segment cadence: make sure a session exists, pull new segments, then
/// check whether the bot behind it has finished.
async fn on_segment_tick(shared: &Arc<Shared>) {
    let _gate = shared.poll_gate.lock().await;
    let session = {
        let guard = shared.session.lock().unwrap();
        guard.clone()
    };
    let session = match session {
        Some(session) => session,
        None => match discover(shared).await {
            Some(session) => session,
            None => return,
        },
    };
    let session_id = session.session_id().to_string();

    let cursor = {
        let state = shared.state.lock().unwrap();
        state.cursor().map(str::to_string)
    };

    match shared.client.fetch_segments(&session_id, cursor.as_deref()).await {
        Ok(response) => {
            let fresh = {
                let mut state = shared.state.lock().unwrap();
                let before = state.segments().len();
                state.apply_segments(response);
                state.segments()[before..].to_vec()
            };
            if !fresh.is_empty() {
                log::debug!("{} new segments for {}", fresh.len(), session_id);
                shared.send(MonitorEvent::NewSegments { segments: fresh });
            }
        }
        Err(err) if err.is_not_found() => {
            // The session itself is gone. Forget it and look for whatever
            // replaced it, once, right now.
            log::info!("session {} disappeared, rediscovering", session_id);
            {
                let mut state = shared.state.lock().unwrap();
                state.reset();
            }
            *shared.session.lock().unwrap() = None;
            shared.flag.stop();
            shared.send(MonitorEvent::SessionLost {
                session_id: session_id.clone(),
            });
            discover(shared).await;
            return;
        }
        Err(err) => {
            // Transient: nothing local changes, the next tick retries
            log::warn!("segment fetch failed for {}: {}", session_id, err);
        }
    }

    check_termination(shared, &session).await;
}

/// One discovery attempt. On success the state is reset for the new
/// session and an initial speaker fetch is kicked off.
async fn discover(shared: &Arc<Shared>) -> Option<DiscoveredSession> {
    match discover_active(&shared.client).await {
        Ok(found) => {
            {
                let mut state = shared.state.lock().unwrap();
                state.reset();
            }
            *shared.session.lock().unwrap() = Some(found.clone());
            shared.flag.start();
            shared.send(MonitorEvent::Discovered {
                session: found.clone(),
            });
            if let Err(err) = shared
                .directory
                .refresh(&shared.client, found.session_id(), &shared.state)
                .await
            {
                log::warn!("initial speaker fetch failed: {}", err);
            }
            Some(found)
        }
        Err(err) => {
            log::warn!("session discovery failed: {}", err);
            shared.state.lock().unwrap().record_error(err.to_string());
            shared.send(MonitorEvent::ConnectionLost {
                message: err.to_string(),
            });
            None
        }
    }
}

/// Placeholder sessions have no bot; everything else gets a status check.
/// Transient status failures are ignored, terminal states and a 404 both
/// end the monitor.
async fn check_termination(shared: &Arc<Shared>, session: &DiscoveredSession) {
    if session.is_placeholder() || shared.ended.load(Ordering::SeqCst) {
        return;
    }
    let session_id = session.session_id();
    match shared.client.bot_status(session_id).await {
        Ok(response) => {
            if response.status.is_terminal() {
                let reason = if response.status == BotStatus::Error {
                    EndReason::Error {
                        message: response.error_message,
                    }
                } else {
                    EndReason::Completed
                };
                shared.finish(session_id, reason);
            } else {
                log::debug!("bot {} status {}", session_id, response.status.as_str());
            }
        }
        Err(err) if err.is_not_found() => {
            shared.finish(session_id, EndReason::Gone);
        }
        Err(err) => {
            log::debug!("bot status check failed for {}: {}", session_id, err);
        }
    }
}

async fn on_speaker_tick(shared: &Arc<Shared>) {
    let session = {
        let guard = shared.session.lock().unwrap();
        guard.clone()
    };
    let session = match session {
        Some(session) => session,
        None => return,
    };
    let before = shared.state.lock().unwrap().mapping().clone();
    match shared
        .directory
        .refresh(&shared.client, session.session_id(), &shared.state)
        .await
    {
        Ok(()) => {
            let after = shared.state.lock().unwrap().mapping().clone();
            if after != before {
                shared.send(MonitorEvent::SpeakersChanged { mapping: after });
            }
        }
        Err(err) => log::warn!("speaker fetch failed: {}", err),
    }
}

fn on_clock_tick(shared: &Arc<Shared>) {
    let elapsed = {
        let state = shared.state.lock().unwrap();
        state
            .session()
            .map(|info| clock::elapsed_display(&info.started_at, Utc::now()))
    };
    if let Some(elapsed) = elapsed {
        shared.send(MonitorEvent::Clock { elapsed });
    }
}
