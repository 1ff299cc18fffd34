//! Live session watching: discovery, polling, speaker mapping, termination.

pub mod clock;
pub mod discovery;
pub mod monitor;
pub mod speakers;
pub mod state;

use std::time::Duration;

pub use discovery::DiscoveredSession;
pub use monitor::{EndReason, LiveMonitor, MonitorConfig, MonitorEvent, MonitorHandle};
pub use state::LiveViewState;

/// Session id used when nothing real is running.
pub const DEMO_SESSION_ID: &str = "demo-session";
/// Meeting id baked into the placeholder session.
pub const DEMO_MEETING_ID: &str = "demo123";
/// Topic baked into the placeholder session.
pub const DEMO_MEETING_TOPIC: &str = "デモ会議";

/// How often new segments are pulled.
pub const SEGMENT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// How often the speaker roster and mapping are refreshed.
pub const SPEAKER_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// How often the elapsed clock is re-rendered.
pub const CLOCK_TICK: Duration = Duration::from_secs(1);
