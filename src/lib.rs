//! Headless client for a meeting-bot transcription backend.
//!
//! The crate watches whatever session the backend considers active and keeps
//! a local, deduplicated view of its transcript current:
//!
//! - [`live::LiveMonitor`] discovers a session (bot first, then live, then a
//!   placeholder), polls segments and speakers on independent cadences, and
//!   notices when the session ends.
//! - [`api::ApiClient`] is the typed HTTP surface underneath it.
//! - [`bot`] dispatches a recording bot into a meeting and tracks its join
//!   progress.
//!
//! Consumers either subscribe to the [`live::MonitorEvent`] stream or read
//! snapshots through the [`live::MonitorHandle`] getters.

pub mod api;
pub mod bot;
pub mod flag;
pub mod live;
pub mod settings;

pub use api::{ApiClient, ApiError};
pub use flag::LiveFlag;
pub use live::{DiscoveredSession, LiveMonitor, MonitorConfig, MonitorEvent, MonitorHandle};
pub use settings::Settings;
