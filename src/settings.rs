use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bot::JOIN_POLL_INTERVAL;
use crate::live::{MonitorConfig, CLOCK_TICK, SEGMENT_POLL_INTERVAL, SPEAKER_POLL_INTERVAL};

/// Environment variable that overrides the configured backend URL.
pub const API_URL_ENV: &str = "MEETWATCH_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_segment_poll_ms")]
    pub segment_poll_ms: u64,
    #[serde(default = "default_speaker_poll_ms")]
    pub speaker_poll_ms: u64,
    #[serde(default = "default_clock_tick_ms")]
    pub clock_tick_ms: u64,
    #[serde(default = "default_join_poll_ms")]
    pub join_poll_ms: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_segment_poll_ms() -> u64 {
    SEGMENT_POLL_INTERVAL.as_millis() as u64
}

fn default_speaker_poll_ms() -> u64 {
    SPEAKER_POLL_INTERVAL.as_millis() as u64
}

fn default_clock_tick_ms() -> u64 {
    CLOCK_TICK.as_millis() as u64
}

fn default_join_poll_ms() -> u64 {
    JOIN_POLL_INTERVAL.as_millis() as u64
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_base_url: default_api_base_url(),
            segment_poll_ms: default_segment_poll_ms(),
            speaker_poll_ms: default_speaker_poll_ms(),
            clock_tick_ms: default_clock_tick_ms(),
            join_poll_ms: default_join_poll_ms(),
        }
    }
}

impl Settings {
    /// Load settings from the default config path, then apply the
    /// environment override. Missing or unparseable config falls back to
    /// defaults rather than failing startup.
    pub fn load() -> Settings {
        let settings = match config_path() {
            Some(path) => Settings::load_from(&path),
            None => Settings::default(),
        };
        settings.with_api_url_override(std::env::var(API_URL_ENV).ok())
    }

    /// Load from an explicit path, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Settings {
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<Settings>(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("failed to parse {}: {}, using defaults", path.display(), e);
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    fn with_api_url_override(mut self, url: Option<String>) -> Settings {
        if let Some(url) = url {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        self
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            segment_poll: floor_ms(self.segment_poll_ms),
            speaker_poll: floor_ms(self.speaker_poll_ms),
            clock_tick: floor_ms(self.clock_tick_ms),
        }
    }

    pub fn join_poll(&self) -> Duration {
        floor_ms(self.join_poll_ms)
    }
}

/// `tokio::time::interval` panics on a zero period, so configured cadences
/// get a 1 ms floor.
fn floor_ms(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}

/// `<config dir>/meetwatch/config.toml`, e.g. `~/.config/meetwatch/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("meetwatch").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.toml"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.api_base_url, "http://localhost:8000");
    }

    #[test]
    fn partial_config_keeps_defaults_for_the_rest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_base_url = \"http://10.0.0.5:9000\"\n").unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.api_base_url, "http://10.0.0.5:9000");
        assert_eq!(settings.segment_poll_ms, 1000);
        assert_eq!(settings.speaker_poll_ms, 5000);
    }

    #[test]
    fn garbage_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not toml [[[").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn env_override_wins_when_set_and_nonempty() {
        let settings = Settings::default()
            .with_api_url_override(Some("http://other:8000".to_string()));
        assert_eq!(settings.api_base_url, "http://other:8000");

        let settings = Settings::default().with_api_url_override(Some("  ".to_string()));
        assert_eq!(settings.api_base_url, "http://localhost:8000");

        let settings = Settings::default().with_api_url_override(None);
        assert_eq!(settings.api_base_url, "http://localhost:8000");
    }

    #[test]
    fn durations_come_from_millis() {
        let settings = Settings {
            segment_poll_ms: 50,
            speaker_poll_ms: 75,
            clock_tick_ms: 10,
            join_poll_ms: 20,
            ..Settings::default()
        };
        let config = settings.monitor_config();
        assert_eq!(config.segment_poll, Duration::from_millis(50));
        assert_eq!(config.speaker_poll, Duration::from_millis(75));
        assert_eq!(config.clock_tick, Duration::from_millis(10));
        assert_eq!(settings.join_poll(), Duration::from_millis(20));
    }

    #[test]
    fn zero_intervals_are_floored() {
        let settings = Settings {
            segment_poll_ms: 0,
            speaker_poll_ms: 0,
            clock_tick_ms: 0,
            join_poll_ms: 0,
            ..Settings::default()
        };
        let config = settings.monitor_config();
        assert_eq!(config.segment_poll, Duration::from_millis(1));
        assert_eq!(config.speaker_poll, Duration::from_millis(1));
        assert_eq!(config.clock_tick, Duration::from_millis(1));
        assert_eq!(settings.join_poll(), Duration::from_millis(1));
    }

    #[test]
    fn defaults_match_reference_cadences() {
        let config = Settings::default().monitor_config();
        assert_eq!(config.segment_poll, SEGMENT_POLL_INTERVAL);
        assert_eq!(config.speaker_poll, SPEAKER_POLL_INTERVAL);
        assert_eq!(config.clock_tick, CLOCK_TICK);
        assert_eq!(Settings::default().join_poll(), JOIN_POLL_INTERVAL);
    }
}
