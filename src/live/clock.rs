//! Elapsed-time display for a running session.
//!
//! Backend timestamps frequently arrive without a timezone suffix even though
//! they are UTC wall-clock times. Parsing here assumes UTC for such values so
//! the elapsed counter never jumps by the host's UTC offset.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a session start timestamp, assuming UTC when no zone is given.
pub fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Zone-qualified values pass through untouched; bare ones get a Z.
    let normalized = if trimmed.ends_with('Z') || trimmed.contains('+') {
        trimmed.to_string()
    } else {
        format!("{}Z", trimmed)
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Some backends emit a space separator instead of 'T'
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Whole seconds between `start` and `now`, clamped at zero.
pub fn elapsed_seconds(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - start).num_seconds().max(0)
}

/// Format a second count as zero-padded `HH:MM:SS`.
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// One-shot display string for a raw start timestamp.
///
/// Unparseable input or a start in the future both render as `00:00:00`;
/// the counter ticks up normally once the clock catches up.
pub fn elapsed_display(start_raw: &str, now: DateTime<Utc>) -> String {
    match parse_start_time(start_raw) {
        Some(start) => format_elapsed(elapsed_seconds(start, now)),
        None => "00:00:00".to_string(),
    }
}
