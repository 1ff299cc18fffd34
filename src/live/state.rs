//! In-memory view of one live session.
//!
//! The pollers feed raw responses in here; consumers read a consistent
//! picture out: ordered transcript, speaker names, connection health.

use std::collections::{HashMap, HashSet};

use crate::api::types::{
    SegmentsResponse, SessionInfo, SpeakerInfo, SpeakersResponse, TranscriptSegment,
};

/// Accumulated state for the session currently being watched.
///
/// Segments are kept in arrival order and deduplicated by id, so an
/// overlapping poll batch never produces repeated lines. The cursor tracks
/// the id of the last segment the backend sent, whether or not it was new
/// to us; the backend's segment log is append-only, so re-sent ids always
/// sit at the overlap boundary.
#[derive(Debug, Default)]
pub struct LiveViewState {
    session: Option<SessionInfo>,
    segments: Vec<TranscriptSegment>,
    seen_ids: HashSet<String>,
    cursor: Option<String>,
    speakers: Vec<SpeakerInfo>,
    mapping: HashMap<String, String>,
    connected: bool,
    last_error: Option<String>,
}

impl LiveViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one poll batch: append unseen segments, refresh the session
    /// snapshot, advance the cursor. Returns how many segments were new.
    pub fn apply_segments(&mut self, response: SegmentsResponse) -> usize {
        self.session = Some(response.session);
        let mut appended = 0;
        for segment in response.segments {
            let id = segment.id.clone();
            if self.seen_ids.insert(id.clone()) {
                self.segments.push(segment);
                appended += 1;
            }
            // Even an all-duplicate batch moves the cursor: the backend
            // answered for everything up to this id.
            self.cursor = Some(id);
        }
        self.connected = true;
        self.last_error = None;
        appended
    }

    /// Replace the speaker roster and mapping wholesale.
    pub fn apply_speakers(&mut self, response: SpeakersResponse) {
        self.speakers = response.speakers;
        self.mapping = response.mapping;
    }

    /// Drop the transcript buffer and cursor so the next poll refetches
    /// everything. Used after a mapping save: old segments carry stale
    /// speaker names and the backend re-renders them on the full fetch.
    pub fn invalidate_segments(&mut self) {
        self.segments.clear();
        self.seen_ids.clear();
        self.cursor = None;
    }

    /// Forget the session entirely. Used when the watched session ends or
    /// the monitor switches to a different one.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.connected = false;
        self.last_error = Some(message.into());
    }

    // ===== Read side =====

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn speakers(&self) -> &[SpeakerInfo] {
        &self.speakers
    }

    pub fn mapping(&self) -> &HashMap<String, String> {
        &self.mapping
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Resolve a raw speaker label through the mapping, falling back to the
    /// label itself when nobody has named it yet.
    pub fn display_name<'a>(&'a self, speaker: &'a str) -> &'a str {
        self.mapping
            .get(speaker)
            .map(String::as_str)
            .unwrap_or(speaker)
    }
}
