//! Speaker label mapping: periodic refresh plus the save-and-invalidate flow.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::api::{ApiClient, Result};
use crate::live::state::LiveViewState;

/// Coordinates the speaker mapping between backend and view state.
///
/// Saving replaces the whole mapping server-side. Because the backend bakes
/// speaker names into segments as it renders them, a successful save also
/// invalidates the local transcript so the next fetch re-pulls every segment
/// with the new names applied.
#[derive(Debug, Default)]
pub struct SpeakerDirectory {
    saving: AtomicBool,
}

impl SpeakerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a save round-trip is in flight.
    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Fetch the current roster and mapping into `state`.
    pub async fn refresh(
        &self,
        client: &ApiClient,
        session_id: &str,
        state: &Mutex<LiveViewState>,
    ) -> Result<()> {
        let response = client.fetch_speakers(session_id).await?;
        state.lock().unwrap().apply_speakers(response);
        Ok(())
    }

    /// Persist `mapping` as the session's complete speaker mapping.
    ///
    /// On success the transcript buffer and cursor are dropped and both
    /// segments and speakers are refetched immediately, so callers see the
    /// renamed transcript as soon as this returns. On failure nothing
    /// local changes; the error is returned for the caller to surface.
    pub async fn save(
        &self,
        client: &ApiClient,
        session_id: &str,
        mapping: &HashMap<String, String>,
        state: &Mutex<LiveViewState>,
    ) -> Result<()> {
        self.saving.store(true, Ordering::SeqCst);
        let result = self.save_inner(client, session_id, mapping, state).await;
        self.saving.store(false, Ordering::SeqCst);
        result
    }

    async fn save_inner(
        &self,
        client: &ApiClient,
        session_id: &str,
        mapping: &HashMap<String, String>,
        state: &Mutex<LiveViewState>,
    ) -> Result<()> {
        client.save_speaker_mapping(session_id, mapping).await?;
        log::info!(
            "saved speaker mapping for {} ({} entries)",
            session_id,
            mapping.len()
        );

        state.lock().unwrap().invalidate_segments();

        // Full refetch with a cleared cursor so old segments come back
        // re-rendered under the new names.
        let segments = client.fetch_segments(session_id, None).await?;
        state.lock().unwrap().apply_segments(segments);
        self.refresh(client, session_id, state).await?;
        Ok(())
    }
}
