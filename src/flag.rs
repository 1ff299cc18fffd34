//! Shared "a live session is being watched" flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheap clonable flag other components can check without touching the
/// monitor itself (status lines, prompt decorations, shutdown hooks).
///
/// The monitor owns one and keeps it in step with the session lifecycle;
/// consumers get clones via `MonitorHandle::live_flag`.
#[derive(Debug, Clone, Default)]
pub struct LiveFlag {
    inner: Arc<AtomicBool>,
}

impl LiveFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.inner.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}
