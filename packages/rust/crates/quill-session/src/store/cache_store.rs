//! Typed per-session state on top of a [`SlotBackend`].

use std::sync::Arc;

use anyhow::{Context, Result};
use quill_window::{ConversationWindow, TurnPair};

use crate::observability::SessionEvent;

use super::SlotBackend;

/// Slot holding the checkpoint marker list (JSON array of positions).
pub const CACHE_MARKERS_SLOT: &str = "cache_markers";
/// Slot holding the window snapshot (JSON array of pairs).
pub const WINDOW_SLOT: &str = "window";

/// Checkpoint markers and window snapshots, keyed by session.
///
/// Reads are best effort: a missing, unreadable or undecodable slot is
/// treated as empty and logged. Writes report failures.
#[derive(Clone)]
pub struct SessionCacheStore {
    backend: Arc<dyn SlotBackend>,
}

impl SessionCacheStore {
    /// Store over `backend`.
    pub fn new(backend: Arc<dyn SlotBackend>) -> Self {
        Self { backend }
    }

    /// Name of the slot backend in use.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Persisted marker list, or an empty list.
    pub async fn load(&self, session_id: &str) -> Vec<usize> {
        let Some(raw) = self.read_slot(session_id, CACHE_MARKERS_SLOT).await else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<usize>>(&raw) {
            Ok(markers) => {
                tracing::debug!(
                    event = SessionEvent::CacheMarkersLoaded.as_str(),
                    session_id,
                    markers = ?markers,
                    backend = self.backend_name(),
                    "cache markers loaded"
                );
                markers
            }
            Err(error) => {
                tracing::warn!(
                    event = SessionEvent::CacheMarkersDecodeFailed.as_str(),
                    session_id,
                    error = %error,
                    "cache markers slot is not a position list; starting empty"
                );
                Vec::new()
            }
        }
    }

    /// Overwrite the marker list.
    ///
    /// # Errors
    ///
    /// Backend write failures.
    pub async fn save(&self, session_id: &str, markers: &[usize]) -> Result<()> {
        let payload = serde_json::to_string(markers).context("failed to encode cache markers")?;
        self.backend
            .set(session_id, CACHE_MARKERS_SLOT, payload)
            .await
            .with_context(|| format!("failed to save cache markers for session_id={session_id}"))?;
        tracing::debug!(
            event = SessionEvent::CacheMarkersSaved.as_str(),
            session_id,
            markers = ?markers,
            backend = self.backend_name(),
            "cache markers saved"
        );
        Ok(())
    }

    /// Persisted window rebuilt with `capacity`, or `None` when nothing usable
    /// is stored.
    pub async fn load_window(&self, session_id: &str, capacity: usize) -> Option<ConversationWindow> {
        let raw = self.read_slot(session_id, WINDOW_SLOT).await?;
        match serde_json::from_str::<Vec<TurnPair>>(&raw) {
            Ok(pairs) => {
                let window = ConversationWindow::from_pairs(capacity, pairs);
                tracing::debug!(
                    event = SessionEvent::StoreWindowLoaded.as_str(),
                    session_id,
                    pairs = window.len(),
                    backend = self.backend_name(),
                    "window snapshot loaded"
                );
                Some(window)
            }
            Err(error) => {
                tracing::warn!(
                    event = SessionEvent::StoreSlotReadFailed.as_str(),
                    session_id,
                    slot = WINDOW_SLOT,
                    error = %error,
                    "window snapshot is undecodable; ignoring"
                );
                None
            }
        }
    }

    /// Overwrite the window snapshot.
    ///
    /// # Errors
    ///
    /// Backend write failures.
    pub async fn save_window(&self, session_id: &str, window: &ConversationWindow) -> Result<()> {
        let payload =
            serde_json::to_string(&window.pairs()).context("failed to encode window snapshot")?;
        self.backend
            .set(session_id, WINDOW_SLOT, payload)
            .await
            .with_context(|| format!("failed to save window for session_id={session_id}"))?;
        tracing::debug!(
            event = SessionEvent::StoreWindowSaved.as_str(),
            session_id,
            pairs = window.len(),
            backend = self.backend_name(),
            "window snapshot saved"
        );
        Ok(())
    }

    /// Forget everything stored for a session.
    ///
    /// # Errors
    ///
    /// Backend failures.
    pub async fn clear(&self, session_id: &str) -> Result<()> {
        self.backend
            .clear(session_id)
            .await
            .with_context(|| format!("failed to clear slots for session_id={session_id}"))
    }

    async fn read_slot(&self, session_id: &str, slot: &str) -> Option<String> {
        match self.backend.get(session_id, slot).await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(
                    event = SessionEvent::StoreSlotReadFailed.as_str(),
                    session_id,
                    slot,
                    backend = self.backend_name(),
                    error = %format!("{error:#}"),
                    "slot read failed; treating as empty"
                );
                None
            }
        }
    }
}
