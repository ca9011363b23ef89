//! Per-session checkpoint positions.

use serde::{Deserialize, Serialize};

/// Ordered checkpoint positions, oldest first. One per session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheState {
    markers: Vec<usize>,
}

impl CacheState {
    /// Empty state, as at session start.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing marker list.
    #[must_use]
    pub fn from_markers(markers: Vec<usize>) -> Self {
        Self { markers }
    }

    /// Current markers.
    #[must_use]
    pub fn markers(&self) -> &[usize] {
        &self.markers
    }

    /// Most recent marker.
    #[must_use]
    pub fn latest(&self) -> Option<usize> {
        self.markers.last().copied()
    }

    /// Replace the marker list.
    pub fn replace(&mut self, markers: Vec<usize>) {
        self.markers = markers;
    }

    /// Forget all markers.
    pub fn reset(&mut self) {
        self.markers.clear();
    }
}
