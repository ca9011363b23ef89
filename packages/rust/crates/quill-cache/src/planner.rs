//! Checkpoint planner: when and where to place cache markers.

use std::sync::Arc;

use quill_tokenizer::{Cl100kCounter, TokenCounter};
use quill_types::Message;

/// Tokens that must accumulate after the last marker before a new one.
pub const MIN_TOKENS_FOR_CACHE: usize = 2000;

/// Markers kept per session. The provider allows one more checkpoint, which
/// is spent on the system message.
pub const MAX_CACHE_MARKERS: usize = 3;

/// Decides checkpoint placement and renders markers into history copies.
#[derive(Clone)]
pub struct CheckpointPlanner {
    counter: Arc<dyn TokenCounter>,
    min_tokens: usize,
    max_markers: usize,
}

impl std::fmt::Debug for CheckpointPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointPlanner")
            .field("min_tokens", &self.min_tokens)
            .field("max_markers", &self.max_markers)
            .finish_non_exhaustive()
    }
}

impl Default for CheckpointPlanner {
    fn default() -> Self {
        Self::new(Arc::new(Cl100kCounter))
    }
}

impl CheckpointPlanner {
    /// Planner with the production limits and the given counter.
    #[must_use]
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self::with_limits(counter, MIN_TOKENS_FOR_CACHE, MAX_CACHE_MARKERS)
    }

    /// Planner with explicit limits. `max_markers` is clamped to at least 1.
    #[must_use]
    pub fn with_limits(counter: Arc<dyn TokenCounter>, min_tokens: usize, max_markers: usize) -> Self {
        Self {
            counter,
            min_tokens,
            max_markers: max_markers.max(1),
        }
    }

    /// Token threshold.
    #[must_use]
    pub fn min_tokens(&self) -> usize {
        self.min_tokens
    }

    /// Marker capacity.
    #[must_use]
    pub fn max_markers(&self) -> usize {
        self.max_markers
    }

    /// Estimated tokens of the text-bearing content from the last marker
    /// (inclusive) to the end of `history`. No markers means from the start.
    #[must_use]
    pub fn tokens_since_last_marker(&self, markers: &[usize], history: &[Message]) -> usize {
        let last = markers.last().copied().unwrap_or(0);
        history
            .iter()
            .enumerate()
            .skip(last)
            .map(|(index, message)| {
                let tokens = self.counter.count(&message.text());
                log::trace!("message token count: index={index} tokens={tokens}");
                tokens
            })
            .sum()
    }

    /// Whether enough text has accumulated since the last marker.
    #[must_use]
    pub fn should_mark(&self, markers: &[usize], history: &[Message]) -> bool {
        let total = self.tokens_since_last_marker(markers, history);
        let last = markers.last().copied().unwrap_or(0);
        let decision = total >= self.min_tokens;
        log::debug!(
            "tokens since last cache point: total={total} last_index={last} min={} mark={decision}",
            self.min_tokens
        );
        decision
    }

    /// Append `index` and keep only the newest `max_markers` entries.
    /// Duplicates are not collapsed.
    #[must_use]
    pub fn add_marker(&self, index: usize, markers: &[usize]) -> Vec<usize> {
        let mut next = Vec::with_capacity(markers.len() + 1);
        next.extend_from_slice(markers);
        next.push(index);
        let overflow = next.len().saturating_sub(self.max_markers);
        next.drain(..overflow);
        log::info!(
            "created cache point: index={index} dropped={overflow} total={}",
            next.len()
        );
        next
    }

    /// Copy of `history` with a checkpoint segment appended to every message
    /// whose position is in `markers`. `history` is not modified.
    ///
    /// Positions at or beyond `history.len()` match nothing and are ignored.
    /// Such positions arise when window eviction has shortened or shifted the
    /// history since the marker was placed; the checkpoint is then lost.
    #[must_use]
    pub fn apply_markers(&self, markers: &[usize], history: &[Message]) -> Vec<Message> {
        let stale = markers.iter().filter(|m| **m >= history.len()).count();
        if stale > 0 {
            log::debug!(
                "ignoring {stale} cache marker(s) beyond history length {}",
                history.len()
            );
        }
        history
            .iter()
            .enumerate()
            .map(|(index, message)| {
                if markers.contains(&index) {
                    message.with_cache_point()
                } else {
                    message.clone()
                }
            })
            .collect()
    }

    /// Place a marker on the last message of `history` if the budget is met.
    ///
    /// Returns the updated marker list, or `None` when history is empty or
    /// the threshold is not reached.
    #[must_use]
    pub fn plan_latest(&self, markers: &[usize], history: &[Message]) -> Option<Vec<usize>> {
        if history.is_empty() {
            log::debug!("no history, skipping cache point creation");
            return None;
        }
        if !self.should_mark(markers, history) {
            return None;
        }
        Some(self.add_marker(history.len() - 1, markers))
    }
}
