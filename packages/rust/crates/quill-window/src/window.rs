//! Conversation window: bounded ring buffer of `TurnPair`s.

use std::collections::{HashSet, VecDeque};

use quill_types::Message;

use crate::TurnPair;

/// Window counters for logs and UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowStats {
    /// Pairs currently held.
    pub pairs: usize,
    /// Turns currently held (`2 * pairs`).
    pub turns: usize,
    /// Pairs appended over the window's lifetime.
    pub total_appended: u64,
    /// Pairs evicted over the window's lifetime.
    pub total_evicted: u64,
}

/// Bounded window of the most recent pairs. O(1) append, drops the oldest
/// pair when over capacity.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    ring: VecDeque<TurnPair>,
    capacity: usize,
    total_appended: u64,
    total_evicted: u64,
}

impl ConversationWindow {
    /// Create a window holding at most `capacity` pairs (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            total_appended: 0,
            total_evicted: 0,
        }
    }

    /// Rebuild a window from a persisted snapshot. Only the newest
    /// `capacity` pairs are kept.
    #[must_use]
    pub fn from_pairs(capacity: usize, pairs: impl IntoIterator<Item = TurnPair>) -> Self {
        let mut window = Self::new(capacity);
        for pair in pairs {
            window.push_pair(pair);
        }
        window
    }

    /// Append one completed exchange, evicting the oldest pair first when full.
    ///
    /// # Panics
    ///
    /// Panics if the roles are not (user, assistant).
    pub fn append(&mut self, user: Message, assistant: Message) {
        self.push_pair(TurnPair::new(user, assistant));
    }

    /// Append a pre-built pair.
    pub fn push_pair(&mut self, pair: TurnPair) {
        if self.ring.len() >= self.capacity {
            self.evict_oldest();
        }
        self.ring.push_back(pair);
        self.total_appended += 1;
        debug_assert!(self.ring.len() <= self.capacity);
    }

    fn evict_oldest(&mut self) -> TurnPair {
        let Some(dropped) = self.ring.pop_front() else {
            panic!("evict called on an empty window");
        };
        self.total_evicted += 1;
        log::debug!(
            "window evicted oldest pair (capacity={}, evicted_total={})",
            self.capacity,
            self.total_evicted
        );
        dropped
    }

    /// Current pairs flattened to turns, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.ring.len() * 2);
        for pair in &self.ring {
            out.push(pair.user.clone());
            out.push(pair.assistant.clone());
        }
        out
    }

    /// Snapshot of the current pairs, oldest first.
    #[must_use]
    pub fn pairs(&self) -> Vec<TurnPair> {
        self.ring.iter().cloned().collect()
    }

    /// Trimmed, non-empty text lines of every turn in the window.
    #[must_use]
    pub fn lines(&self) -> HashSet<String> {
        self.ring
            .iter()
            .flat_map(|pair| [pair.user.text(), pair.assistant.text()])
            .flat_map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Number of pairs held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Whether the window holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Capacity in pairs.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Counters for logs and UI.
    #[must_use]
    pub fn stats(&self) -> WindowStats {
        WindowStats {
            pairs: self.ring.len(),
            turns: self.ring.len() * 2,
            total_appended: self.total_appended,
            total_evicted: self.total_evicted,
        }
    }

    /// Drop all pairs. Lifetime counters are kept.
    pub fn clear(&mut self) {
        self.ring.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "evict called on an empty window")]
    fn evict_on_empty_window_fails_loudly() {
        let mut window = ConversationWindow::new(1);
        let _ = window.evict_oldest();
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let window = ConversationWindow::new(0);
        assert_eq!(window.capacity(), 1);
    }
}
