//! Rebuild pairs from a host-persisted transcript.

use quill_types::{Message, Role};
use serde::{Deserialize, Serialize};

use crate::TurnPair;

/// Step type recorded by the host transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptEntryKind {
    /// Message typed by the user.
    UserMessage,
    /// Message produced by the assistant.
    AssistantMessage,
    /// Anything else (tool runs, system notices, ...).
    #[serde(other)]
    Other,
}

/// Per-entry metadata set by collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    /// Entry must never re-enter model context (welcome text, `/save` commands, ...).
    #[serde(default)]
    pub exclude_from_history: bool,
}

/// One persisted transcript step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Step type.
    #[serde(rename = "type")]
    pub kind: TranscriptEntryKind,
    /// Rendered text of the step.
    #[serde(default)]
    pub output: String,
    /// Step ended in an error.
    #[serde(default, alias = "isError")]
    pub is_error: bool,
    /// Collaborator metadata.
    #[serde(default)]
    pub metadata: TranscriptMetadata,
}

impl TranscriptEntry {
    /// User entry.
    #[must_use]
    pub fn user(output: &str) -> Self {
        Self::of_kind(TranscriptEntryKind::UserMessage, output)
    }

    /// Assistant entry.
    #[must_use]
    pub fn assistant(output: &str) -> Self {
        Self::of_kind(TranscriptEntryKind::AssistantMessage, output)
    }

    fn of_kind(kind: TranscriptEntryKind, output: &str) -> Self {
        Self {
            kind,
            output: output.to_string(),
            is_error: false,
            metadata: TranscriptMetadata::default(),
        }
    }

    /// Mark as an error step.
    #[must_use]
    pub fn errored(mut self) -> Self {
        self.is_error = true;
        self
    }

    /// Mark as excluded from history.
    #[must_use]
    pub fn excluded(mut self) -> Self {
        self.metadata.exclude_from_history = true;
        self
    }

    fn into_message(self) -> Option<Message> {
        if self.metadata.exclude_from_history || self.output.is_empty() || self.is_error {
            return None;
        }
        match self.kind {
            TranscriptEntryKind::UserMessage => Some(Message::user(self.output)),
            TranscriptEntryKind::AssistantMessage => Some(Message::assistant(self.output)),
            TranscriptEntryKind::Other => None,
        }
    }
}

/// Filter a transcript and pair the surviving turns.
///
/// Excluded, empty, errored and unknown-type entries are dropped. The rest
/// are walked in strides of two; a stride becomes a pair only if it is
/// exactly (user, assistant). Other strides and a trailing odd turn are
/// dropped without error.
#[must_use]
pub fn restore_turns(entries: impl IntoIterator<Item = TranscriptEntry>) -> Vec<TurnPair> {
    let mut skipped = 0_usize;
    let turns: Vec<Message> = entries
        .into_iter()
        .filter_map(|entry| {
            let message = entry.into_message();
            if message.is_none() {
                skipped += 1;
            }
            message
        })
        .collect();

    let pairs: Vec<TurnPair> = turns
        .chunks(2)
        .filter_map(|chunk| match chunk {
            [user, assistant] if user.role == Role::User && assistant.role == Role::Assistant => {
                Some(TurnPair::new(user.clone(), assistant.clone()))
            }
            _ => None,
        })
        .collect();

    log::debug!(
        "restored transcript: turns={} pairs={} skipped_entries={}",
        turns.len(),
        pairs.len(),
        skipped
    );
    pairs
}
