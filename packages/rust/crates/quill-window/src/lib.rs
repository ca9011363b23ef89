//! quill-window: bounded conversation window.
//!
//! Ring buffer of completed (user, assistant) pairs. Eviction always removes
//! a whole pair, so the flattened history has even length and alternates
//! user/assistant starting with a user turn.

mod restore;
mod turn_pair;
mod window;

pub use restore::{TranscriptEntry, TranscriptEntryKind, TranscriptMetadata, restore_turns};
pub use turn_pair::TurnPair;
pub use window::{ConversationWindow, WindowStats};
