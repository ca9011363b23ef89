//! One completed exchange in the window.

use quill_types::{Message, Role};
use serde::{Deserialize, Serialize};

/// A user turn and the assistant turn that answered it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPair {
    /// The user turn.
    pub user: Message,
    /// The assistant turn.
    pub assistant: Message,
}

impl TurnPair {
    /// Build a pair, asserting the roles.
    ///
    /// # Panics
    ///
    /// Panics if `user` is not a user message or `assistant` is not an
    /// assistant message. Callers construct pairs from known roles.
    #[must_use]
    pub fn new(user: Message, assistant: Message) -> Self {
        assert_eq!(user.role, Role::User, "pair must start with a user turn");
        assert_eq!(
            assistant.role,
            Role::Assistant,
            "pair must end with an assistant turn"
        );
        Self { user, assistant }
    }

    /// Build a pair from plain text.
    #[must_use]
    pub fn from_text(user: &str, assistant: &str) -> Self {
        Self::new(Message::user(user), Message::assistant(assistant))
    }
}
