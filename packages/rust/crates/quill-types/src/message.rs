//! Conversation messages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::content::{ContentSegment, MessageContent};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction (only in assembled prompts, never in the window).
    System,
    /// End user.
    User,
    /// Model response.
    Assistant,
}

impl Role {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message. Treated as immutable once it is part of a history; annotation
/// always happens on copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Payload.
    pub content: MessageContent,
}

impl Message {
    /// Build a message from any content.
    #[must_use]
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// System message.
    #[must_use]
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    /// User message.
    #[must_use]
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    /// Assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Text-bearing content (see [`MessageContent::text`]).
    #[must_use]
    pub fn text(&self) -> String {
        self.content.text()
    }

    /// Copy of this message with a checkpoint segment appended.
    #[must_use]
    pub fn with_cache_point(&self) -> Self {
        let mut copy = self.clone();
        copy.content.push_cache_point();
        copy
    }

    /// Whether any segment of this message is a checkpoint.
    #[must_use]
    pub fn has_cache_point(&self) -> bool {
        self.content.cache_point_count() > 0
    }

    /// Segments view; plain text is returned as a single text segment.
    #[must_use]
    pub fn segments(&self) -> Vec<ContentSegment> {
        match &self.content {
            MessageContent::Text(text) => vec![ContentSegment::text(text.clone())],
            MessageContent::Segments(segments) => segments.clone(),
        }
    }
}
