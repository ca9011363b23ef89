//! Prompt assembly inputs and output.

use quill_cache::{ProviderBackend, RenderedRequest, render_request};
use quill_types::{ContentSegment, Message};

/// One user submission plus host-supplied attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInput {
    /// What the user typed.
    pub text: String,
    /// Extracted text of an attached document, wrapped in `<context>`.
    pub document_context: Option<String>,
    /// Attached image segment, appended after the text.
    pub image: Option<ContentSegment>,
}

impl UserInput {
    /// Plain text input.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attach extracted document text.
    #[must_use]
    pub fn with_document_context(mut self, context: impl Into<String>) -> Self {
        self.document_context = Some(context.into());
        self
    }

    /// Attach an image segment.
    #[must_use]
    pub fn with_image(mut self, image: ContentSegment) -> Self {
        self.image = Some(image);
        self
    }
}

/// Everything the model adapter receives for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    /// System instruction, always carrying a checkpoint.
    pub system: Message,
    /// Annotated window history followed by the new user message.
    pub messages: Vec<Message>,
}

impl AssembledPrompt {
    /// The user message being answered.
    #[must_use]
    pub fn user_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Checkpoints across the system message and history.
    #[must_use]
    pub fn checkpoint_count(&self) -> usize {
        std::iter::once(&self.system)
            .chain(&self.messages)
            .map(|m| m.content.cache_point_count())
            .sum()
    }

    /// Provider wire body.
    #[must_use]
    pub fn render(&self, backend: ProviderBackend) -> RenderedRequest {
        let mut all = Vec::with_capacity(self.messages.len() + 1);
        all.push(self.system.clone());
        all.extend(self.messages.iter().cloned());
        render_request(&all, backend)
    }
}

/// User message text: optional `<relevant_history>` and `<context>` blocks,
/// then the user's text, separated by blank lines.
pub(crate) fn compose_user_text(relevant: &str, document_context: Option<&str>, text: &str) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if !relevant.trim().is_empty() {
        parts.push(format!("<relevant_history>{relevant}</relevant_history>"));
    }
    if let Some(context) = document_context.filter(|c| !c.is_empty()) {
        parts.push(format!("<context>{context}</context>"));
    }
    parts.push(text.to_string());
    parts.join("\n\n")
}

pub(crate) fn build_user_message(input: &UserInput, relevant: &str) -> Message {
    let text = compose_user_text(relevant, input.document_context.as_deref(), &input.text);
    match &input.image {
        Some(image) => Message::user(vec![ContentSegment::text(text), image.clone()]),
        None => Message::user(text),
    }
}
