//! Provider wire shapes for annotated message lists.
//!
//! The planner works on provider-neutral [`ContentSegment::CachePoint`]
//! segments. Each provider spells a checkpoint differently:
//!
//! - Bedrock Converse: a standalone `{"cachePoint": {"type": "default"}}` block.
//! - Anthropic Messages: `"cache_control": {"type": "ephemeral"}` on the block
//!   the checkpoint follows.

use quill_types::{ContentSegment, Message, Role};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Model provider the request is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderBackend {
    /// AWS Bedrock Converse API.
    #[default]
    Bedrock,
    /// Anthropic Messages API.
    Anthropic,
}

impl ProviderBackend {
    /// Parse a settings value; unknown values yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bedrock" | "aws" => Some(Self::Bedrock),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bedrock => "bedrock",
            Self::Anthropic => "anthropic",
        }
    }
}

/// Request body fragments: system blocks and conversation messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedRequest {
    /// System content blocks (all system messages, in order).
    pub system: Vec<Value>,
    /// Non-system messages.
    pub messages: Vec<Value>,
}

/// Render `messages` for `backend`. System messages are lifted into
/// [`RenderedRequest::system`].
#[must_use]
pub fn render_request(messages: &[Message], backend: ProviderBackend) -> RenderedRequest {
    let mut rendered = RenderedRequest::default();
    for message in messages {
        let blocks = render_blocks(&message.segments(), backend);
        if message.role == Role::System {
            rendered.system.extend(blocks);
        } else {
            rendered.messages.push(json!({
                "role": message.role.as_str(),
                "content": blocks,
            }));
        }
    }
    rendered
}

fn render_blocks(segments: &[ContentSegment], backend: ProviderBackend) -> Vec<Value> {
    let mut blocks: Vec<Value> = Vec::with_capacity(segments.len());
    for segment in segments {
        match (backend, segment) {
            (ProviderBackend::Bedrock, ContentSegment::Text { text }) => {
                blocks.push(json!({ "text": text }));
            }
            (ProviderBackend::Bedrock, ContentSegment::Image { media_type, data }) => {
                let format = media_type.strip_prefix("image/").unwrap_or(media_type.as_str());
                blocks.push(json!({
                    "image": { "format": format, "source": { "bytes": data } }
                }));
            }
            (ProviderBackend::Bedrock, ContentSegment::CachePoint) => {
                blocks.push(json!({ "cachePoint": { "type": "default" } }));
            }
            (ProviderBackend::Anthropic, ContentSegment::Text { text }) => {
                blocks.push(json!({ "type": "text", "text": text }));
            }
            (ProviderBackend::Anthropic, ContentSegment::Image { media_type, data }) => {
                blocks.push(json!({
                    "type": "image",
                    "source": { "type": "base64", "media_type": media_type, "data": data }
                }));
            }
            (ProviderBackend::Anthropic, ContentSegment::CachePoint) => {
                match blocks.last_mut().and_then(Value::as_object_mut) {
                    Some(previous) => {
                        previous.insert(
                            "cache_control".to_string(),
                            json!({ "type": "ephemeral" }),
                        );
                    }
                    None => log::debug!("dropping checkpoint with no preceding block"),
                }
            }
        }
    }
    blocks
}
