//! Message content: plain text or a list of typed segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One segment of a multi-segment message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    /// Text block.
    Text {
        /// The text itself.
        text: String,
    },
    /// Inline image (base64 payload).
    Image {
        /// MIME type, e.g. `image/png`.
        media_type: String,
        /// Base64-encoded bytes.
        data: String,
    },
    /// Checkpoint boundary: the backend may reuse everything up to here.
    CachePoint,
}

impl ContentSegment {
    /// Build a text segment.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text carried by this segment, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Image { .. } | Self::CachePoint => None,
        }
    }

    /// Whether this is a checkpoint segment.
    #[must_use]
    pub fn is_cache_point(&self) -> bool {
        matches!(self, Self::CachePoint)
    }
}

/// Message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain string content.
    Text(String),
    /// Structured multimodal content.
    Segments(Vec<ContentSegment>),
}

impl MessageContent {
    /// Text-bearing content only. Segments are concatenated without separator;
    /// images and checkpoints contribute nothing.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Segments(segments) => segments
                .iter()
                .filter_map(ContentSegment::as_text)
                .collect(),
        }
    }

    /// True when there is no text and no non-text segment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Segments(segments) => segments.is_empty(),
        }
    }

    /// Number of checkpoint segments present.
    #[must_use]
    pub fn cache_point_count(&self) -> usize {
        match self {
            Self::Text(_) => 0,
            Self::Segments(segments) => segments.iter().filter(|s| s.is_cache_point()).count(),
        }
    }

    /// Append a checkpoint, converting plain text into `[Text, CachePoint]` first.
    pub fn push_cache_point(&mut self) {
        match self {
            Self::Text(text) => {
                let text = std::mem::take(text);
                *self = Self::Segments(vec![ContentSegment::text(text), ContentSegment::CachePoint]);
            }
            Self::Segments(segments) => segments.push(ContentSegment::CachePoint),
        }
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<ContentSegment>> for MessageContent {
    fn from(value: Vec<ContentSegment>) -> Self {
        Self::Segments(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_skips_non_text_segments() {
        let content = MessageContent::Segments(vec![
            ContentSegment::text("a"),
            ContentSegment::Image {
                media_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            },
            ContentSegment::CachePoint,
            ContentSegment::text("b"),
        ]);
        assert_eq!(content.text(), "ab");
    }

    #[test]
    fn push_cache_point_converts_plain_text() {
        let mut content = MessageContent::from("hello");
        content.push_cache_point();
        assert_eq!(
            content,
            MessageContent::Segments(vec![
                ContentSegment::text("hello"),
                ContentSegment::CachePoint
            ])
        );
        assert_eq!(content.cache_point_count(), 1);
    }
}
