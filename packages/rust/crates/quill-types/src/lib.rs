//! quill-types - shared message model for the conversation core.
//!
//! A [`Message`] is one turn of a conversation: a [`Role`] plus either plain
//! text or a list of [`ContentSegment`]s. Checkpoint annotations are modelled
//! as a dedicated segment so that provider-specific wire formats are decided
//! at the adapter boundary, not here.
//!
//! Types derive `schemars::JsonSchema` so hosts can publish the message shape
//! they hand to model adapters.

#![allow(clippy::doc_markdown)]

mod content;
mod message;

pub use content::{ContentSegment, MessageContent};
pub use message::{Message, Role};
