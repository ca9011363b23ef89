//! Test doubles for integration tests and host smoke checks.

mod scripted_adapter;

pub use scripted_adapter::{ScriptedAdapter, ScriptedReply};
