use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;

use crate::adapter::{AdapterError, FragmentStream, ModelAdapter};
use crate::prompt::AssembledPrompt;

/// One scripted model response.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Stream these fragments, then finish.
    Fragments(Vec<String>),
    /// Fail before any fragment.
    RequestError(String),
    /// Stream `fragments`, then fail.
    BreakAfter {
        /// Fragments sent before the failure.
        fragments: Vec<String>,
        /// Interruption message.
        error: String,
    },
    /// Stream `fragments`, then never finish.
    Hang(Vec<String>),
}

impl ScriptedReply {
    /// Single-fragment reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Fragments(vec![text.into()])
    }
}

/// Replays scripted replies in order and records every prompt it receives.
/// Once the script is exhausted it answers `"ok"`.
#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<AssembledPrompt>>,
}

impl ScriptedAdapter {
    /// Adapter answering with `replies` in order.
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply.
    pub fn push(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<AssembledPrompt> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn ok_all(fragments: Vec<String>) -> impl futures::Stream<Item = Result<String, AdapterError>> {
    stream::iter(fragments.into_iter().map(Ok))
}

#[async_trait]
impl ModelAdapter for ScriptedAdapter {
    async fn stream(&self, prompt: &AssembledPrompt) -> Result<FragmentStream, AdapterError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.clone());
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::text("ok"));
        match reply {
            ScriptedReply::Fragments(fragments) => Ok(ok_all(fragments).boxed()),
            ScriptedReply::RequestError(error) => Err(AdapterError::Request(error)),
            ScriptedReply::BreakAfter { fragments, error } => Ok(ok_all(fragments)
                .chain(stream::once(async move { Err(AdapterError::Interrupted(error)) }))
                .boxed()),
            ScriptedReply::Hang(fragments) => Ok(ok_all(fragments).chain(stream::pending()).boxed()),
        }
    }
}
