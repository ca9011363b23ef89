//! Explicit per-session state: window, checkpoint markers, retrieval index.

use quill_cache::{CacheState, CheckpointPlanner};
use quill_types::Message;
use quill_window::{ConversationWindow, TranscriptEntry, TurnPair, restore_turns};

use crate::memory::{ConversationMemory, Recall, RetrievalMemory};
use crate::observability::SessionEvent;
use crate::prompt::{AssembledPrompt, UserInput, build_user_message};

/// State owned by exactly one session. Nothing in here is shared across
/// sessions; the retrieval index in particular is per session.
pub struct SessionContext {
    session_id: String,
    window: ConversationWindow,
    cache: CacheState,
    retrieval: Option<RetrievalMemory>,
}

impl SessionContext {
    /// Fresh session: empty window, no markers.
    pub fn new(session_id: impl Into<String>, window_capacity: usize) -> Self {
        Self {
            session_id: session_id.into(),
            window: ConversationWindow::new(window_capacity),
            cache: CacheState::new(),
            retrieval: None,
        }
    }

    /// Rebuild a session from a host transcript.
    ///
    /// Every restored pair is indexed into `retrieval` (when given), including
    /// pairs older than the window keeps. Markers are not restored: the list
    /// starts empty and at most one marker is placed at the end of the
    /// restored history.
    pub async fn resume(
        session_id: impl Into<String>,
        window_capacity: usize,
        transcript: impl IntoIterator<Item = TranscriptEntry>,
        retrieval: Option<RetrievalMemory>,
        planner: &CheckpointPlanner,
    ) -> Self {
        let pairs = restore_turns(transcript);
        let mut context = Self::new(session_id, window_capacity);
        if let Some(retrieval) = retrieval {
            context.retrieval = Some(retrieval);
            context.index_pairs(&pairs).await;
        }
        context.window = ConversationWindow::from_pairs(window_capacity, pairs);
        context.create_latest_checkpoint(planner);
        tracing::info!(
            event = SessionEvent::SessionResumed.as_str(),
            session_id = %context.session_id,
            pairs = context.window.len(),
            indexed = context.retrieval.as_ref().map_or(0, |r| r.index().len()),
            markers = ?context.cache.markers(),
            "session restored from transcript"
        );
        context
    }

    /// Feed already-completed pairs to the retrieval index, oldest first.
    /// Failures are logged and the pair is skipped. No-op without retrieval.
    pub async fn index_pairs(&mut self, pairs: &[TurnPair]) {
        let Some(retrieval) = self.retrieval.as_mut() else {
            return;
        };
        for pair in pairs {
            if let Err(error) = retrieval.remember(pair).await {
                tracing::warn!(
                    event = SessionEvent::RetrievalIndexFailed.as_str(),
                    session_id = %self.session_id,
                    strategy = retrieval.strategy(),
                    error = %error,
                    "restored turn not indexed for retrieval"
                );
            }
        }
    }

    /// Replace the window, e.g. with a stored snapshot.
    #[must_use]
    pub fn with_window(mut self, window: ConversationWindow) -> Self {
        self.window = window;
        self
    }

    /// Attach an empty retrieval memory.
    #[must_use]
    pub fn with_retrieval(mut self, retrieval: RetrievalMemory) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    /// Id this context belongs to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Recent turns kept verbatim.
    #[must_use]
    pub fn window(&self) -> &ConversationWindow {
        &self.window
    }

    /// Current checkpoint markers.
    #[must_use]
    pub fn cache(&self) -> &CacheState {
        &self.cache
    }

    /// Retrieval memory, when enabled.
    #[must_use]
    pub fn retrieval(&self) -> Option<&RetrievalMemory> {
        self.retrieval.as_ref()
    }

    /// Adopt markers loaded from the session store.
    pub fn set_markers(&mut self, markers: Vec<usize>) {
        self.cache.replace(markers);
    }

    /// Window history, oldest first, without annotations.
    #[must_use]
    pub fn history(&self) -> Vec<Message> {
        self.window.history()
    }

    /// Build the prompt for `input`: checkpointed system message, annotated
    /// window history, then the user message. Retrieval failures are logged
    /// and the prompt is built without relevant history.
    pub async fn assemble(
        &self,
        input: &UserInput,
        planner: &CheckpointPlanner,
        system_prompt: &str,
    ) -> AssembledPrompt {
        let window_lines = self.window.lines();
        let mut history = Vec::new();
        let mut relevant = String::new();

        let mut memories: Vec<&dyn ConversationMemory> = vec![&self.window];
        if let Some(retrieval) = self.retrieval.as_ref() {
            memories.push(retrieval);
        }
        for memory in memories {
            match memory.recall(&input.text, &window_lines).await {
                Ok(Recall::Turns(turns)) => history = turns,
                Ok(Recall::Relevant(text)) => {
                    tracing::debug!(
                        event = SessionEvent::RetrievalQuerySucceeded.as_str(),
                        session_id = %self.session_id,
                        strategy = memory.strategy(),
                        relevant_chars = text.len(),
                        "relevant history retrieved"
                    );
                    relevant = text;
                }
                Err(error) => {
                    tracing::warn!(
                        event = SessionEvent::RetrievalQueryFailed.as_str(),
                        session_id = %self.session_id,
                        strategy = memory.strategy(),
                        error = %error,
                        "relevant history unavailable; continuing without it"
                    );
                }
            }
        }

        let mut messages = planner.apply_markers(self.cache.markers(), &history);
        messages.push(build_user_message(input, &relevant));
        AssembledPrompt {
            system: Message::system(system_prompt).with_cache_point(),
            messages,
        }
    }

    /// Record a completed exchange and re-evaluate checkpoints.
    ///
    /// Retrieval indexing runs first; the window append and marker update
    /// that follow do not suspend, so they land together or not at all.
    /// Returns the new marker position when one was placed.
    ///
    /// # Panics
    ///
    /// Panics if the roles are not (user, assistant).
    pub async fn commit(
        &mut self,
        user: Message,
        assistant: Message,
        planner: &CheckpointPlanner,
    ) -> Option<usize> {
        let pair = TurnPair::new(user, assistant);

        let mut memories: Vec<&mut dyn ConversationMemory> = Vec::with_capacity(2);
        if let Some(retrieval) = self.retrieval.as_mut() {
            memories.push(retrieval);
        }
        memories.push(&mut self.window);
        for memory in memories {
            if let Err(error) = memory.remember(&pair).await {
                tracing::warn!(
                    event = SessionEvent::RetrievalIndexFailed.as_str(),
                    session_id = %self.session_id,
                    strategy = memory.strategy(),
                    error = %error,
                    "turn not indexed for retrieval"
                );
            }
        }

        self.create_latest_checkpoint(planner)
    }

    /// Place a marker at the end of the current history if the token budget
    /// since the last marker is met.
    pub fn create_latest_checkpoint(&mut self, planner: &CheckpointPlanner) -> Option<usize> {
        let history = self.window.history();
        match planner.plan_latest(self.cache.markers(), &history) {
            Some(markers) => {
                self.cache.replace(markers);
                tracing::info!(
                    event = SessionEvent::CacheCheckpointCreated.as_str(),
                    session_id = %self.session_id,
                    index = ?self.cache.latest(),
                    markers = ?self.cache.markers(),
                    "cache checkpoint created"
                );
                self.cache.latest()
            }
            None => {
                tracing::debug!(
                    event = SessionEvent::CacheCheckpointSkipped.as_str(),
                    session_id = %self.session_id,
                    history_len = history.len(),
                    "cache checkpoint not needed"
                );
                None
            }
        }
    }

    /// Create the latest checkpoint, then return the annotated history.
    pub fn checkpointed_history(&mut self, planner: &CheckpointPlanner) -> Vec<Message> {
        self.create_latest_checkpoint(planner);
        planner.apply_markers(self.cache.markers(), &self.window.history())
    }
}
