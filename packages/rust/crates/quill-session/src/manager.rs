//! Session registry and per-turn orchestration.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use quill_cache::{CheckpointPlanner, ProviderBackend, RenderedRequest, render_request};
use quill_types::Message;
use quill_window::{TranscriptEntry, WindowStats};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::adapter::{AdapterError, ModelAdapter};
use crate::config::SessionConfig;
use crate::context::SessionContext;
use crate::error::SessionError;
use crate::memory::RetrievalMemory;
use crate::observability::SessionEvent;
use crate::prompt::{AssembledPrompt, UserInput};
use crate::store::{SessionCacheStore, build_slot_backend};

/// Result of one completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Full assistant response.
    pub response: String,
    /// Marker list after the turn, as persisted.
    pub markers: Vec<usize>,
    /// Marker placed by this turn, if any.
    pub new_checkpoint: Option<usize>,
    /// Window occupancy after the turn.
    pub window: WindowStats,
}

type SessionHandle = Arc<Mutex<SessionContext>>;

/// Owns every live session.
///
/// Turns of one session run one at a time: `run_turn` holds that session's
/// lock from prompt assembly to persistence. Different sessions proceed
/// independently.
pub struct SessionManager {
    config: SessionConfig,
    planner: CheckpointPlanner,
    store: SessionCacheStore,
    adapter: Arc<dyn ModelAdapter>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    /// Manager over an explicit planner, store and adapter.
    pub fn new(
        config: SessionConfig,
        planner: CheckpointPlanner,
        store: SessionCacheStore,
        adapter: Arc<dyn ModelAdapter>,
    ) -> Self {
        Self {
            config,
            planner,
            store,
            adapter,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Manager with the configured slot backend and the default planner.
    ///
    /// # Errors
    ///
    /// Slot backend construction failures.
    pub fn from_config(
        config: SessionConfig,
        adapter: Arc<dyn ModelAdapter>,
    ) -> anyhow::Result<Self> {
        let store = SessionCacheStore::new(build_slot_backend(&config.store)?);
        Ok(Self::new(config, CheckpointPlanner::default(), store, adapter))
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Checkpoint planner shared by every session.
    #[must_use]
    pub fn planner(&self) -> &CheckpointPlanner {
        &self.planner
    }

    /// Backing session store.
    #[must_use]
    pub fn store(&self) -> &SessionCacheStore {
        &self.store
    }

    fn new_context(&self, session_id: &str) -> SessionContext {
        self.with_retrieval(SessionContext::new(session_id, self.config.window_capacity))
    }

    fn retrieval_memory(&self) -> Option<RetrievalMemory> {
        self.config
            .retrieval
            .enabled
            .then(|| RetrievalMemory::from_config(&self.config.retrieval))
    }

    fn with_retrieval(&self, context: SessionContext) -> SessionContext {
        match self.retrieval_memory() {
            Some(retrieval) => context.with_retrieval(retrieval),
            None => context,
        }
    }

    async fn register(&self, context: SessionContext) {
        let session_id = context.session_id().to_string();
        self.sessions
            .write()
            .await
            .insert(session_id, Arc::new(Mutex::new(context)));
    }

    /// Begin a session with an empty window and no markers, replacing any
    /// live or stored session of the same id.
    ///
    /// # Errors
    ///
    /// Store failures while resetting persisted state.
    pub async fn start_session(&self, session_id: &str) -> Result<(), SessionError> {
        let context = self.new_context(session_id);
        self.store.save(session_id, &[]).await?;
        self.store.save_window(session_id, context.window()).await?;
        self.register(context).await;
        tracing::info!(
            event = SessionEvent::SessionStarted.as_str(),
            session_id,
            window_capacity = self.config.window_capacity,
            retrieval = self.config.retrieval.enabled,
            backend = self.store.backend_name(),
            "session started"
        );
        Ok(())
    }

    /// Rebuild a session from a host transcript. Previously persisted markers
    /// are discarded: at most one fresh marker is placed at the end of the
    /// restored history and that list is persisted.
    ///
    /// # Errors
    ///
    /// Store failures while persisting the restored state.
    pub async fn resume_session(
        &self,
        session_id: &str,
        transcript: Vec<TranscriptEntry>,
    ) -> Result<Vec<usize>, SessionError> {
        let context = SessionContext::resume(
            session_id,
            self.config.window_capacity,
            transcript,
            self.retrieval_memory(),
            &self.planner,
        )
        .await;
        let markers = context.cache().markers().to_vec();
        self.store.save(session_id, &markers).await?;
        self.store.save_window(session_id, context.window()).await?;
        self.register(context).await;
        Ok(markers)
    }

    /// Live session handle. A session unknown to this process is re-attached
    /// from a stored window snapshot when one exists.
    async fn session(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return Ok(Arc::clone(handle));
        }
        let Some(window) = self
            .store
            .load_window(session_id, self.config.window_capacity)
            .await
        else {
            return Err(SessionError::UnknownSession(session_id.to_string()));
        };
        let pairs = window.pairs();
        let mut context = self.new_context(session_id).with_window(window);
        context.index_pairs(&pairs).await;
        let mut sessions = self.sessions.write().await;
        let handle = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(context)));
        Ok(Arc::clone(handle))
    }

    /// Run one turn to completion.
    ///
    /// The window, markers and retrieval index change only after the model
    /// stream ends cleanly. A request error, a fragment error or dropping
    /// this future earlier leaves the session as it was. Once committed, the
    /// session stays locked until markers and window are persisted, even if
    /// this future is dropped.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownSession`], [`SessionError::Adapter`] (nothing
    /// committed), or [`SessionError::Store`] (committed in memory, not
    /// persisted).
    pub async fn run_turn(
        &self,
        session_id: &str,
        input: UserInput,
    ) -> Result<TurnOutcome, SessionError> {
        let handle = self.session(session_id).await?;
        let mut context = handle.lock_owned().await;

        let markers = self.store.load(session_id).await;
        context.set_markers(markers);
        tracing::debug!(
            event = SessionEvent::SessionTurnStarted.as_str(),
            session_id,
            history_len = context.window().len() * 2,
            markers = ?context.cache().markers(),
            "turn started"
        );

        let prompt = context
            .assemble(&input, &self.planner, &self.config.system_prompt)
            .await;
        let response = match self.collect_response(&prompt).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(
                    event = SessionEvent::SessionTurnAborted.as_str(),
                    session_id,
                    error = %error,
                    "model stream failed; turn not committed"
                );
                return Err(error.into());
            }
        };

        let new_checkpoint = context
            .commit(
                Message::user(input.text),
                Message::assistant(response.clone()),
                &self.planner,
            )
            .await;
        let (markers, window) = self.persist(session_id, context).await?;

        tracing::info!(
            event = SessionEvent::SessionTurnCommitted.as_str(),
            session_id,
            response_chars = response.len(),
            markers = ?markers,
            new_checkpoint = ?new_checkpoint,
            "turn committed"
        );
        Ok(TurnOutcome {
            response,
            markers,
            new_checkpoint,
            window,
        })
    }

    /// Save markers and window snapshot while still holding the session.
    ///
    /// The guard moves into a spawned task, so the session stays locked until
    /// both writes land even if the caller drops this future. The next turn
    /// therefore never reads markers older than the committed context.
    async fn persist(
        &self,
        session_id: &str,
        context: OwnedMutexGuard<SessionContext>,
    ) -> Result<(Vec<usize>, WindowStats), SessionError> {
        let store = self.store.clone();
        let id = session_id.to_string();
        let persisted = tokio::spawn(async move {
            let markers = context.cache().markers().to_vec();
            store.save(&id, &markers).await?;
            store.save_window(&id, context.window()).await?;
            Ok::<_, anyhow::Error>((markers, context.window().stats()))
        })
        .await
        .map_err(anyhow::Error::from)??;
        Ok(persisted)
    }

    async fn collect_response(
        &self,
        prompt: &AssembledPrompt,
    ) -> Result<String, AdapterError> {
        let mut stream = self.adapter.stream(prompt).await?;
        let mut response = String::new();
        while let Some(fragment) = stream.next().await {
            response.push_str(&fragment?);
        }
        Ok(response)
    }

    /// Create the latest checkpoint, persist the markers and return the
    /// annotated history. Used before exporting a session.
    ///
    /// # Errors
    ///
    /// Unknown session or store failures.
    pub async fn checkpointed_history(
        &self,
        session_id: &str,
    ) -> Result<Vec<Message>, SessionError> {
        let handle = self.session(session_id).await?;
        let mut context = handle.lock_owned().await;
        let markers = self.store.load(session_id).await;
        context.set_markers(markers);

        let history = context.checkpointed_history(&self.planner);
        let (markers, _) = self.persist(session_id, context).await?;
        tracing::debug!(
            event = SessionEvent::SessionHistorySnapshot.as_str(),
            session_id,
            messages = history.len(),
            markers = ?markers,
            "checkpointed history prepared"
        );
        Ok(history)
    }

    /// [`Self::checkpointed_history`] rendered for `backend`, with the
    /// configured system prompt first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::checkpointed_history`].
    pub async fn rendered_history(
        &self,
        session_id: &str,
        backend: ProviderBackend,
    ) -> Result<RenderedRequest, SessionError> {
        let history = self.checkpointed_history(session_id).await?;
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.config.system_prompt.as_str()).with_cache_point());
        messages.extend(history);
        Ok(render_request(&messages, backend))
    }

    /// Drop a session from memory and clear its stored slots. Returns whether
    /// it was live.
    ///
    /// # Errors
    ///
    /// Store failures while clearing.
    pub async fn end_session(&self, session_id: &str) -> Result<bool, SessionError> {
        let removed = self.sessions.write().await.remove(session_id);
        if let Some(handle) = removed.as_ref() {
            // Wait for an in-flight turn to finish before clearing its slots.
            let _guard = handle.lock().await;
        }
        self.store.clear(session_id).await?;
        tracing::info!(
            event = SessionEvent::SessionEnded.as_str(),
            session_id,
            was_live = removed.is_some(),
            "session ended"
        );
        Ok(removed.is_some())
    }

    /// Ids of live sessions, sorted.
    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
