//! Session layer: per-session conversation memory, checkpoint persistence
//! and turn orchestration.
//!
//! - **Context**: [`SessionContext`] owns one session's window, markers and
//!   retrieval index; every operation receives it explicitly.
//! - **Store**: [`SessionCacheStore`] persists markers and window snapshots in
//!   opaque per-session slots (memory, local files, or Valkey).
//! - **Manager**: [`SessionManager`] serialises turns per session, streams
//!   from a [`ModelAdapter`] and commits only completed turns.


mod adapter;
mod config;
mod context;
mod error;
mod manager;
mod memory;
mod observability;
mod prompt;
mod store;
/// Scripted collaborators for tests.
#[doc(hidden)]
pub mod test_support;

pub use adapter::{AdapterError, FragmentStream, ModelAdapter};
pub use config::{
    ConfigOverrides, DEFAULT_RETRIEVAL_TOP_K, DEFAULT_STORE_KEY_PREFIX, DEFAULT_STORE_PATH,
    DEFAULT_SYSTEM_PROMPT, DEFAULT_WINDOW_CAPACITY, ProviderSettings, RetrievalConfig,
    RetrievalSettings, RuntimeSettings, SessionConfig, SessionSettings, StoreBackendKind,
    StoreConfig, StoreSettings, load_runtime_settings, load_runtime_settings_from_paths,
    runtime_settings_paths, set_config_home_override,
};
pub use context::SessionContext;
pub use error::SessionError;
pub use manager::{SessionManager, TurnOutcome};
pub use memory::{ConversationMemory, Recall, RetrievalMemory};
pub use prompt::{AssembledPrompt, UserInput};
#[cfg(feature = "valkey")]
pub use store::ValkeySlotBackend;
pub use store::{
    CACHE_MARKERS_SLOT, FileSlotBackend, MemorySlotBackend, SessionCacheStore, SlotBackend,
    WINDOW_SLOT, build_slot_backend,
};
