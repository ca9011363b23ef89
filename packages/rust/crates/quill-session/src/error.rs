use crate::adapter::AdapterError;

/// Failures surfaced by [`crate::SessionManager`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(String),
    /// The model call failed; nothing was committed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// Persisting session state failed after the turn was committed in memory.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
