//! Stable `event` ids attached to session-layer log lines.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    SessionStarted,
    SessionResumed,
    SessionEnded,
    SessionTurnStarted,
    SessionTurnCommitted,
    SessionTurnAborted,
    SessionHistorySnapshot,
    CacheMarkersLoaded,
    CacheMarkersDecodeFailed,
    CacheMarkersSaved,
    CacheCheckpointCreated,
    CacheCheckpointSkipped,
    RetrievalQuerySucceeded,
    RetrievalQueryFailed,
    RetrievalIndexFailed,
    StoreBackendInitialized,
    StoreSlotReadFailed,
    StoreWindowLoaded,
    StoreWindowSaved,
    StoreValkeyConnected,
    StoreValkeyCommandRetrySucceeded,
    StoreValkeyCommandRetryFailed,
}

impl SessionEvent {
    pub const ALL: [Self; 22] = [
        Self::SessionStarted,
        Self::SessionResumed,
        Self::SessionEnded,
        Self::SessionTurnStarted,
        Self::SessionTurnCommitted,
        Self::SessionTurnAborted,
        Self::SessionHistorySnapshot,
        Self::CacheMarkersLoaded,
        Self::CacheMarkersDecodeFailed,
        Self::CacheMarkersSaved,
        Self::CacheCheckpointCreated,
        Self::CacheCheckpointSkipped,
        Self::RetrievalQuerySucceeded,
        Self::RetrievalQueryFailed,
        Self::RetrievalIndexFailed,
        Self::StoreBackendInitialized,
        Self::StoreSlotReadFailed,
        Self::StoreWindowLoaded,
        Self::StoreWindowSaved,
        Self::StoreValkeyConnected,
        Self::StoreValkeyCommandRetrySucceeded,
        Self::StoreValkeyCommandRetryFailed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionStarted => "session.started",
            Self::SessionResumed => "session.resumed",
            Self::SessionEnded => "session.ended",
            Self::SessionTurnStarted => "session.turn.started",
            Self::SessionTurnCommitted => "session.turn.committed",
            Self::SessionTurnAborted => "session.turn.aborted",
            Self::SessionHistorySnapshot => "session.history.snapshot",
            Self::CacheMarkersLoaded => "cache.markers.loaded",
            Self::CacheMarkersDecodeFailed => "cache.markers.decode_failed",
            Self::CacheMarkersSaved => "cache.markers.saved",
            Self::CacheCheckpointCreated => "cache.checkpoint.created",
            Self::CacheCheckpointSkipped => "cache.checkpoint.skipped",
            Self::RetrievalQuerySucceeded => "retrieval.query.succeeded",
            Self::RetrievalQueryFailed => "retrieval.query.failed",
            Self::RetrievalIndexFailed => "retrieval.index.failed",
            Self::StoreBackendInitialized => "store.backend.initialized",
            Self::StoreSlotReadFailed => "store.slot.read_failed",
            Self::StoreWindowLoaded => "store.window.loaded",
            Self::StoreWindowSaved => "store.window.saved",
            Self::StoreValkeyConnected => "store.valkey.connected",
            Self::StoreValkeyCommandRetrySucceeded => "store.valkey.command_retry_succeeded",
            Self::StoreValkeyCommandRetryFailed => "store.valkey.command_retry_failed",
        }
    }
}
