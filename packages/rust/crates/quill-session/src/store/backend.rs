use anyhow::Result;
use async_trait::async_trait;

/// Opaque per-session key/value slots.
///
/// Durability is whatever the backend provides; callers treat every slot as
/// possibly empty.
#[async_trait]
pub trait SlotBackend: Send + Sync {
    /// Backend identifier for logs.
    fn backend_name(&self) -> &'static str;

    /// Raw slot value, `None` when never written.
    async fn get(&self, session_id: &str, slot: &str) -> Result<Option<String>>;

    /// Overwrite a slot.
    async fn set(&self, session_id: &str, slot: &str, value: String) -> Result<()>;

    /// Drop every slot of a session.
    async fn clear(&self, session_id: &str) -> Result<()>;
}
