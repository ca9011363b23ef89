//! In-process slot backend.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SlotBackend;

/// session_id → slot → value, held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotBackend {
    inner: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl MemorySlotBackend {
    /// Empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one slot.
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl SlotBackend for MemorySlotBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, session_id: &str, slot: &str) -> Result<Option<String>> {
        let g = self.inner.read().await;
        Ok(g.get(session_id).and_then(|slots| slots.get(slot)).cloned())
    }

    async fn set(&self, session_id: &str, slot: &str, value: String) -> Result<()> {
        let mut g = self.inner.write().await;
        g.entry(session_id.to_string())
            .or_default()
            .insert(slot.to_string(), value);
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        self.inner.write().await.remove(session_id);
        Ok(())
    }
}
