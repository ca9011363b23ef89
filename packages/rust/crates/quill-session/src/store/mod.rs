//! Session slot storage: backends plus the typed cache-state store on top.

mod backend;
mod cache_store;
mod file;
mod memory;
mod persistence;
#[cfg(feature = "valkey")]
mod valkey;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{StoreBackendKind, StoreConfig};
use crate::observability::SessionEvent;

pub use backend::SlotBackend;
pub use cache_store::{CACHE_MARKERS_SLOT, SessionCacheStore, WINDOW_SLOT};
pub use file::FileSlotBackend;
pub use memory::MemorySlotBackend;
#[cfg(feature = "valkey")]
pub use valkey::ValkeySlotBackend;

/// Build the slot backend named by `config`.
///
/// # Errors
///
/// Fails when Valkey is selected without a URL, with an invalid URL, or in a
/// build without the `valkey` feature.
pub fn build_slot_backend(config: &StoreConfig) -> Result<Arc<dyn SlotBackend>> {
    let backend: Arc<dyn SlotBackend> = match config.backend {
        StoreBackendKind::Memory => Arc::new(MemorySlotBackend::new()),
        StoreBackendKind::Local => Arc::new(FileSlotBackend::new(config.path.clone())),
        StoreBackendKind::Valkey => build_valkey(config)?,
    };
    tracing::info!(
        event = SessionEvent::StoreBackendInitialized.as_str(),
        backend = backend.backend_name(),
        "session slot backend initialized"
    );
    Ok(backend)
}

#[cfg(feature = "valkey")]
fn build_valkey(config: &StoreConfig) -> Result<Arc<dyn SlotBackend>> {
    let Some(url) = config.valkey_url.as_deref() else {
        anyhow::bail!("store backend is valkey but no valkey url is configured");
    };
    Ok(Arc::new(ValkeySlotBackend::new(
        url,
        Some(config.key_prefix.clone()),
        config.ttl_secs,
    )?))
}

#[cfg(not(feature = "valkey"))]
fn build_valkey(_config: &StoreConfig) -> Result<Arc<dyn SlotBackend>> {
    anyhow::bail!("store backend is valkey but quill-session was built without the `valkey` feature")
}
