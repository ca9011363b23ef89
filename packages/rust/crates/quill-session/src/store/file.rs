//! One JSON file per session slot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::SlotBackend;
use super::persistence::atomic_write_text;

/// Slots stored as `<root>/<session-dir>/<slot>.json`.
///
/// Session ids are arbitrary strings, so the directory name is a sanitized
/// prefix plus a digest of the full id.
#[derive(Debug, Clone)]
pub struct FileSlotBackend {
    root: PathBuf,
}

impl FileSlotBackend {
    /// Backend rooted at `root`; directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding one subdirectory per session.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_dir_name(session_id))
    }

    fn slot_path(&self, session_id: &str, slot: &str) -> PathBuf {
        self.session_dir(session_id)
            .join(format!("{}.json", sanitize(slot)))
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .take(48)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn session_dir_name(session_id: &str) -> String {
    let digest = Sha256::digest(session_id.as_bytes());
    format!("{}-{}", sanitize(session_id), hex::encode(&digest[..8]))
}

#[async_trait]
impl SlotBackend for FileSlotBackend {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, session_id: &str, slot: &str) -> Result<Option<String>> {
        let path = self.slot_path(session_id, slot);
        tokio::task::spawn_blocking(move || match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error)
                .with_context(|| format!("failed to read slot file {}", path.display())),
        })
        .await
        .context("slot read task failed")?
    }

    async fn set(&self, session_id: &str, slot: &str, value: String) -> Result<()> {
        let path = self.slot_path(session_id, slot);
        tokio::task::spawn_blocking(move || atomic_write_text(&path, &value))
            .await
            .context("slot write task failed")?
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        let dir = self.session_dir(session_id);
        tokio::task::spawn_blocking(move || match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error)
                .with_context(|| format!("failed to remove session directory {}", dir.display())),
        })
        .await
        .context("slot clear task failed")?
    }
}
