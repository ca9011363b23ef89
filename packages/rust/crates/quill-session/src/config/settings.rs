//! Runtime settings loader.
//!
//! Loads and merges:
//! - System defaults: `<QUILL_ROOT>/packages/conf/settings.yaml`
//! - User overrides:  `<QUILL_CONFIG_HOME>/quill/settings.yaml`
//!
//! Merge precedence is user over system, field by field.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/settings.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "quill/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Raw settings as read from YAML; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    /// Window and system prompt.
    #[serde(default)]
    pub session: SessionSettings,
    /// Relevant-history retrieval.
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    /// Session slot storage.
    #[serde(default)]
    pub store: StoreSettings,
    /// Request wire format.
    #[serde(default)]
    pub provider: ProviderSettings,
}

/// `session:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSettings {
    /// Pairs kept in the window.
    pub window_capacity: Option<usize>,
    /// System instruction.
    pub system_prompt: Option<String>,
}

/// `retrieval:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrievalSettings {
    /// Turn retrieval on.
    pub enabled: Option<bool>,
    /// Records recalled per query.
    pub top_k: Option<usize>,
    /// Embedding service base URL; unset selects the hash embedder.
    pub embedding_url: Option<String>,
    /// Embedding model name.
    pub embedding_model: Option<String>,
    /// Embedding width.
    pub dimension: Option<usize>,
    /// Embedding request timeout.
    pub timeout_secs: Option<u64>,
}

/// `store:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
    /// `memory`, `local` or `valkey`.
    pub backend: Option<String>,
    /// Local backend directory.
    pub path: Option<String>,
    /// Valkey connection URL.
    pub valkey_url: Option<String>,
    /// Valkey key prefix.
    pub key_prefix: Option<String>,
    /// Valkey key expiry.
    pub ttl_secs: Option<u64>,
}

/// `provider:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    /// `bedrock` or `anthropic`.
    pub backend: Option<String>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            session: self.session.merge(overlay.session),
            retrieval: self.retrieval.merge(overlay.retrieval),
            store: self.store.merge(overlay.store),
            provider: self.provider.merge(overlay.provider),
        }
    }
}

impl SessionSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            window_capacity: overlay.window_capacity.or(self.window_capacity),
            system_prompt: overlay.system_prompt.or(self.system_prompt),
        }
    }
}

impl RetrievalSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            enabled: overlay.enabled.or(self.enabled),
            top_k: overlay.top_k.or(self.top_k),
            embedding_url: overlay.embedding_url.or(self.embedding_url),
            embedding_model: overlay.embedding_model.or(self.embedding_model),
            dimension: overlay.dimension.or(self.dimension),
            timeout_secs: overlay.timeout_secs.or(self.timeout_secs),
        }
    }
}

impl StoreSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            backend: overlay.backend.or(self.backend),
            path: overlay.path.or(self.path),
            valkey_url: overlay.valkey_url.or(self.valkey_url),
            key_prefix: overlay.key_prefix.or(self.key_prefix),
            ttl_secs: overlay.ttl_secs.or(self.ttl_secs),
        }
    }
}

impl ProviderSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            backend: overlay.backend.or(self.backend),
        }
    }
}

/// Load merged runtime settings (user overrides system).
pub fn load_runtime_settings() -> RuntimeSettings {
    let (system_path, user_path) = runtime_settings_paths();
    load_runtime_settings_from_paths(&system_path, &user_path)
}

/// System and user settings paths, in merge order.
#[doc(hidden)]
pub fn runtime_settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    (system_path, user_path)
}

/// Merge `user` over `system`; unreadable files count as empty.
#[doc(hidden)]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> RuntimeSettings {
    if !path.exists() {
        return RuntimeSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return RuntimeSettings::default();
        }
    };
    match serde_yaml::from_str::<RuntimeSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            RuntimeSettings::default()
        }
    }
}

fn project_root() -> PathBuf {
    non_empty_env("QUILL_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Set config-home override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to `QUILL_ROOT`/cwd.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if CONFIG_HOME_OVERRIDE.set(path.clone()).is_err()
        && let Some(current) = CONFIG_HOME_OVERRIDE.get()
        && current != &path
    {
        tracing::warn!(
            current = %current.display(),
            ignored = %path.display(),
            "config home override already set; ignoring subsequent value"
        );
    }
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    if let Some(path) = CONFIG_HOME_OVERRIDE.get() {
        return absolutize(project_root, path.clone());
    }
    let configured = non_empty_env("QUILL_CONFIG_HOME")
        .unwrap_or_else(|| DEFAULT_CONFIG_HOME_RELATIVE_PATH.to_string());
    absolutize(project_root, PathBuf::from(configured))
}

fn absolutize(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}

pub(super) fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
