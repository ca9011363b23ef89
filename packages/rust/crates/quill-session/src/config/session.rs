//! Resolved per-process session configuration.

use std::path::PathBuf;

use quill_cache::ProviderBackend;
use quill_memory::DEFAULT_EMBEDDING_DIM;

use super::settings::{RuntimeSettings, non_empty_env};

/// Window capacity in pairs when settings leave it unset.
pub const DEFAULT_WINDOW_CAPACITY: usize = 20;
/// Retrieved turns per query when settings leave it unset.
pub const DEFAULT_RETRIEVAL_TOP_K: usize = 3;
/// Directory for the local slot backend.
pub const DEFAULT_STORE_PATH: &str = ".cache/quill/sessions";
/// Key prefix for the Valkey slot backend.
pub const DEFAULT_STORE_KEY_PREFIX: &str = "quill:session";
/// System instruction used when settings provide none.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a writing assistant that helps the user draft a \
technical specification document section by section. Answer in the user's language; if it is \
unclear, answer in English.";

const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 15;

/// Where per-session slots live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackendKind {
    /// Process memory; lost on exit.
    #[default]
    Memory,
    /// JSON files under [`StoreConfig::path`].
    Local,
    /// Valkey / Redis hash per session.
    Valkey,
}

impl StoreBackendKind {
    /// Parse a settings value; unknown values yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "local" | "file" => Some(Self::Local),
            "valkey" | "redis" => Some(Self::Valkey),
            _ => None,
        }
    }

    /// Canonical settings value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Local => "local",
            Self::Valkey => "valkey",
        }
    }
}

/// Relevant-history retrieval settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    /// Index turns and query them for each prompt.
    pub enabled: bool,
    /// Records recalled per query.
    pub top_k: usize,
    /// Remote embedding service; `None` selects the in-process hash embedder.
    pub embedding_url: Option<String>,
    /// Model name forwarded to the embedding service.
    pub embedding_model: Option<String>,
    /// Vector width of the embedder.
    pub dimension: usize,
    /// Per-request embedding timeout.
    pub timeout_secs: u64,
}

/// Slot backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Backend kind.
    pub backend: StoreBackendKind,
    /// Root directory of the local backend.
    pub path: PathBuf,
    /// Connection URL of the Valkey backend.
    pub valkey_url: Option<String>,
    /// Valkey key prefix.
    pub key_prefix: String,
    /// Expiry applied to Valkey session keys on write.
    pub ttl_secs: Option<u64>,
}

/// Resolved configuration for a [`crate::SessionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Window capacity in pairs.
    pub window_capacity: usize,
    /// System instruction sent with every turn.
    pub system_prompt: String,
    /// Retrieval settings.
    pub retrieval: RetrievalConfig,
    /// Store settings.
    pub store: StoreConfig,
    /// Wire format for rendered requests.
    pub provider: ProviderBackend,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&RuntimeSettings::default())
    }
}

/// Environment values that take precedence over settings files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `QUILL_STORE_BACKEND`.
    pub store_backend: Option<String>,
    /// `QUILL_STORE_PATH`.
    pub store_path: Option<String>,
    /// `VALKEY_URL`.
    pub valkey_url: Option<String>,
    /// `QUILL_EMBEDDING_URL`.
    pub embedding_url: Option<String>,
}

impl ConfigOverrides {
    /// Read `QUILL_STORE_BACKEND`, `QUILL_STORE_PATH`, `VALKEY_URL` and
    /// `QUILL_EMBEDDING_URL`. Blank values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            store_backend: non_empty_env("QUILL_STORE_BACKEND"),
            store_path: non_empty_env("QUILL_STORE_PATH"),
            valkey_url: non_empty_env("VALKEY_URL"),
            embedding_url: non_empty_env("QUILL_EMBEDDING_URL"),
        }
    }
}

impl SessionConfig {
    /// Resolve settings into a config, filling defaults. Invalid values are
    /// logged and replaced by defaults.
    #[must_use]
    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        let window_capacity = match settings.session.window_capacity {
            Some(0) => {
                tracing::warn!(
                    setting = "session.window_capacity",
                    "window capacity must be positive; using default"
                );
                DEFAULT_WINDOW_CAPACITY
            }
            Some(value) => value,
            None => DEFAULT_WINDOW_CAPACITY,
        };
        let system_prompt = trimmed(settings.session.system_prompt.as_deref())
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let retrieval = RetrievalConfig {
            enabled: settings.retrieval.enabled.unwrap_or(false),
            top_k: settings.retrieval.top_k.unwrap_or(DEFAULT_RETRIEVAL_TOP_K),
            embedding_url: trimmed(settings.retrieval.embedding_url.as_deref()),
            embedding_model: trimmed(settings.retrieval.embedding_model.as_deref()),
            dimension: settings
                .retrieval
                .dimension
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_EMBEDDING_DIM),
            timeout_secs: settings
                .retrieval
                .timeout_secs
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_EMBEDDING_TIMEOUT_SECS),
        };

        let store = StoreConfig {
            backend: parse_store_backend(settings.store.backend.as_deref()),
            path: trimmed(settings.store.path.as_deref())
                .map_or_else(|| PathBuf::from(DEFAULT_STORE_PATH), PathBuf::from),
            valkey_url: trimmed(settings.store.valkey_url.as_deref()),
            key_prefix: trimmed(settings.store.key_prefix.as_deref())
                .unwrap_or_else(|| DEFAULT_STORE_KEY_PREFIX.to_string()),
            ttl_secs: settings.store.ttl_secs.filter(|v| *v > 0),
        };

        let provider = match settings.provider.backend.as_deref() {
            None => ProviderBackend::default(),
            Some(raw) => ProviderBackend::parse(raw).unwrap_or_else(|| {
                tracing::warn!(
                    setting = "provider.backend",
                    value = %raw,
                    "unknown provider backend; using bedrock"
                );
                ProviderBackend::default()
            }),
        };

        Self {
            window_capacity,
            system_prompt,
            retrieval,
            store,
            provider,
        }
    }

    /// Apply environment overrides on top of resolved settings.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(raw) = overrides.store_backend.as_deref() {
            self.store.backend = parse_store_backend(Some(raw));
        }
        if let Some(path) = overrides.store_path.as_deref() {
            self.store.path = PathBuf::from(path);
        }
        if let Some(url) = overrides.valkey_url.as_deref() {
            self.store.valkey_url = Some(url.to_string());
        }
        if let Some(url) = overrides.embedding_url.as_deref() {
            self.retrieval.embedding_url = Some(url.to_string());
        }
        self
    }

    /// Settings files merged, then process environment applied.
    #[must_use]
    pub fn load() -> Self {
        Self::from_settings(&super::load_runtime_settings())
            .with_overrides(&ConfigOverrides::from_env())
    }
}

fn trimmed(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_store_backend(raw: Option<&str>) -> StoreBackendKind {
    let Some(raw) = raw else {
        return StoreBackendKind::default();
    };
    StoreBackendKind::parse(raw).unwrap_or_else(|| {
        tracing::warn!(
            setting = "store.backend",
            value = %raw,
            "unknown store backend; using memory"
        );
        StoreBackendKind::default()
    })
}
