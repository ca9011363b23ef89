//! Config namespace: YAML runtime settings and the resolved session config.

mod session;
mod settings;

pub use session::{
    ConfigOverrides, DEFAULT_RETRIEVAL_TOP_K, DEFAULT_STORE_KEY_PREFIX, DEFAULT_STORE_PATH,
    DEFAULT_SYSTEM_PROMPT, DEFAULT_WINDOW_CAPACITY, RetrievalConfig, SessionConfig,
    StoreBackendKind, StoreConfig,
};
pub use settings::{
    ProviderSettings, RetrievalSettings, RuntimeSettings, SessionSettings, StoreSettings,
    load_runtime_settings, load_runtime_settings_from_paths, runtime_settings_paths,
    set_config_home_override,
};
