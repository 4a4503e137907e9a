pub mod factory_config;
pub mod loader;

// Re-export commonly used types
pub use factory_config::{CacheBackend, CacheSettings, FactoryConfig, PartialFactoryConfig};
pub use loader::{apply_env_overrides, ConfigLoader, CONFIG_FILE_NAME};
