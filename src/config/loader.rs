use std::{collections::HashMap, env, fs, path::PathBuf};

use super::factory_config::{FactoryConfig, PartialFactoryConfig};
use crate::errors::ConfigError;

pub const ENV_SOURCE: &str = "SVC_FACTORY_SOURCE";
pub const ENV_CACHE: &str = "SVC_FACTORY_CACHE";
pub const ENV_CACHE_DIR: &str = "SVC_FACTORY_CACHE_DIR";
pub const ENV_CACHE_TTL: &str = "SVC_FACTORY_CACHE_TTL";
pub const ENV_STRICT_TYPES: &str = "SVC_FACTORY_STRICT_TYPES";
pub const ENV_LOG: &str = "SVC_FACTORY_LOG";

pub const CONFIG_FILE_NAME: &str = "svc-factory.toml";
const USER_CONFIG_DIR: &str = "~/.config/svc-factory";

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default paths
    pub fn new() -> Self {
        Self { base_path: None }
    }

    /// Create a config loader with custom base path (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
        }
    }

    /// Load configuration from the default user location, then the environment
    pub fn load_config(&self) -> Result<FactoryConfig, ConfigError> {
        let path = self.default_config_path();
        let partial = if path.exists() {
            self.load_partial_config(&path)?
        } else {
            tracing::debug!("no configuration file at {}, using defaults", path.display());
            PartialFactoryConfig::default()
        };
        self.finish(partial)
    }

    /// Load configuration from an explicit file, then the environment
    pub fn load_from(&self, path: &PathBuf) -> Result<FactoryConfig, ConfigError> {
        let partial = self.load_partial_config(path)?;
        self.finish(partial)
    }

    fn finish(&self, partial: PartialFactoryConfig) -> Result<FactoryConfig, ConfigError> {
        let mut config = FactoryConfig::from_partial(partial);
        apply_env_overrides(&mut config, &self.collect_env_vars())?;
        Ok(config)
    }

    /// Path of the user configuration file, with tilde expansion and base path override
    pub fn default_config_path(&self) -> PathBuf {
        let base = if let Some(base_path) = &self.base_path {
            base_path.join(USER_CONFIG_DIR.trim_start_matches("~/"))
        } else {
            PathBuf::from(shellexpand::tilde(USER_CONFIG_DIR).as_ref())
        };
        base.join(CONFIG_FILE_NAME)
    }

    fn load_partial_config(&self, path: &PathBuf) -> Result<PartialFactoryConfig, ConfigError> {
        let path_str = path.display().to_string();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path_str.clone(), e))?;
        let partial =
            toml::from_str(&content).map_err(|e| ConfigError::TomlParse(path_str.clone(), e))?;
        tracing::info!("Configuration loaded from {}", path_str);
        Ok(partial)
    }

    fn collect_env_vars(&self) -> HashMap<String, String> {
        [
            ENV_SOURCE,
            ENV_CACHE,
            ENV_CACHE_DIR,
            ENV_CACHE_TTL,
            ENV_STRICT_TYPES,
            ENV_LOG,
        ]
        .iter()
        .filter_map(|key| env::var(key).ok().map(|value| (key.to_string(), value)))
        .collect()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `SVC_FACTORY_*` overrides on top of file configuration
pub fn apply_env_overrides(
    config: &mut FactoryConfig,
    env_map: &HashMap<String, String>,
) -> Result<(), ConfigError> {
    let invalid = |key: &str, value: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };

    if let Some(source) = env_map.get(ENV_SOURCE) {
        config.source = Some(PathBuf::from(shellexpand::tilde(source).as_ref()));
    }
    if let Some(backend) = env_map.get(ENV_CACHE) {
        config.cache.backend = backend.parse().map_err(|_| invalid(ENV_CACHE, backend))?;
    }
    if let Some(dir) = env_map.get(ENV_CACHE_DIR) {
        config.cache.dir = PathBuf::from(shellexpand::tilde(dir).as_ref());
    }
    if let Some(ttl) = env_map.get(ENV_CACHE_TTL) {
        config.cache.ttl_secs = ttl.trim().parse().map_err(|_| invalid(ENV_CACHE_TTL, ttl))?;
    }
    if let Some(strict) = env_map.get(ENV_STRICT_TYPES) {
        config.strict_types = match strict.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => return Err(invalid(ENV_STRICT_TYPES, strict)),
        };
    }
    if let Some(level) = env_map.get(ENV_LOG) {
        config.log_level = level.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheBackend;

    #[test]
    fn default_path_honours_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::with_base_path(dir.path().to_path_buf());
        let path = loader.default_config_path();
        assert!(path.starts_with(dir.path()));
        assert!(path.ends_with(".config/svc-factory/svc-factory.toml"));
        assert!(!path.exists());
    }

    #[test]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factory.toml");
        fs::write(
            &path,
            "source = \"defs.json\"\n[cache]\nbackend = \"file\"\ndir = \"/tmp/svc\"\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .load_partial_config(&path)
            .map(FactoryConfig::from_partial)
            .unwrap();
        assert_eq!(config.source, Some(PathBuf::from("defs.json")));
        assert_eq!(config.cache.backend, CacheBackend::File);
        assert_eq!(config.cache.dir, PathBuf::from("/tmp/svc"));
    }

    #[test]
    fn bad_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factory.toml");
        fs::write(&path, "source = [").unwrap();

        let err = ConfigLoader::new().load_partial_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(..)));
    }

    #[test]
    fn env_overrides_win() {
        let mut config = FactoryConfig::default();
        let env_map: HashMap<String, String> = [
            (ENV_CACHE, "memory"),
            (ENV_CACHE_TTL, "15"),
            (ENV_STRICT_TYPES, "yes"),
            (ENV_SOURCE, "/etc/services.toml"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        apply_env_overrides(&mut config, &env_map).unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl_secs, 15);
        assert!(config.strict_types);
        assert_eq!(config.source, Some(PathBuf::from("/etc/services.toml")));
    }

    #[test]
    fn invalid_env_values_are_rejected() {
        let mut config = FactoryConfig::default();
        let env_map: HashMap<String, String> =
            [(ENV_CACHE_TTL.to_string(), "soon".to_string())].into_iter().collect();

        let err = apply_env_overrides(&mut config, &env_map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENV_CACHE_TTL));
    }
}
