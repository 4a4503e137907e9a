use serde::Deserialize;
use std::path::PathBuf;

/// Which cache adapter backs the definition table.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    None,
    Memory,
    File,
}

impl std::str::FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "" => Ok(CacheBackend::None),
            "memory" => Ok(CacheBackend::Memory),
            "file" => Ok(CacheBackend::File),
            other => Err(format!("unknown cache backend '{other}' (expected none, memory or file)")),
        }
    }
}

/// Definition cache settings
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    /// Lifetime of a cached definition table in seconds
    pub ttl_secs: u64,
    /// Directory used by the file backend
    pub dir: PathBuf,
    /// Entry capacity of the memory backend
    pub capacity: usize,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialCacheSettings {
    pub backend: Option<CacheBackend>,
    pub ttl_secs: Option<u64>,
    pub dir: Option<String>,
    pub capacity: Option<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from_partial(None)
    }
}

impl CacheSettings {
    pub fn from_partial(partial: Option<PartialCacheSettings>) -> Self {
        let partial = partial.unwrap_or_default();
        Self {
            backend: partial.backend.unwrap_or_default(),
            ttl_secs: partial.ttl_secs.unwrap_or_else(default_ttl_secs),
            dir: partial
                .dir
                .map(|dir| PathBuf::from(shellexpand::tilde(&dir).as_ref()))
                .unwrap_or_else(default_cache_dir),
            capacity: partial.capacity.unwrap_or_else(default_capacity),
        }
    }

    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_secs)
    }
}

/// Top-level factory configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FactoryConfig {
    /// Definition file (`.toml` or `.json`)
    pub source: Option<PathBuf>,
    pub cache: CacheSettings,
    /// Reject definitions whose type has no registered constructor at build time
    pub strict_types: bool,
    pub log_level: String,
}

/// Partial configuration as read from a file
#[derive(Deserialize, Debug, Default)]
pub struct PartialFactoryConfig {
    pub source: Option<String>,
    pub cache: Option<PartialCacheSettings>,
    pub strict_types: Option<bool>,
    pub log_level: Option<String>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self::from_partial(PartialFactoryConfig::default())
    }
}

impl FactoryConfig {
    pub fn from_partial(partial: PartialFactoryConfig) -> Self {
        Self {
            source: partial
                .source
                .map(|source| PathBuf::from(shellexpand::tilde(&source).as_ref())),
            cache: CacheSettings::from_partial(partial.cache),
            strict_types: partial.strict_types.unwrap_or(false),
            log_level: partial.log_level.unwrap_or_else(default_log_level),
        }
    }
}

// Default functions
fn default_ttl_secs() -> u64 {
    3600
}

fn default_capacity() -> usize {
    64
}

/// `<platform cache dir>/svc-factory`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("svc-factory")
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = FactoryConfig::default();
        assert_eq!(config.source, None);
        assert_eq!(config.cache.backend, CacheBackend::None);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.cache.capacity, 64);
        assert!(config.cache.dir.ends_with("svc-factory"));
        assert!(!config.strict_types);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_toml_overrides() {
        let partial: PartialFactoryConfig = toml::from_str(
            r#"
source = "services.toml"
strict_types = true

[cache]
backend = "memory"
ttl_secs = 30
"#,
        )
        .unwrap();
        let config = FactoryConfig::from_partial(partial);

        assert_eq!(config.source, Some(PathBuf::from("services.toml")));
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl().as_secs(), 30);
        assert!(config.strict_types);
    }

    #[test]
    fn backend_parses_from_text() {
        assert_eq!("FILE".parse::<CacheBackend>(), Ok(CacheBackend::File));
        assert_eq!("off".parse::<CacheBackend>(), Ok(CacheBackend::None));
        assert!("redis".parse::<CacheBackend>().is_err());
    }
}
