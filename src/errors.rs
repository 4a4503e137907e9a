use thiserror::Error;

/// Library-wide result alias.
pub type Result<T, E = FactoryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Failed to read definition source '{source_id}': {reason}")]
    SourceRead { source_id: String, reason: String },
    #[error("Include cycle detected at '{path}'")]
    IncludeCycle { path: String },
    #[error("Service '{child}' extends '{missing_parent}', which is not defined before it")]
    DefinitionResolution {
        child: String,
        missing_parent: String,
    },
    #[error("Service '{name}' has no type and does not extend another service")]
    UntypedDefinition { name: String },
    #[error("No service is defined under the name '{name}'")]
    UnknownService { name: String },
    #[error("Failed to construct service '{name}': {source}")]
    ServiceConstruction {
        name: String,
        #[source]
        source: ConstructError,
    },
    #[error("Service '{name}' is not an instance of {expected}")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("Cache adapter error: {0}")]
    Cache(String),
}

impl FactoryError {
    pub fn source_read(source_id: impl Into<String>, reason: impl ToString) -> Self {
        FactoryError::SourceRead {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures that abort building the whole factory.
    pub fn is_fatal_to_build(&self) -> bool {
        matches!(
            self,
            FactoryError::SourceRead { .. }
                | FactoryError::IncludeCycle { .. }
                | FactoryError::DefinitionResolution { .. }
                | FactoryError::UntypedDefinition { .. }
        )
    }
}

/// Errors raised by a service constructor.
#[derive(Debug, Error)]
pub enum ConstructError {
    #[error("no constructor registered for type '{0}'")]
    UnknownType(String),
    #[error("required parameter '{0}' is missing")]
    MissingParam(String),
    #[error("parameter '{key}' is invalid: {reason}")]
    InvalidParam { key: String, reason: String },
    #[error("directly registered instances cannot be rebuilt")]
    NotConstructible,
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}
