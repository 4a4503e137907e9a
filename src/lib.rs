pub mod cache;
pub mod config;
pub mod definition;
pub mod errors;
pub mod infrastructure;
pub mod logging;

// Re-export commonly used items for convenience
pub use cache::{CacheAdapter, CacheStatus, MemoryCacheAdapter};
#[cfg(feature = "file-cache")]
pub use cache::FileCacheAdapter;
pub use config::{ConfigLoader, FactoryConfig};
pub use definition::{
    DefinitionReader, DefinitionTable, FileReader, Params, RawDefinition, ResolvedDefinition,
    StaticReader, TextReader,
};
pub use errors::{ConstructError, FactoryError, Result};
pub use infrastructure::container::{
    ConstructorRegistry, FactoryStats, Instance, Registration, ServiceFactory,
    ServiceFactoryBuilder, ServiceMap,
};
