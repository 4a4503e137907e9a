//! 服务工厂
//!
//! 读取器 -> 缓存 -> 解析器 -> 实例注册表 的编排入口。
//! 定义表构建后只读；注册与注销总是替换为新表。

use super::constructor::{ConstructorRegistry, Instance, ServiceConstructor};
use super::registry::{FactoryStats, InstanceRegistry};
use crate::cache::{self, CacheAdapter, CacheStatus, MemoryCacheAdapter};
use crate::config::{CacheBackend, FactoryConfig};
use crate::definition::resolver::resolve_against;
use crate::definition::{
    resolve, DefinitionReader, DefinitionTable, FileReader, Params, RawDefinition,
    ResolvedDefinition,
};
use crate::errors::{ConstructError, FactoryError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// 注册内容：定义或现成实例
pub enum Registration {
    /// 已解析的定义
    Definition(ResolvedDefinition),
    /// 原始定义，`extends` 在当前定义表中解析
    Raw(RawDefinition),
    /// 直接注册的实例，跳过构造
    Instance(Instance),
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Registration::Definition(d) => f.debug_tuple("Definition").field(d).finish(),
            Registration::Raw(d) => f.debug_tuple("Raw").field(d).finish(),
            Registration::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

struct FactoryInner {
    table: RwLock<Arc<DefinitionTable>>,
    instances: InstanceRegistry,
    constructors: ConstructorRegistry,
    cache_status: CacheStatus,
    source_id: Option<String>,
}

/// 声明式服务工厂，克隆后共享状态
#[derive(Clone)]
pub struct ServiceFactory {
    inner: Arc<FactoryInner>,
}

impl ServiceFactory {
    pub fn builder() -> ServiceFactoryBuilder {
        ServiceFactoryBuilder::new()
    }

    /// 从现成的定义表创建（不经过读取器与缓存）
    pub fn from_table(table: DefinitionTable, constructors: ConstructorRegistry) -> Self {
        Self::assemble(table, constructors, CacheStatus::Disabled, None)
    }

    fn assemble(
        table: DefinitionTable,
        constructors: ConstructorRegistry,
        cache_status: CacheStatus,
        source_id: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(FactoryInner {
                table: RwLock::new(Arc::new(table)),
                instances: InstanceRegistry::new(),
                constructors,
                cache_status,
                source_id,
            }),
        }
    }

    /// 获取记忆化实例，首次访问时构造
    pub async fn get(&self, name: &str) -> Result<Instance> {
        self.get_with(name, false).await
    }

    /// 构造一个一次性实例，不影响记忆化实例
    pub async fn get_throwaway(&self, name: &str) -> Result<Instance> {
        self.get_with(name, true).await
    }

    pub async fn get_with(&self, name: &str, throwaway: bool) -> Result<Instance> {
        if throwaway {
            let definition = self.lookup(name)?;
            self.inner.instances.record_throwaway();
            log::debug!("building throwaway instance of '{name}'");
            return self.construct(&definition);
        }

        // 在读锁内同时取定义与槽位，使注册/注销与首次构造保持一致
        let (definition, slot) = {
            let table = self.inner.table.read();
            let definition = table
                .get(name)
                .cloned()
                .ok_or_else(|| FactoryError::UnknownService {
                    name: name.to_string(),
                })?;
            (definition, self.inner.instances.slot(name))
        };

        self.inner
            .instances
            .get_or_create(slot, || {
                log::debug!("constructing service '{name}' of type '{}'", definition.type_name);
                self.construct(&definition)
            })
            .await
    }

    /// 获取实例并向下转型
    pub async fn get_as<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let instance = self.get(name).await?;
        instance
            .downcast::<T>()
            .map_err(|_| FactoryError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    fn lookup(&self, name: &str) -> Result<ResolvedDefinition> {
        self.inner
            .table
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FactoryError::UnknownService {
                name: name.to_string(),
            })
    }

    fn construct(&self, definition: &ResolvedDefinition) -> Result<Instance> {
        let result = if definition.is_direct() {
            Err(ConstructError::NotConstructible)
        } else {
            self.inner
                .constructors
                .construct(&definition.type_name, &definition.params)
        };
        result.map_err(|source| FactoryError::ServiceConstruction {
            name: definition.name.clone(),
            source,
        })
    }

    /// 插入或替换定义/实例；已有的记忆化实例被丢弃或替换
    pub fn register(&self, name: &str, registration: Registration) -> Result<()> {
        let mut table = self.inner.table.write();
        match registration {
            Registration::Definition(mut definition) => {
                definition.name = name.to_string();
                *table = Arc::new(table.with_definition(definition));
                self.inner.instances.remove(name);
            }
            Registration::Raw(mut raw) => {
                raw.name = name.to_string();
                let definition = resolve_against(&table, &raw)?;
                *table = Arc::new(table.with_definition(definition));
                self.inner.instances.remove(name);
            }
            Registration::Instance(instance) => {
                *table = Arc::new(table.with_definition(ResolvedDefinition::direct(name)));
                self.inner.instances.insert(name, instance);
            }
        }
        log::debug!("registered service '{name}'");
        Ok(())
    }

    /// 移除定义与实例，返回名称此前是否存在
    pub fn unregister(&self, name: &str) -> bool {
        let mut table = self.inner.table.write();
        let existed = table.contains(name);
        if existed {
            *table = Arc::new(table.without(name));
        }
        self.inner.instances.remove(name);
        existed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.table.read().contains(name)
    }

    /// 所有服务名（声明顺序）
    pub fn names(&self) -> Vec<String> {
        self.inner.table.read().names()
    }

    /// Names whose memoized instance has been built.
    pub fn built_names(&self) -> Vec<String> {
        let table = self.inner.table.read();
        let mut built = self.inner.instances.built_names();
        built.retain(|name| table.contains(name));
        built
    }

    pub fn is_built(&self, name: &str) -> bool {
        self.inner.instances.peek(name).is_some()
    }

    pub fn definition(&self, name: &str) -> Option<ResolvedDefinition> {
        self.inner.table.read().get(name).cloned()
    }

    /// 当前定义表快照
    pub fn table(&self) -> Arc<DefinitionTable> {
        self.inner.table.read().clone()
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.inner.cache_status
    }

    pub fn source_id(&self) -> Option<&str> {
        self.inner.source_id.as_deref()
    }

    pub fn stats(&self) -> FactoryStats {
        self.inner.instances.stats()
    }

    /// Checks every constructible definition has a registered constructor.
    pub fn validate_types(&self) -> Result<()> {
        validate_types(&self.table(), &self.inner.constructors)
    }
}

impl fmt::Debug for ServiceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFactory")
            .field("services", &self.names())
            .field("built", &self.built_names())
            .field("cache_status", &self.inner.cache_status)
            .field("source_id", &self.inner.source_id)
            .finish()
    }
}

fn validate_types(table: &DefinitionTable, constructors: &ConstructorRegistry) -> Result<()> {
    match table
        .iter()
        .find(|d| !d.is_direct() && !constructors.contains(&d.type_name))
    {
        Some(definition) => Err(FactoryError::ServiceConstruction {
            name: definition.name.clone(),
            source: ConstructError::UnknownType(definition.type_name.clone()),
        }),
        None => Ok(()),
    }
}

/// 服务工厂建造者
pub struct ServiceFactoryBuilder {
    reader: Option<Box<dyn DefinitionReader>>,
    cache: Option<Arc<dyn CacheAdapter>>,
    ttl: Duration,
    constructors: ConstructorRegistry,
    strict_types: bool,
}

impl ServiceFactoryBuilder {
    pub fn new() -> Self {
        Self {
            reader: None,
            cache: None,
            ttl: DEFAULT_TTL,
            constructors: ConstructorRegistry::new(),
            strict_types: false,
        }
    }

    /// 按配置装配读取器与缓存适配器
    pub fn from_config(config: &FactoryConfig) -> Self {
        let mut builder = Self::new()
            .ttl(config.cache.ttl())
            .strict_types(config.strict_types);

        if let Some(source) = &config.source {
            builder = builder.reader(FileReader::new(source));
        }

        match config.cache.backend {
            CacheBackend::None => {}
            CacheBackend::Memory => {
                builder = builder.cache(Arc::new(MemoryCacheAdapter::new(config.cache.capacity)));
            }
            #[cfg(feature = "file-cache")]
            CacheBackend::File => {
                builder = builder.cache(Arc::new(cache::FileCacheAdapter::new(&config.cache.dir)));
            }
            #[cfg(not(feature = "file-cache"))]
            CacheBackend::File => {
                log::warn!("file cache requested but the file-cache feature is disabled");
            }
        }

        builder
    }

    pub fn reader<R: DefinitionReader + 'static>(mut self, reader: R) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    pub fn cache(mut self, adapter: Arc<dyn CacheAdapter>) -> Self {
        self.cache = Some(adapter);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// 注册某个类型标识的构造闭包
    pub fn constructor<T, F>(mut self, type_name: impl Into<String>, construct_fn: F) -> Self
    where
        F: Fn(&Params) -> std::result::Result<T, ConstructError> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.constructors.register(type_name, construct_fn);
        self
    }

    pub fn service_constructor<C: ServiceConstructor + 'static>(
        mut self,
        type_name: impl Into<String>,
        constructor: C,
    ) -> Self {
        self.constructors.register_constructor(type_name, constructor);
        self
    }

    pub fn constructors(mut self, constructors: ConstructorRegistry) -> Self {
        self.constructors = constructors;
        self
    }

    pub fn strict_types(mut self, strict: bool) -> Self {
        self.strict_types = strict;
        self
    }

    /// 读取、解析（或从缓存加载）定义表并创建工厂
    pub async fn build(self) -> Result<ServiceFactory> {
        let Self {
            reader,
            cache,
            ttl,
            constructors,
            strict_types,
        } = self;

        let Some(reader) = reader else {
            return Ok(ServiceFactory::assemble(
                DefinitionTable::new(),
                constructors,
                CacheStatus::Disabled,
                None,
            ));
        };

        let source_id = reader.source_id();
        let (table, status) = cache::load_or_build(&source_id, ttl, cache.as_deref(), || {
            let raw = reader.read()?;
            resolve(&raw)
        })
        .await?;

        log::info!(
            "definition table ready: {} services from {source_id} (cache: {status:?})",
            table.len()
        );

        if strict_types {
            validate_types(&table, &constructors)?;
        }

        Ok(ServiceFactory::assemble(table, constructors, status, Some(source_id)))
    }
}

impl Default for ServiceFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 类映射访问接口
#[async_trait]
pub trait ServiceMap {
    /// 等同于 `contains`
    fn exists(&self, name: &str) -> bool;

    /// 等同于非一次性的 `get`
    async fn get(&self, name: &str) -> Result<Instance>;

    /// 等同于以实例 `register`
    fn set(&self, name: &str, instance: Instance);

    /// 等同于 `unregister`
    fn remove(&self, name: &str) -> bool;
}

#[async_trait]
impl ServiceMap for ServiceFactory {
    fn exists(&self, name: &str) -> bool {
        self.contains(name)
    }

    async fn get(&self, name: &str) -> Result<Instance> {
        ServiceFactory::get(self, name).await
    }

    fn set(&self, name: &str, instance: Instance) {
        if let Err(e) = self.register(name, Registration::Instance(instance)) {
            log::warn!("failed to set service '{name}': {e}");
        }
    }

    fn remove(&self, name: &str) -> bool {
        self.unregister(name)
    }
}
