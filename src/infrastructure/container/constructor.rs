//! 构造能力
//!
//! 类型标识 -> 构造函数 的注册表。工厂只通过这里创建实例，
//! 不了解实例的具体类型。

use crate::definition::Params;
use crate::errors::ConstructError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 类型擦除的服务实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 服务构造器trait
pub trait ServiceConstructor: Send + Sync {
    /// 根据已解析的参数创建实例
    fn construct(&self, params: &Params) -> Result<Instance, ConstructError>;

    /// 实例的 Rust 类型名称（用于诊断）
    fn instance_type_name(&self) -> &'static str;
}

/// 函数式构造器
pub struct FnConstructor<F, T> {
    construct_fn: F,
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<F, T> FnConstructor<F, T> {
    pub fn new(construct_fn: F) -> Self {
        Self {
            construct_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<F, T> ServiceConstructor for FnConstructor<F, T>
where
    F: Fn(&Params) -> Result<T, ConstructError> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn construct(&self, params: &Params) -> Result<Instance, ConstructError> {
        let service = (self.construct_fn)(params)?;
        Ok(Arc::new(service))
    }

    fn instance_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// 构造器注册表
#[derive(Clone, Default)]
pub struct ConstructorRegistry {
    constructors: HashMap<String, Arc<dyn ServiceConstructor>>,
}

impl ConstructorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以闭包注册某个类型标识的构造函数，同名覆盖
    pub fn register<T, F>(&mut self, type_name: impl Into<String>, construct_fn: F)
    where
        F: Fn(&Params) -> Result<T, ConstructError> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.register_constructor(type_name, FnConstructor::<F, T>::new(construct_fn));
    }

    pub fn register_constructor<C>(&mut self, type_name: impl Into<String>, constructor: C)
    where
        C: ServiceConstructor + 'static,
    {
        self.constructors
            .insert(type_name.into(), Arc::new(constructor));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// 构造实例；未注册的类型立即失败
    pub fn construct(&self, type_name: &str, params: &Params) -> Result<Instance, ConstructError> {
        let constructor = self
            .constructors
            .get(type_name)
            .ok_or_else(|| ConstructError::UnknownType(type_name.to_string()))?;
        constructor.construct(params)
    }
}

impl fmt::Debug for ConstructorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.constructors
                    .iter()
                    .map(|(name, c)| (name, c.instance_type_name())),
            )
            .finish()
    }
}

/// Looks up a required parameter.
pub fn required_param<'a>(params: &'a Params, key: &str) -> Result<&'a str, ConstructError> {
    params
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ConstructError::MissingParam(key.to_string()))
}

/// Parses an optional parameter, falling back to `default` when absent.
pub fn parsed_param<T>(params: &Params, key: &str, default: T) -> Result<T, ConstructError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match params.get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConstructError::InvalidParam {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Client {
        user: String,
        retries: u32,
    }

    fn registry() -> ConstructorRegistry {
        let mut registry = ConstructorRegistry::new();
        registry.register("client", |params: &Params| {
            Ok(Client {
                user: required_param(params, "user")?.to_string(),
                retries: parsed_param(params, "retries", 1)?,
            })
        });
        registry
    }

    #[test]
    fn constructs_registered_type() {
        let mut params = Params::new();
        params.insert("user".to_string(), "michael".to_string());
        params.insert("retries".to_string(), "3".to_string());

        let instance = registry().construct("client", &params).unwrap();
        let client = instance.downcast_ref::<Client>().unwrap();
        assert_eq!(client.user, "michael");
        assert_eq!(client.retries, 3);
    }

    #[test]
    fn unknown_type_fails_fast() {
        let err = registry().construct("ghost", &Params::new()).unwrap_err();
        assert!(matches!(err, ConstructError::UnknownType(ref t) if t == "ghost"));
    }

    #[test]
    fn param_errors_surface() {
        let err = registry().construct("client", &Params::new()).unwrap_err();
        assert!(matches!(err, ConstructError::MissingParam(ref k) if k == "user"));

        let mut params = Params::new();
        params.insert("user".to_string(), "u".to_string());
        params.insert("retries".to_string(), "many".to_string());
        let err = registry().construct("client", &params).unwrap_err();
        assert!(matches!(err, ConstructError::InvalidParam { ref key, .. } if key == "retries"));
    }

    #[test]
    fn debug_lists_instance_types() {
        let rendered = format!("{:?}", registry());
        assert!(rendered.contains("client"));
        assert!(rendered.contains("Client"));
        assert_eq!(registry().type_names(), vec!["client"]);
    }
}
