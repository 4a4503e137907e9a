//! 服务容器
//!
//! 构造器注册、实例记忆化与工厂门面。

pub mod constructor;
pub mod factory;
mod registry;

pub use constructor::{
    parsed_param, required_param, ConstructorRegistry, FnConstructor, Instance, ServiceConstructor,
};
pub use factory::{Registration, ServiceFactory, ServiceFactoryBuilder, ServiceMap};
pub use registry::FactoryStats;
