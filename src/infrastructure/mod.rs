//! 基础设施层
//!
//! 提供服务工厂的运行时部分：构造器、实例注册表与工厂门面。

pub mod container;

pub use container::{
    ConstructorRegistry, FactoryStats, Instance, Registration, ServiceConstructor, ServiceFactory,
    ServiceFactoryBuilder, ServiceMap,
};
