//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义服务注册和依赖解析的核心接口。
//!
//! ## 核心接口
//!
//! - [`Capability`] / [`CapabilityKey`] - 服务能力标识
//! - [`ServiceDescriptor`] - 服务描述符（工厂 + 生命周期）
//! - [`ServiceResolver`] - 服务解析器接口
//! - [`CircularDependencyDetector`] - 循环依赖检测器接口

pub mod capability;
pub mod container;
pub mod descriptor;
pub mod detector;
pub mod resolver;

pub use capability::*;
pub use container::*;
pub use descriptor::*;
pub use detector::*;
pub use resolver::*;
