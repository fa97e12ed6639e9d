//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn Basics 基础设施层的公共类型和工具。
//!
//! ## 核心内容
//!
//! - [`Lifetime`] - 服务生命周期（单例 / 作用域 / 瞬时）
//! - [`ScopeInfo`] - 作用域标识信息
//! - [`ConfigSection`] / [`Configurable`] - 配置节与强类型配置绑定
//! - [`DependencyError`] / [`ConfigError`] / [`InfrastructureError`] - 错误分类
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统的编译时安全
//! - 显式的所有权与生命周期，不依赖全局可变状态
//! - 启动期快速失败，运行期不重试

mod binding;
pub mod configuration;
pub mod errors;
pub mod lifecycle;

pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
