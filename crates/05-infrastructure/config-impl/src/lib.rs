//! # Configuration Implementation
//!
//! 配置管理的具体实现，提供各种配置源和管理功能。
//!
//! ## 主要组件
//!
//! - [`ConfigurationManager`] - 按优先级合并多个配置源
//! - [`JsonConfigProvider`] / [`TomlConfigProvider`] - 文件配置提供者
//! - [`EnvironmentConfigProvider`] - 环境变量配置提供者
//! - [`InMemoryConfigProvider`] - 内存配置提供者
//! - [`SettingsMonitor`] - 可热重载的强类型配置
//! - [`ConfigFileWatcher`] - 基于 notify 的配置文件监控

pub mod manager;
pub mod options;
pub mod providers;
pub mod watcher;

#[cfg(test)]
mod tests;

pub use manager::*;
pub use options::*;
pub use providers::*;
pub use watcher::*;
