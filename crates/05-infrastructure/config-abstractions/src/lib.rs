//! # Configuration Abstractions
//!
//! 配置管理抽象层，定义配置管理的核心接口和约定。
//!
//! ## 核心接口
//!
//! - [`ConfigProvider`] - 配置提供者接口
//! - [`Options`] / [`OptionsMonitor`] - 强类型配置快照与实时值
//! - [`ReloadableOptions`] - 重载后刷新选项
//! - [`ConfigWatcher`] - 配置监控接口

pub mod events;
pub mod options;
pub mod provider;
pub mod watcher;

pub use events::*;
pub use options::*;
pub use provider::*;
pub use watcher::*;
