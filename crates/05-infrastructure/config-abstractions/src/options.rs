//! 强类型配置选项抽象
//!
//! [`Options`] 是启动时绑定的快照；[`OptionsMonitor`] 始终返回最新值，
//! 配置重载后由宿主通过 [`ReloadableOptions::apply`] 刷新。

use infrastructure_common::{ConfigError, ConfigSection};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::watch;

/// 配置快照
///
/// 启动时绑定一次，之后不随配置重载变化。
pub struct Options<T> {
    value: Arc<T>,
}

impl<T> Options<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    /// 从已有的共享值创建
    pub fn from_shared(value: Arc<T>) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn shared(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }
}

impl<T> Clone for Options<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Deref for Options<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Options<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Options").field(&self.value).finish()
    }
}

/// 配置监视器 trait
///
/// 读取方每次调用 `current_value()` 都会拿到最近一次成功绑定的值。
pub trait OptionsMonitor<T>: Send + Sync {
    /// 当前值
    fn current_value(&self) -> Arc<T>;

    /// 订阅后续变更
    fn subscribe(&self) -> watch::Receiver<Arc<T>>;
}

/// 可被宿主在重载后刷新的选项
pub trait ReloadableOptions: Send + Sync {
    /// 绑定的配置节名称
    fn section_name(&self) -> &str;

    /// 用新的配置节重新绑定，失败时保留旧值
    fn apply(&self, section: &ConfigSection) -> Result<bool, ConfigError>;
}
