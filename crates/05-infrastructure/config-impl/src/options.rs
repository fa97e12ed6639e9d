//! 配置监视器实现

use config_abstractions::{OptionsMonitor, ReloadableOptions};
use infrastructure_common::{ConfigError, ConfigSection, Configurable};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// 基于 `watch` 通道的配置监视器
///
/// 只有配置节内容真正变化且通过验证时才发布新值。
pub struct SettingsMonitor<T: Configurable> {
    section_name: String,
    sender: watch::Sender<Arc<T>>,
    last_section: Mutex<Value>,
}

impl<T: Configurable> SettingsMonitor<T> {
    /// 以配置节绑定初始值
    pub fn bind(section: &ConfigSection) -> Result<Self, ConfigError> {
        let value: T = section.bind_validated()?;
        Ok(Self::with_initial(value, section.to_value()))
    }

    fn with_initial(value: T, raw: Value) -> Self {
        let (sender, _) = watch::channel(Arc::new(value));
        Self {
            section_name: T::section_name().to_string(),
            sender,
            last_section: Mutex::new(raw),
        }
    }
}

impl<T: Configurable> OptionsMonitor<T> for SettingsMonitor<T> {
    fn current_value(&self) -> Arc<T> {
        self.sender.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Arc<T>> {
        self.sender.subscribe()
    }
}

impl<T: Configurable> ReloadableOptions for SettingsMonitor<T> {
    fn section_name(&self) -> &str {
        &self.section_name
    }

    fn apply(&self, section: &ConfigSection) -> Result<bool, ConfigError> {
        let raw = section.to_value();
        let mut last = self.last_section.lock();
        if *last == raw {
            debug!("配置节 {} 未变化", self.section_name);
            return Ok(false);
        }

        let value: T = section.bind_validated()?;
        self.sender.send_replace(Arc::new(value));
        *last = raw;
        info!("配置节 {} 已更新", self.section_name);
        Ok(true)
    }
}

impl<T: Configurable + std::fmt::Debug> std::fmt::Debug for SettingsMonitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsMonitor")
            .field("section_name", &self.section_name)
            .field("current", &self.current_value())
            .finish()
    }
}
