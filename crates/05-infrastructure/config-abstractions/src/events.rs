//! 配置变更事件定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 配置变更事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigChangeEvent {
    /// 事件类型
    pub event_type: ConfigChangeEventType,
    /// 变更路径，文件事件为文件路径，配置事件为配置节名称
    pub path: String,
    /// 事件时间
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// 事件来源
    pub source: String,
    /// 额外元数据
    pub metadata: HashMap<String, String>,
}

impl ConfigChangeEvent {
    fn new(
        event_type: ConfigChangeEventType,
        path: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            path: path.into(),
            timestamp: chrono::Utc::now(),
            source: source.into(),
            metadata: HashMap::new(),
        }
    }

    /// 配置文件被修改或替换
    pub fn file_changed(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let path: PathBuf = path.into();
        Self::new(
            ConfigChangeEventType::FileChanged,
            path.to_string_lossy(),
            source,
        )
    }

    /// 配置文件被删除
    pub fn file_removed(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let path: PathBuf = path.into();
        Self::new(
            ConfigChangeEventType::FileRemoved,
            path.to_string_lossy(),
            source,
        )
    }

    /// 配置节已重新加载
    pub fn reloaded(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(ConfigChangeEventType::Reloaded, path, source)
    }

    /// 配置重载失败
    pub fn reload_failed(
        path: impl Into<String>,
        source: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(ConfigChangeEventType::ReloadFailed, path, source).with_metadata("reason", reason)
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 是否需要触发重载
    pub fn requires_reload(&self) -> bool {
        matches!(
            self.event_type,
            ConfigChangeEventType::FileChanged | ConfigChangeEventType::FileRemoved
        )
    }
}

/// 配置变更事件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigChangeEventType {
    /// 配置文件修改
    FileChanged,
    /// 配置文件删除
    FileRemoved,
    /// 配置重载完成
    Reloaded,
    /// 配置重载失败
    ReloadFailed,
}
