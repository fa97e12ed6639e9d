//! 配置监控抽象接口

use crate::events::ConfigChangeEvent;
use async_trait::async_trait;
use infrastructure_common::ConfigError;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// 配置监控器 trait
///
/// 监控配置变更并发送事件通知
#[async_trait]
pub trait ConfigWatcher: Send + Sync {
    /// 开始监控
    async fn start_watching(&mut self) -> Result<(), ConfigError>;

    /// 停止监控
    async fn stop_watching(&mut self) -> Result<(), ConfigError>;

    /// 添加监控路径
    async fn add_watch_path(&mut self, path: &Path) -> Result<(), ConfigError>;

    /// 移除监控路径
    async fn remove_watch_path(&mut self, path: &Path) -> Result<(), ConfigError>;

    /// 取走变更事件接收器，只能取一次
    fn take_change_receiver(&mut self) -> Option<mpsc::Receiver<ConfigChangeEvent>>;

    /// 是否正在监控
    fn is_watching(&self) -> bool;

    /// 获取监控路径列表
    fn get_watched_paths(&self) -> Vec<PathBuf>;
}

/// 文件过滤器 trait
pub trait FileFilter: Send + Sync {
    /// 检查文件是否应该被监控
    fn should_watch(&self, path: &Path) -> bool;

    /// 获取过滤器名称
    fn name(&self) -> &str;
}

/// 扩展名文件过滤器
#[derive(Debug, Clone)]
pub struct ExtensionFileFilter {
    extensions: Vec<String>,
}

impl ExtensionFileFilter {
    /// 创建新的扩展名过滤器
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// 宿主支持的配置文件格式
    pub fn config_files() -> Self {
        Self::new(vec!["json".to_string(), "toml".to_string()])
    }
}

impl FileFilter for ExtensionFileFilter {
    fn should_watch(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|extension| {
                self.extensions
                    .iter()
                    .any(|ext| ext.eq_ignore_ascii_case(extension))
            })
    }

    fn name(&self) -> &str {
        "ExtensionFileFilter"
    }
}
