//! 配置监控器实现
//!
//! 监控配置文件所在目录而不是文件本身，编辑器以替换方式保存文件时也能收到事件。

use async_trait::async_trait;
use config_abstractions::{ConfigChangeEvent, ConfigWatcher, ExtensionFileFilter, FileFilter};
use infrastructure_common::ConfigError;
use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const EVENT_SOURCE: &str = "ConfigFileWatcher";

/// 被监控的文件
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WatchedFile {
    /// 调用方给出的路径
    requested: PathBuf,
    /// 规范化后的目录
    directory: PathBuf,
    /// 规范化后的完整路径
    resolved: PathBuf,
}

impl WatchedFile {
    fn resolve(path: &Path) -> Result<Self, ConfigError> {
        let file_name = path.file_name().ok_or_else(|| ConfigError::WatchError {
            message: format!("无效的监控路径: {}", path.display()),
        })?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let directory = parent.canonicalize().map_err(|e| ConfigError::WatchError {
            message: format!("无法解析监控目录 {}: {}", parent.display(), e),
        })?;

        Ok(Self {
            requested: path.to_path_buf(),
            resolved: directory.join(file_name),
            directory,
        })
    }
}

/// 配置文件监控器实现
pub struct ConfigFileWatcher {
    /// 文件系统监控器
    watcher: Option<notify::RecommendedWatcher>,
    /// 配置变更事件发送器
    change_sender: mpsc::Sender<ConfigChangeEvent>,
    /// 配置变更事件接收器
    change_receiver: Option<mpsc::Receiver<ConfigChangeEvent>>,
    /// 监控文件列表，回调线程共享
    watched_files: Arc<RwLock<Vec<WatchedFile>>>,
    /// 已注册到 notify 的目录
    watched_directories: HashSet<PathBuf>,
    /// 文件过滤器
    file_filter: Arc<dyn FileFilter>,
}

impl std::fmt::Debug for ConfigFileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigFileWatcher")
            .field("watched_paths", &self.get_watched_paths())
            .field("is_watching", &self.is_watching())
            .field("file_filter", &self.file_filter.name())
            .finish()
    }
}

impl ConfigFileWatcher {
    /// 创建新的配置文件监控器
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// 指定事件通道容量
    pub fn with_capacity(capacity: usize) -> Self {
        let (change_sender, change_receiver) = mpsc::channel(capacity.max(1));

        Self {
            watcher: None,
            change_sender,
            change_receiver: Some(change_receiver),
            watched_files: Arc::new(RwLock::new(Vec::new())),
            watched_directories: HashSet::new(),
            file_filter: Arc::new(ExtensionFileFilter::config_files()),
        }
    }

    /// 设置文件过滤器，需要在启动前调用
    pub fn set_file_filter(&mut self, filter: Arc<dyn FileFilter>) {
        info!("设置文件过滤器: {}", filter.name());
        self.file_filter = filter;
    }

    fn watch_directory(&mut self, directory: &Path) -> Result<(), ConfigError> {
        if self.watched_directories.contains(directory) {
            return Ok(());
        }
        if let Some(watcher) = self.watcher.as_mut() {
            watcher
                .watch(directory, RecursiveMode::NonRecursive)
                .map_err(|e| ConfigError::WatchError {
                    message: format!("添加监控目录失败 {}: {}", directory.display(), e),
                })?;
            debug!("监控目录: {}", directory.display());
        }
        self.watched_directories.insert(directory.to_path_buf());
        Ok(())
    }
}

impl Default for ConfigFileWatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 把文件系统事件转换为配置变更事件
fn translate_event(
    event: &Event,
    watched: &[WatchedFile],
    filter: &dyn FileFilter,
) -> Vec<ConfigChangeEvent> {
    let removed = match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => false,
        EventKind::Remove(_) => true,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter(|path| filter.should_watch(path))
        .filter_map(|path| watched.iter().find(|file| file.resolved == *path))
        .map(|file| {
            if removed {
                ConfigChangeEvent::file_removed(&file.requested, EVENT_SOURCE)
            } else {
                ConfigChangeEvent::file_changed(&file.requested, EVENT_SOURCE)
            }
        })
        .collect()
}

#[async_trait]
impl ConfigWatcher for ConfigFileWatcher {
    async fn start_watching(&mut self) -> Result<(), ConfigError> {
        if self.watcher.is_some() {
            warn!("配置监控器已经在运行");
            return Ok(());
        }

        info!("启动配置文件监控");

        let change_sender = self.change_sender.clone();
        let watched_files = Arc::clone(&self.watched_files);
        let filter = Arc::clone(&self.file_filter);

        // notify 回调运行在自己的线程上，只做非阻塞发送
        let watcher = recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let events = translate_event(&event, &watched_files.read(), filter.as_ref());
                for change in events {
                    debug!("配置文件变更: {}", change.path);
                    if let Err(e) = change_sender.try_send(change) {
                        warn!("配置变更事件丢弃: {}", e);
                    }
                }
            }
            Err(e) => error!("文件监控错误: {:?}", e),
        })
        .map_err(|e| ConfigError::WatchError {
            message: format!("创建文件监控器失败: {}", e),
        })?;

        self.watcher = Some(watcher);
        let directories: Vec<PathBuf> = self.watched_directories.drain().collect();
        for directory in directories {
            self.watch_directory(&directory)?;
        }

        info!("配置文件监控启动完成");
        Ok(())
    }

    async fn stop_watching(&mut self) -> Result<(), ConfigError> {
        if self.watcher.take().is_none() {
            warn!("配置监控器未在运行");
            return Ok(());
        }

        info!("配置文件监控已停止");
        Ok(())
    }

    async fn add_watch_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        let file = WatchedFile::resolve(path)?;

        if self.watched_files.read().contains(&file) {
            warn!("路径已在监控列表中: {}", path.display());
            return Ok(());
        }

        self.watch_directory(&file.directory)?;
        info!("添加监控路径: {}", path.display());
        self.watched_files.write().push(file);
        Ok(())
    }

    async fn remove_watch_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        let mut files = self.watched_files.write();
        let Some(position) = files.iter().position(|file| file.requested == path) else {
            warn!("路径不在监控列表中: {}", path.display());
            return Err(ConfigError::KeyNotFound {
                key: path.to_string_lossy().to_string(),
            });
        };
        let removed = files.remove(position);
        let directory_in_use = files.iter().any(|file| file.directory == removed.directory);
        drop(files);

        if !directory_in_use {
            self.watched_directories.remove(&removed.directory);
            if let Some(watcher) = self.watcher.as_mut() {
                if let Err(e) = watcher.unwatch(&removed.directory) {
                    warn!("移除监控目录失败: {} - {}", removed.directory.display(), e);
                }
            }
        }

        info!("移除监控路径: {}", path.display());
        Ok(())
    }

    fn take_change_receiver(&mut self) -> Option<mpsc::Receiver<ConfigChangeEvent>> {
        self.change_receiver.take()
    }

    fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    fn get_watched_paths(&self) -> Vec<PathBuf> {
        self.watched_files
            .read()
            .iter()
            .map(|file| file.requested.clone())
            .collect()
    }
}
