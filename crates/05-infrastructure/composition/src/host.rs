//! 宿主
//!
//! 持有服务提供者、请求分发器和配置管理器，负责启动停止、配置热重载和 HTTP 服务。

use crate::builder::HostBuilder;
use crate::server;
use config_abstractions::{ConfigChangeEvent, ConfigWatcher, ReloadableOptions};
use config_impl::{ConfigFileWatcher, ConfigurationManager};
use di_impl::ServiceProvider;
use infrastructure_common::{ConfigError, ConfigSection, InfrastructureError, InfrastructureResult};
use request_pipeline::{HttpRequest, HttpResponse, RequestDispatcher};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 宿主运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HostStatus {
    /// 已构建
    Initialized,
    /// 启动中
    Starting,
    /// 运行中
    Running,
    /// 停止中
    Stopping,
    /// 已停止
    Stopped,
    /// 失败
    Failed,
}

/// 共享的配置状态，重载循环与宿主共同持有
#[derive(Clone)]
pub(crate) struct ConfigurationState {
    pub(crate) manager: Arc<RwLock<ConfigurationManager>>,
    pub(crate) reloadables: Arc<Vec<Arc<dyn ReloadableOptions>>>,
}

impl ConfigurationState {
    /// 重载所有提供者并刷新监视器，返回实际更新的配置节数量
    ///
    /// 重载失败的提供者保留旧内容，其余配置节照常刷新。
    async fn reload(&self) -> InfrastructureResult<usize> {
        let mut manager = self.manager.write().await;
        let reloaded = manager.reload_all().await;
        let manager = manager.downgrade();

        let mut updated = 0;
        let mut first_error: Option<ConfigError> = None;
        for options in self.reloadables.iter() {
            let section = match manager.get_section(options.section_name()).await {
                Ok(section) => section,
                Err(ConfigError::KeyNotFound { .. }) => ConfigSection::new(),
                Err(e) => {
                    warn!("读取配置节 {} 失败: {}", options.section_name(), e);
                    first_error.get_or_insert(e);
                    continue;
                }
            };

            match options.apply(&section) {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("配置节 {} 刷新失败，保留原值: {}", options.section_name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        reloaded?;
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(updated),
        }
    }

    /// 消费文件变更事件，防抖后重载
    async fn run_reload_loop(self, mut changes: mpsc::Receiver<ConfigChangeEvent>, debounce: Duration) {
        while let Some(event) = changes.recv().await {
            if !event.requires_reload() {
                continue;
            }
            debug!("收到配置变更: {}", event.path);

            // 合并防抖窗口内的后续事件
            while let Ok(Some(next)) = tokio::time::timeout(debounce, changes.recv()).await {
                debug!("合并配置变更: {}", next.path);
            }

            match self.reload().await {
                Ok(updated) => info!("配置热重载完成，更新 {} 个配置节", updated),
                Err(e) => warn!("配置热重载失败: {}", e),
            }
        }
        debug!("配置变更通道已关闭，重载循环退出");
    }
}

/// 宿主
pub struct Host {
    dispatcher: Arc<RequestDispatcher>,
    configuration: ConfigurationState,
    hot_reload: bool,
    reload_debounce: Duration,
    status: RwLock<HostStatus>,
    watcher: Mutex<Option<ConfigFileWatcher>>,
    reload_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("dispatcher", &self.dispatcher)
            .field("hot_reload", &self.hot_reload)
            .field("reload_debounce", &self.reload_debounce)
            .finish()
    }
}

impl Host {
    /// 创建宿主构建器
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    pub(crate) fn new(
        dispatcher: RequestDispatcher,
        configuration: ConfigurationState,
        hot_reload: bool,
        reload_debounce: Duration,
    ) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            configuration,
            hot_reload,
            reload_debounce,
            status: RwLock::new(HostStatus::Initialized),
            watcher: Mutex::new(None),
            reload_task: Mutex::new(None),
        }
    }

    /// 启动宿主，启用热重载时开始监控配置文件
    pub async fn start(&self) -> InfrastructureResult<()> {
        {
            let mut status = self.status.write().await;
            if *status == HostStatus::Running {
                warn!("宿主已经在运行");
                return Ok(());
            }
            *status = HostStatus::Starting;
        }
        info!("启动宿主");

        if self.hot_reload {
            if let Err(e) = self.start_hot_reload().await {
                error!("启动配置热重载失败: {}", e);
                *self.status.write().await = HostStatus::Failed;
                return Err(e);
            }
        }

        *self.status.write().await = HostStatus::Running;
        info!(
            "宿主启动完成，{} 个路由，{} 个管道阶段",
            self.dispatcher.routes().len(),
            self.dispatcher.pipeline().len()
        );
        Ok(())
    }

    async fn start_hot_reload(&self) -> InfrastructureResult<()> {
        let paths = self.configuration.manager.read().await.watch_paths();
        if paths.is_empty() {
            info!("没有可热重载的配置文件");
            return Ok(());
        }

        let mut watcher = ConfigFileWatcher::new();
        for path in &paths {
            watcher.add_watch_path(path).await?;
        }
        let changes = watcher.take_change_receiver().ok_or_else(|| ConfigError::WatchError {
            message: "配置变更通道已被取走".to_string(),
        })?;
        watcher.start_watching().await?;

        let task = tokio::spawn(
            self.configuration
                .clone()
                .run_reload_loop(changes, self.reload_debounce),
        );

        *self.watcher.lock().await = Some(watcher);
        *self.reload_task.lock().await = Some(task);
        info!("配置热重载已启用，监控 {} 个文件", paths.len());
        Ok(())
    }

    /// 停止宿主
    pub async fn stop(&self) -> InfrastructureResult<()> {
        info!("停止宿主");
        *self.status.write().await = HostStatus::Stopping;

        if let Some(mut watcher) = self.watcher.lock().await.take() {
            watcher
                .stop_watching()
                .await
                .map_err(|e| InfrastructureError::ShutdownFailed {
                    message: format!("停止配置监控失败: {}", e),
                })?;
        }
        if let Some(task) = self.reload_task.lock().await.take() {
            task.abort();
        }

        *self.status.write().await = HostStatus::Stopped;
        let stats = self.services().stats();
        info!(
            "宿主停止完成，共打开 {} 个作用域，释放 {} 个",
            stats.scopes_opened, stats.scopes_released
        );
        Ok(())
    }

    /// 当前状态
    pub async fn status(&self) -> HostStatus {
        *self.status.read().await
    }

    /// 处理单个请求
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        self.dispatcher.dispatch(request).await
    }

    /// axum 路由
    pub fn router(&self) -> axum::Router {
        server::router(Arc::clone(&self.dispatcher))
    }

    /// 在给定监听器上提供服务，直到 `shutdown` 完成
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> InfrastructureResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener.local_addr()?;
        info!("开始监听 http://{}", address);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("HTTP 服务已停止");
        Ok(())
    }

    /// 立即重载配置并刷新所有监视器
    pub async fn reload_configuration(&self) -> InfrastructureResult<usize> {
        self.configuration.reload().await
    }

    /// 服务提供者
    pub fn services(&self) -> &ServiceProvider {
        self.dispatcher.provider()
    }

    /// 请求分发器
    pub fn dispatcher(&self) -> &Arc<RequestDispatcher> {
        &self.dispatcher
    }

    /// 配置管理器
    pub fn configuration(&self) -> Arc<RwLock<ConfigurationManager>> {
        Arc::clone(&self.configuration.manager)
    }
}
