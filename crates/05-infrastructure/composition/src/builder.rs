//! 宿主构建器

use crate::host::{ConfigurationState, Host};
use crate::logging::LoggingConfig;
use config_abstractions::{ConfigProvider, Options, OptionsMonitor, ReloadableOptions};
use config_impl::{
    ConfigurationManager, EnvironmentConfigProvider, JsonConfigProvider, SettingsMonitor,
    TomlConfigProvider,
};
use di_abstractions::{Capability, ContainerConfig};
use di_impl::{ServiceCollection, ServiceProvider};
use infrastructure_common::{
    ConfigError, ConfigSection, Configurable, InfrastructureError, InfrastructureResult,
};
use request_pipeline::{Pipeline, PipelineBuilder, RequestDispatcher, RouteTable, RouteTableBuilder};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

type OptionsBinder = Box<
    dyn FnOnce(&ConfigSection, &mut ServiceCollection) -> Result<Arc<dyn ReloadableOptions>, ConfigError>
        + Send,
>;
type ServiceConfigurator = Box<dyn FnOnce(&mut ServiceCollection) + Send>;
type PipelineConfigurator =
    Box<dyn FnOnce(&mut PipelineBuilder, &ServiceProvider) -> InfrastructureResult<()> + Send>;
type RouteMapper = Box<dyn FnOnce(&mut RouteTableBuilder) + Send>;

/// 强类型配置注册
struct OptionsRegistration {
    section_name: &'static str,
    bind: OptionsBinder,
}

/// 宿主构建器
///
/// 使用建造者模式收集配置源、服务、管道阶段和路由，`build()` 时统一校验。
pub struct HostBuilder {
    /// 配置源列表
    config_sources: Vec<Box<dyn ConfigProvider>>,
    /// 是否启用配置热重载
    hot_reload_enabled: bool,
    /// 热重载防抖间隔
    reload_debounce: Duration,
    /// 日志配置，为空时不初始化日志
    logging_config: Option<LoggingConfig>,
    container_config: ContainerConfig,
    options: Vec<OptionsRegistration>,
    services: Vec<ServiceConfigurator>,
    pipeline: Vec<PipelineConfigurator>,
    routes: Vec<RouteMapper>,
}

impl HostBuilder {
    /// 创建新的宿主构建器
    pub fn new() -> Self {
        Self {
            config_sources: Vec::new(),
            hot_reload_enabled: false,
            reload_debounce: Duration::from_millis(250),
            logging_config: None,
            container_config: ContainerConfig::default(),
            options: Vec::new(),
            services: Vec::new(),
            pipeline: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// 添加 JSON 配置文件
    pub fn add_config_json<P: AsRef<Path>>(mut self, path: P) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        info!("添加 JSON 配置文件: {}", path.display());
        let provider = JsonConfigProvider::new(path)?;
        self.config_sources.push(Box::new(provider));
        Ok(self)
    }

    /// 添加 TOML 配置文件
    pub fn add_config_toml<P: AsRef<Path>>(mut self, path: P) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        info!("添加 TOML 配置文件: {}", path.display());
        let provider = TomlConfigProvider::new(path)?;
        self.config_sources.push(Box::new(provider));
        Ok(self)
    }

    /// 添加环境变量配置源
    pub fn add_env_vars(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        info!("添加环境变量配置源，前缀: {}", prefix);
        self.config_sources
            .push(Box::new(EnvironmentConfigProvider::new(prefix)));
        self
    }

    /// 添加自定义配置提供者
    pub fn add_provider<T: ConfigProvider + 'static>(mut self, provider: T) -> Self {
        info!("添加自定义配置提供者: {}", provider.name());
        self.config_sources.push(Box::new(provider));
        self
    }

    /// 启用配置热重载
    pub fn enable_hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload_enabled = enabled;
        if enabled {
            info!("启用配置热重载");
        }
        self
    }

    /// 设置热重载防抖间隔
    pub fn reload_debounce(mut self, debounce: Duration) -> Self {
        self.reload_debounce = debounce;
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 设置容器选项
    pub fn with_container_config(mut self, config: ContainerConfig) -> Self {
        self.container_config = config;
        self
    }

    /// 绑定强类型配置，快照和监视器都注册为单例
    pub fn configure_options<T: Configurable>(
        mut self,
        options: &Capability<Options<T>>,
        monitor: &Capability<dyn OptionsMonitor<T>>,
    ) -> Self {
        let options = *options;
        let monitor = *monitor;
        debug!("注册强类型配置: {} -> {}", T::section_name(), options.name());

        self.options.push(OptionsRegistration {
            section_name: T::section_name(),
            bind: Box::new(move |section: &ConfigSection, services: &mut ServiceCollection| {
                let settings = Arc::new(SettingsMonitor::<T>::bind(section)?);
                let snapshot = Options::from_shared(settings.current_value());
                let live: Arc<dyn OptionsMonitor<T>> = settings.clone();
                services
                    .add_singleton_instance(&options, Arc::new(snapshot))
                    .add_singleton_instance(&monitor, live);
                Ok(settings as Arc<dyn ReloadableOptions>)
            }),
        });
        self
    }

    /// 注册服务
    pub fn configure_services<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut ServiceCollection) + Send + 'static,
    {
        self.services.push(Box::new(configure));
        self
    }

    /// 注册管道阶段，可从已构建的服务提供者中取得依赖
    pub fn configure_pipeline<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut PipelineBuilder, &ServiceProvider) -> InfrastructureResult<()> + Send + 'static,
    {
        self.pipeline.push(Box::new(configure));
        self
    }

    /// 声明路由
    pub fn map_routes<F>(mut self, map: F) -> Self
    where
        F: FnOnce(&mut RouteTableBuilder) + Send + 'static,
    {
        self.routes.push(Box::new(map));
        self
    }

    /// 构建宿主
    ///
    /// 依次加载配置、绑定强类型配置、构建并校验容器、构建并校验路由表、组装管道。
    pub async fn build(self) -> InfrastructureResult<Host> {
        if let Some(logging) = &self.logging_config {
            logging.init()?;
        }
        info!("开始构建宿主");

        let mut manager = ConfigurationManager::new();
        for provider in self.config_sources {
            manager.add_provider(provider);
        }

        let mut services = ServiceCollection::with_config(self.container_config);
        let mut reloadables = Vec::with_capacity(self.options.len());
        for registration in self.options {
            let section = match manager.get_section(registration.section_name).await {
                Ok(section) => section,
                Err(ConfigError::KeyNotFound { .. }) => {
                    debug!("配置节 {} 不存在，使用空配置节绑定", registration.section_name);
                    ConfigSection::new()
                }
                Err(e) => return Err(e.into()),
            };
            let reloadable = (registration.bind)(&section, &mut services).map_err(|e| {
                InfrastructureError::bootstrap(format!(
                    "配置节 {} 绑定失败: {}",
                    registration.section_name, e
                ))
            })?;
            reloadables.push(reloadable);
        }

        for configure in self.services {
            configure(&mut services);
        }
        let provider = services.build()?;

        let mut routes = RouteTable::builder();
        for map in self.routes {
            map(&mut routes);
        }
        let routes = routes
            .build()
            .map_err(|e| InfrastructureError::bootstrap(format!("路由表构建失败: {}", e)))?;
        routes.validate(&provider)?;

        let mut pipeline = Pipeline::builder();
        for configure in self.pipeline {
            configure(&mut pipeline, &provider)?;
        }
        let pipeline = pipeline.build();
        info!("管道阶段: {:?}", pipeline.stage_names());

        let dispatcher = RequestDispatcher::new(provider, routes, pipeline);
        let configuration = ConfigurationState {
            manager: Arc::new(RwLock::new(manager)),
            reloadables: Arc::new(reloadables),
        };

        info!("宿主构建完成");
        Ok(Host::new(
            dispatcher,
            configuration,
            self.hot_reload_enabled,
            self.reload_debounce,
        ))
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}
