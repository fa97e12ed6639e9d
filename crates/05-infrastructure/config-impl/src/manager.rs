//! 配置管理器实现

use config_abstractions::ConfigProvider;
use infrastructure_common::{ConfigError, ConfigSection, Configurable};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// 配置管理器
///
/// 协调多个配置源并提供统一的配置访问接口。提供者按优先级从高到低排列，
/// 同优先级保持注册顺序。
#[derive(Default)]
pub struct ConfigurationManager {
    /// 配置提供者列表（按优先级排序）
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl std::fmt::Debug for ConfigurationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationManager")
            .field("providers", &self.provider_names())
            .finish()
    }
}

impl ConfigurationManager {
    /// 创建新的配置管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册配置提供者
    pub fn add_provider(&mut self, provider: Box<dyn ConfigProvider>) -> &mut Self {
        info!(
            "注册配置提供者: {} (优先级 {})",
            provider.name(),
            provider.priority()
        );
        self.providers.push(provider);
        // 稳定排序，同优先级保持注册顺序
        self.providers
            .sort_by_key(|provider| std::cmp::Reverse(provider.priority()));
        self
    }

    /// 移除配置提供者
    pub fn remove_provider(&mut self, provider_name: &str) -> Result<(), ConfigError> {
        let initial_count = self.providers.len();
        self.providers.retain(|p| p.name() != provider_name);

        if self.providers.len() < initial_count {
            info!("移除配置提供者: {}", provider_name);
            Ok(())
        } else {
            warn!("配置提供者不存在: {}", provider_name);
            Err(ConfigError::KeyNotFound {
                key: provider_name.to_string(),
            })
        }
    }

    /// 按查询顺序的提供者名称
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// 获取配置提供者数量
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// 获取配置值，返回优先级最高的提供者中的值
    pub async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError> {
        for provider in &self.providers {
            match provider.get_configuration(key).await {
                Ok(value) => {
                    debug!("从提供者 {} 获取配置: {}", provider.name(), key);
                    return Ok(value);
                }
                Err(ConfigError::KeyNotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(ConfigError::KeyNotFound {
            key: key.to_string(),
        })
    }

    /// 获取配置节
    ///
    /// 合并所有提供者中的同名节，高优先级的键覆盖低优先级的键。节名不区分大小写。
    pub async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError> {
        let mut merged: Option<ConfigSection> = None;

        for provider in &self.providers {
            match provider.get_section(section_name).await {
                Ok(section) => {
                    debug!("提供者 {} 包含配置节 {}", provider.name(), section_name);
                    match merged.as_mut() {
                        Some(existing) => existing.merge_missing(section),
                        None => merged = Some(section),
                    }
                }
                Err(ConfigError::KeyNotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        merged.ok_or_else(|| ConfigError::KeyNotFound {
            key: section_name.to_string(),
        })
    }

    /// 检查配置键是否存在
    pub async fn contains_key(&self, key: &str) -> Result<bool, ConfigError> {
        for provider in &self.providers {
            if provider.contains_key(key).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 所有提供者的键并集
    pub async fn get_all_keys(&self) -> Result<Vec<String>, ConfigError> {
        let mut keys = BTreeSet::new();
        for provider in &self.providers {
            keys.extend(provider.get_all_keys().await?);
        }
        Ok(keys.into_iter().collect())
    }

    /// 绑定配置节到指定类型
    pub async fn bind<T: DeserializeOwned>(&self, section_name: &str) -> Result<T, ConfigError> {
        self.get_section(section_name).await?.bind()
    }

    /// 按类型声明的节名绑定并验证
    pub async fn bind_options<T: Configurable>(&self) -> Result<T, ConfigError> {
        self.get_section(T::section_name()).await?.bind_validated()
    }

    /// 重新加载所有配置
    ///
    /// 每个提供者都会尝试重载，失败的提供者保留原有内容。
    pub async fn reload_all(&mut self) -> Result<(), ConfigError> {
        info!("重新加载所有配置，共 {} 个提供者", self.providers.len());

        let mut failures = Vec::new();
        for provider in &mut self.providers {
            if let Err(e) = provider.reload().await {
                warn!("配置提供者 {} 重载失败: {}", provider.name(), e);
                failures.push(format!("{}: {}", provider.name(), e));
            }
        }

        if failures.is_empty() {
            info!("配置重新加载完成");
            Ok(())
        } else {
            Err(ConfigError::ReloadError {
                message: failures.join("; "),
            })
        }
    }

    /// 支持热重载的提供者需要监控的文件
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        self.providers
            .iter()
            .filter(|provider| provider.supports_hot_reload())
            .filter_map(|provider| provider.watch_path())
            .collect()
    }
}
