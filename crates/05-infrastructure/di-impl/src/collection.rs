//! 服务集合
//!
//! 启动期收集服务描述符，`build()` 校验后生成只读的 [`ServiceProvider`]。

use crate::provider::ServiceProvider;
use di_abstractions::{
    Capability, CapabilityKey, CircularDependencyDetector, ContainerConfig,
    DefaultCircularDependencyDetector, ServiceDescriptor, ServiceResolver,
};
use infrastructure_common::{DependencyError, DependencyResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 服务集合
#[derive(Debug, Default)]
pub struct ServiceCollection {
    descriptors: HashMap<CapabilityKey, ServiceDescriptor>,
    pending_errors: Vec<DependencyError>,
    config: ContainerConfig,
}

impl ServiceCollection {
    /// 创建空的服务集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定配置创建
    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// 添加服务描述符，同一能力后注册者生效
    ///
    /// 同一能力键以不同服务类型重复注册视为冲突，在 `build()` 时报告。
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        let key = descriptor.key();
        if let Some(existing) = self.descriptors.get(&key) {
            if existing.service_type_id() != descriptor.service_type_id() {
                warn!(
                    "服务注册冲突: {} 已注册为 {}, 又注册为 {}",
                    key,
                    existing.service_type(),
                    descriptor.service_type()
                );
                self.pending_errors.push(DependencyError::RegistrationConflict {
                    capability: key.to_string(),
                    message: format!(
                        "已注册为 {}, 不能再注册为 {}",
                        existing.service_type(),
                        descriptor.service_type()
                    ),
                });
                return self;
            }
            debug!(
                "覆盖已注册的服务: {} ({} -> {})",
                key,
                existing.lifetime(),
                descriptor.lifetime()
            );
        }

        debug!("注册服务: {} [{}]", key, descriptor.lifetime());
        self.descriptors.insert(key, descriptor);
        self
    }

    /// 注册单例服务
    pub fn add_singleton<T, F>(&mut self, capability: &Capability<T>, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> DependencyResult<Arc<T>> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::singleton(capability, factory))
    }

    /// 注册作用域服务
    pub fn add_scoped<T, F>(&mut self, capability: &Capability<T>, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> DependencyResult<Arc<T>> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::scoped(capability, factory))
    }

    /// 注册瞬时服务
    pub fn add_transient<T, F>(&mut self, capability: &Capability<T>, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> DependencyResult<Arc<T>> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::transient(capability, factory))
    }

    /// 注册已有实例为单例
    pub fn add_singleton_instance<T>(&mut self, capability: &Capability<T>, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::instance(capability, instance))
    }

    /// 能力是否已注册
    pub fn contains(&self, key: impl Into<CapabilityKey>) -> bool {
        self.descriptors.contains_key(&key.into())
    }

    /// 获取描述符
    pub fn get(&self, key: impl Into<CapabilityKey>) -> Option<&ServiceDescriptor> {
        self.descriptors.get(&key.into())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 校验并构建服务提供者
    pub fn build(mut self) -> DependencyResult<ServiceProvider> {
        if !self.pending_errors.is_empty() {
            return Err(self.pending_errors.remove(0));
        }

        self.validate()?;

        info!("构建服务提供者完成，注册了 {} 个服务", self.descriptors.len());
        Ok(ServiceProvider::new(self.descriptors, self.config))
    }

    /// 校验声明的依赖
    fn validate(&self) -> DependencyResult<()> {
        let mut keys: Vec<_> = self.descriptors.keys().copied().collect();
        keys.sort();

        for key in &keys {
            let descriptor = &self.descriptors[key];
            for dependency in descriptor.dependencies() {
                let Some(target) = self.descriptors.get(dependency) else {
                    warn!("服务 {} 依赖的 {} 未注册", key, dependency);
                    return Err(DependencyError::not_registered(dependency.to_string()));
                };

                if self.config.enable_scope_validation
                    && !descriptor.lifetime().can_depend_on(target.lifetime())
                {
                    return Err(DependencyError::ScopeMismatch {
                        capability: key.to_string(),
                        message: format!(
                            "{} 服务不能依赖 {} 服务 {}",
                            descriptor.lifetime(),
                            target.lifetime(),
                            dependency
                        ),
                    });
                }
            }
        }

        if self.config.enable_circular_dependency_detection {
            let detector = DefaultCircularDependencyDetector;
            let graph = detector.build_dependency_graph(self.descriptors.values());
            detector.detect_circular_dependencies(&graph)?;
        }

        Ok(())
    }
}
