//! 服务提供者
//!
//! 持有只读注册表与单例缓存。单例首次解析由每个能力各自的 `OnceCell` 串行化，
//! 不存在全局锁。

use crate::scope::{ScopeCache, ServiceScope};
use di_abstractions::{
    Capability, CapabilityKey, ContainerConfig, ContainerStats, Instance, ResolveContext,
    ServiceDescriptor, ServiceResolver, ServiceResolverExt,
};
use infrastructure_common::{DependencyError, DependencyResult, Lifetime};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// 服务提供者
///
/// 克隆成本很低，内部共享同一份注册表和单例缓存。
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
    descriptors: HashMap<CapabilityKey, ServiceDescriptor>,
    singletons: HashMap<CapabilityKey, OnceCell<Instance>>,
    config: ContainerConfig,
    counters: Counters,
}

#[derive(Default)]
struct Counters {
    singleton_constructions: AtomicUsize,
    scoped_constructions: AtomicUsize,
    transient_constructions: AtomicUsize,
    scopes_opened: AtomicUsize,
    scopes_released: AtomicUsize,
    resolution_errors: AtomicUsize,
}

impl ServiceProvider {
    pub(crate) fn new(
        descriptors: HashMap<CapabilityKey, ServiceDescriptor>,
        config: ContainerConfig,
    ) -> Self {
        let singletons = descriptors
            .values()
            .filter(|descriptor| descriptor.lifetime() == Lifetime::Singleton)
            .map(|descriptor| (descriptor.key(), OnceCell::new()))
            .collect();

        Self {
            inner: Arc::new(ProviderInner {
                descriptors,
                singletons,
                config,
                counters: Counters::default(),
            }),
        }
    }

    /// 打开新的请求作用域
    pub fn open_scope(&self) -> ServiceScope {
        self.inner.counters.scopes_opened.fetch_add(1, Ordering::SeqCst);
        let scope = ServiceScope::new(Arc::clone(&self.inner));
        debug!("打开作用域: {}", scope.id());
        scope
    }

    /// 关闭作用域，释放其中的作用域实例
    pub fn close_scope(&self, scope: ServiceScope) {
        scope.close();
    }

    /// 从根提供者解析带类型的能力
    ///
    /// 根提供者没有作用域，解析作用域服务会返回 `ScopeMismatch`。
    pub fn resolve<T>(&self, capability: &Capability<T>) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ServiceResolverExt::resolve(self, capability)
    }

    /// 获取描述符
    pub fn descriptor(&self, key: impl Into<CapabilityKey>) -> Option<&ServiceDescriptor> {
        self.inner.descriptors.get(&key.into())
    }

    /// 所有已注册的能力键
    pub fn registered_keys(&self) -> Vec<CapabilityKey> {
        let mut keys: Vec<_> = self.inner.descriptors.keys().copied().collect();
        keys.sort();
        keys
    }

    /// 校验一组能力都已注册
    pub fn validate_capabilities(
        &self,
        keys: impl IntoIterator<Item = CapabilityKey>,
    ) -> DependencyResult<()> {
        for key in keys {
            if !self.inner.descriptors.contains_key(&key) {
                return Err(DependencyError::not_registered(key.name()));
            }
        }
        Ok(())
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// 统计信息快照
    pub fn stats(&self) -> ContainerStats {
        self.inner.stats()
    }
}

impl ServiceResolver for ServiceProvider {
    fn resolve_instance(&self, key: CapabilityKey) -> DependencyResult<Instance> {
        self.inner.resolve_root(key, None)
    }

    fn is_registered(&self, key: CapabilityKey) -> bool {
        self.inner.descriptors.contains_key(&key)
    }

    fn service_type_name(&self, key: CapabilityKey) -> Option<&'static str> {
        self.inner.service_type_name(key)
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("services", &self.inner.descriptors.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ProviderInner {
    /// 顶层解析入口，统计解析错误
    pub(crate) fn resolve_root(
        &self,
        key: CapabilityKey,
        scope: Option<&ScopeCache>,
    ) -> DependencyResult<Instance> {
        let context = ResolveContext::new(self.config.max_resolution_depth);
        self.resolve_in(key, scope, context).map_err(|err| {
            self.counters.resolution_errors.fetch_add(1, Ordering::Relaxed);
            debug!("解析 {} 失败: {}", key, err);
            err
        })
    }

    fn resolve_in(
        &self,
        key: CapabilityKey,
        scope: Option<&ScopeCache>,
        mut context: ResolveContext,
    ) -> DependencyResult<Instance> {
        let descriptor = self
            .descriptors
            .get(&key)
            .ok_or_else(|| DependencyError::not_registered(key.name()))?;

        // 进入工厂前检查，可重入初始化同一个 OnceCell 会死锁
        context.push_key(key)?;

        match descriptor.lifetime() {
            Lifetime::Singleton => {
                let cell = self
                    .singletons
                    .get(&key)
                    .ok_or_else(|| DependencyError::not_registered(key.name()))?;
                cell.get_or_try_init(|| self.construct(descriptor, None, context))
                    .cloned()
            }
            Lifetime::Scoped => {
                let cache = scope.ok_or_else(|| DependencyError::ScopeMismatch {
                    capability: key.to_string(),
                    message: "作用域服务只能在请求作用域内解析，不能从根提供者或单例工厂中解析"
                        .to_string(),
                })?;
                let cell = cache.cell(key);
                cell.get_or_try_init(|| self.construct(descriptor, Some(cache), context))
                    .cloned()
            }
            Lifetime::Transient => self.construct(descriptor, scope, context),
        }
    }

    fn construct(
        &self,
        descriptor: &ServiceDescriptor,
        scope: Option<&ScopeCache>,
        context: ResolveContext,
    ) -> DependencyResult<Instance> {
        let frame = ResolutionFrame {
            inner: self,
            scope,
            context,
        };
        let instance = descriptor.create(&frame)?;

        let counter = match descriptor.lifetime() {
            Lifetime::Singleton => &self.counters.singleton_constructions,
            Lifetime::Scoped => &self.counters.scoped_constructions,
            Lifetime::Transient => &self.counters.transient_constructions,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        trace!(
            "构造服务: {} [{}] 深度 {}",
            descriptor.key(),
            descriptor.lifetime(),
            frame.context.depth()
        );

        Ok(instance)
    }

    pub(crate) fn is_registered(&self, key: CapabilityKey) -> bool {
        self.descriptors.contains_key(&key)
    }

    pub(crate) fn service_type_name(&self, key: CapabilityKey) -> Option<&'static str> {
        self.descriptors.get(&key).map(ServiceDescriptor::service_type)
    }

    pub(crate) fn record_scope_released(&self) {
        self.counters.scopes_released.fetch_add(1, Ordering::SeqCst);
    }

    fn stats(&self) -> ContainerStats {
        let load = |counter: &AtomicUsize| counter.load(Ordering::SeqCst);
        ContainerStats {
            registered_services: self.descriptors.len(),
            singleton_constructions: load(&self.counters.singleton_constructions),
            scoped_constructions: load(&self.counters.scoped_constructions),
            transient_constructions: load(&self.counters.transient_constructions),
            scopes_opened: load(&self.counters.scopes_opened),
            scopes_released: load(&self.counters.scopes_released),
            resolution_errors: load(&self.counters.resolution_errors),
        }
    }
}

/// 工厂内部的解析帧
///
/// 携带当前解析链和所属作用域。单例工厂的帧没有作用域。
struct ResolutionFrame<'a> {
    inner: &'a ProviderInner,
    scope: Option<&'a ScopeCache>,
    context: ResolveContext,
}

impl ServiceResolver for ResolutionFrame<'_> {
    fn resolve_instance(&self, key: CapabilityKey) -> DependencyResult<Instance> {
        self.inner.resolve_in(key, self.scope, self.context.clone())
    }

    fn is_registered(&self, key: CapabilityKey) -> bool {
        self.inner.is_registered(key)
    }

    fn service_type_name(&self, key: CapabilityKey) -> Option<&'static str> {
        self.inner.service_type_name(key)
    }
}
