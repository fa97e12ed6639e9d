//! 请求作用域
//!
//! 每个请求一个 [`ServiceScope`]。作用域实例缓存在作用域内，
//! 作用域被丢弃时统一释放，正常返回、故障、短路和取消都走同一条路径。

use crate::provider::ProviderInner;
use dashmap::DashMap;
use di_abstractions::{Capability, CapabilityKey, Instance, ServiceResolver, ServiceResolverExt};
use infrastructure_common::{DependencyResult, ScopeInfo};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

/// 作用域实例缓存
#[derive(Default)]
pub(crate) struct ScopeCache {
    instances: DashMap<CapabilityKey, Arc<OnceCell<Instance>>>,
}

impl ScopeCache {
    /// 获取能力对应的单元格
    ///
    /// 先克隆出 `Arc` 再返回，分片锁在工厂执行前已释放。
    pub(crate) fn cell(&self, key: CapabilityKey) -> Arc<OnceCell<Instance>> {
        self.instances.entry(key).or_default().clone()
    }

    /// 已构造的实例数量
    fn constructed(&self) -> usize {
        self.instances
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }
}

/// 服务作用域
pub struct ServiceScope {
    info: ScopeInfo,
    inner: Arc<ProviderInner>,
    cache: ScopeCache,
}

impl ServiceScope {
    pub(crate) fn new(inner: Arc<ProviderInner>) -> Self {
        Self {
            info: ScopeInfo::request(),
            inner,
            cache: ScopeCache::default(),
        }
    }

    /// 作用域 ID
    pub fn id(&self) -> uuid::Uuid {
        self.info.id
    }

    /// 作用域信息
    pub fn info(&self) -> &ScopeInfo {
        &self.info
    }

    /// 解析带类型的能力
    pub fn resolve<T>(&self, capability: &Capability<T>) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ServiceResolverExt::resolve(self, capability)
    }

    /// 本作用域内已构造的作用域实例数量
    pub fn scoped_instances(&self) -> usize {
        self.cache.constructed()
    }

    /// 关闭作用域
    pub fn close(self) {
        drop(self);
    }
}

impl ServiceResolver for ServiceScope {
    fn resolve_instance(&self, key: CapabilityKey) -> DependencyResult<Instance> {
        self.inner.resolve_root(key, Some(&self.cache))
    }

    fn is_registered(&self, key: CapabilityKey) -> bool {
        self.inner.is_registered(key)
    }

    fn service_type_name(&self, key: CapabilityKey) -> Option<&'static str> {
        self.inner.service_type_name(key)
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        let released = self.cache.constructed();
        self.cache.instances.clear();
        self.inner.record_scope_released();
        debug!("释放作用域: {}, 作用域实例 {} 个", self.info.id, released);
    }
}

impl std::fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope")
            .field("id", &self.info.id)
            .field("name", &self.info.name)
            .field("scoped_instances", &self.cache.constructed())
            .finish()
    }
}
