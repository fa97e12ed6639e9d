//! 服务描述符

use crate::capability::{Capability, CapabilityKey};
use crate::resolver::ServiceResolver;
use infrastructure_common::{DependencyResult, Lifetime};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 已构造的服务实例
///
/// 内部保存的是 `Arc<T>`，按能力的类型向下转换。
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 服务工厂函数类型
pub type ServiceFactory =
    Arc<dyn Fn(&dyn ServiceResolver) -> DependencyResult<Instance> + Send + Sync>;

/// 服务描述符
///
/// 注册后不可变，由服务集合持有。
#[derive(Clone)]
pub struct ServiceDescriptor {
    key: CapabilityKey,
    lifetime: Lifetime,
    service_type: &'static str,
    service_type_id: TypeId,
    dependencies: Vec<CapabilityKey>,
    factory: ServiceFactory,
}

impl ServiceDescriptor {
    /// 创建服务描述符
    pub fn new<T, F>(capability: &Capability<T>, lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> DependencyResult<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            key: capability.key(),
            lifetime,
            service_type: std::any::type_name::<T>(),
            service_type_id: TypeId::of::<T>(),
            dependencies: Vec::new(),
            factory: Arc::new(move |resolver| {
                factory(resolver).map(|service| Arc::new(service) as Instance)
            }),
        }
    }

    /// 单例服务
    pub fn singleton<T, F>(capability: &Capability<T>, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> DependencyResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::new(capability, Lifetime::Singleton, factory)
    }

    /// 作用域服务
    pub fn scoped<T, F>(capability: &Capability<T>, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> DependencyResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::new(capability, Lifetime::Scoped, factory)
    }

    /// 瞬时服务
    pub fn transient<T, F>(capability: &Capability<T>, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn ServiceResolver) -> DependencyResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::new(capability, Lifetime::Transient, factory)
    }

    /// 已有实例注册为单例
    pub fn instance<T>(capability: &Capability<T>, instance: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self::new(capability, Lifetime::Singleton, move |_| Ok(Arc::clone(&instance)))
    }

    /// 声明依赖，构建时用于校验
    #[must_use]
    pub fn depends_on(mut self, dependency: impl Into<CapabilityKey>) -> Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    pub fn key(&self) -> CapabilityKey {
        self.key
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// 解析结果的类型名称
    pub fn service_type(&self) -> &'static str {
        self.service_type
    }

    pub fn service_type_id(&self) -> TypeId {
        self.service_type_id
    }

    pub fn dependencies(&self) -> &[CapabilityKey] {
        &self.dependencies
    }

    /// 调用工厂构造实例
    pub fn create(&self, resolver: &dyn ServiceResolver) -> DependencyResult<Instance> {
        (self.factory)(resolver)
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("service_type", &self.service_type)
            .field("dependencies", &self.dependencies)
            .field("factory", &"<function>")
            .finish()
    }
}
