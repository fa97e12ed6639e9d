//! 服务解析器抽象接口
//!
//! 提供按能力键解析实例的能力

use crate::capability::{Capability, CapabilityKey};
use crate::descriptor::Instance;
use infrastructure_common::{DependencyError, DependencyResult};
use std::sync::Arc;

/// 服务解析器 trait
///
/// 根提供者、请求作用域以及工厂内部的解析帧都实现此 trait
#[cfg_attr(test, mockall::automock)]
pub trait ServiceResolver: Send + Sync {
    /// 按能力键解析实例
    fn resolve_instance(&self, key: CapabilityKey) -> DependencyResult<Instance>;

    /// 能力是否已注册
    fn is_registered(&self, key: CapabilityKey) -> bool;

    /// 已注册服务的类型名称
    fn service_type_name(&self, _key: CapabilityKey) -> Option<&'static str> {
        None
    }
}

/// 带类型的解析扩展
pub trait ServiceResolverExt: ServiceResolver {
    /// 解析带类型的能力
    fn resolve<T>(&self, capability: &Capability<T>) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = self.resolve_instance(capability.key())?;
        downcast_instance(capability, &instance).ok_or_else(|| DependencyError::TypeMismatch {
            capability: capability.name().to_string(),
            expected: capability.type_name().to_string(),
            actual: self
                .service_type_name(capability.key())
                .unwrap_or("<unknown>")
                .to_string(),
        })
    }
}

impl<R: ServiceResolver + ?Sized> ServiceResolverExt for R {}

/// 将实例转换为能力对应的类型
pub fn downcast_instance<T>(_capability: &Capability<T>, instance: &Instance) -> Option<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance.downcast_ref::<Arc<T>>().cloned()
}

/// 解析上下文
///
/// 记录当前解析链，用于检测循环依赖
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// 当前解析链
    pub resolution_chain: Vec<CapabilityKey>,
    /// 最大解析深度，0 表示不限制
    pub max_depth: usize,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new(max_depth: usize) -> Self {
        Self {
            resolution_chain: Vec::new(),
            max_depth,
        }
    }

    /// 添加能力到解析链
    pub fn push_key(&mut self, key: CapabilityKey) -> DependencyResult<()> {
        if self.resolution_chain.contains(&key) {
            return Err(DependencyError::CircularDependency {
                dependency_chain: format!("{} -> {}", self.chain_display(), key),
            });
        }
        if self.max_depth > 0 && self.resolution_chain.len() >= self.max_depth {
            return Err(DependencyError::CircularDependency {
                dependency_chain: format!(
                    "解析深度超过 {}: {} -> {}",
                    self.max_depth,
                    self.chain_display(),
                    key
                ),
            });
        }
        self.resolution_chain.push(key);
        Ok(())
    }

    /// 当前解析深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }

    fn chain_display(&self) -> String {
        self.resolution_chain
            .iter()
            .map(CapabilityKey::name)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
