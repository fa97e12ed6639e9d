//! 依赖注入容器配置与统计

use serde::{Deserialize, Serialize};

/// 容器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否启用循环依赖检测
    pub enable_circular_dependency_detection: bool,
    /// 是否校验单例捕获作用域服务
    pub enable_scope_validation: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_circular_dependency_detection: true,
            enable_scope_validation: true,
            max_resolution_depth: 64,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStats {
    /// 已注册服务数量
    pub registered_services: usize,
    /// 单例构造次数
    pub singleton_constructions: usize,
    /// 作用域实例构造次数
    pub scoped_constructions: usize,
    /// 瞬时实例构造次数
    pub transient_constructions: usize,
    /// 已打开的作用域数量
    pub scopes_opened: usize,
    /// 已释放的作用域数量
    pub scopes_released: usize,
    /// 解析错误数量
    pub resolution_errors: usize,
}

impl ContainerStats {
    /// 当前活跃作用域数量
    pub fn active_scopes(&self) -> usize {
        self.scopes_opened.saturating_sub(self.scopes_released)
    }

    /// 构造总次数
    pub fn total_constructions(&self) -> usize {
        self.singleton_constructions + self.scoped_constructions + self.transient_constructions
    }
}
