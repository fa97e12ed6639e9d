//! 服务生命周期定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 服务生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifetime {
    /// 单例模式 - 整个进程生命周期内只创建一个实例
    Singleton,
    /// 作用域模式 - 每个请求作用域内创建一个实例并在作用域内共享
    Scoped,
    /// 瞬时模式 - 每次解析都创建新实例
    Transient,
}

impl Lifetime {
    /// 当前生命周期的服务能否安全依赖 `dependency` 生命周期的服务
    ///
    /// 单例不能捕获作用域服务，否则作用域实例会被提升为进程级实例。
    pub fn can_depend_on(&self, dependency: Lifetime) -> bool {
        !(matches!(self, Self::Singleton) && matches!(dependency, Self::Scoped))
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::Transient
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => write!(f, "Singleton"),
            Self::Scoped => write!(f, "Scoped"),
            Self::Transient => write!(f, "Transient"),
        }
    }
}

/// 作用域标识信息
#[derive(Debug, Clone)]
pub struct ScopeInfo {
    pub id: uuid::Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ScopeInfo {
    /// 创建新作用域信息
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// 创建请求作用域信息
    pub fn request() -> Self {
        Self::new("request")
    }
}
