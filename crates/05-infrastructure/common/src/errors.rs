//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },

    #[error("配置类型转换失败: {message}")]
    TypeConversionError { message: String },

    #[error("配置验证失败: {source}")]
    ValidationFailed {
        #[from]
        source: ValidationError,
    },

    #[error("配置重载失败: {message}")]
    ReloadError { message: String },

    #[error("配置文件监控失败: {message}")]
    WatchError { message: String },
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("服务未注册: {capability}")]
    NotRegistered { capability: String },

    #[error("服务创建失败: {capability}, 原因: {source}")]
    CreationFailed {
        capability: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("服务类型不匹配: {capability}, 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        capability: String,
        expected: String,
        actual: String,
    },

    #[error("作用域不匹配: {capability}, {message}")]
    ScopeMismatch { capability: String, message: String },

    #[error("服务注册冲突: {capability}, 原因: {message}")]
    RegistrationConflict { capability: String, message: String },
}

impl DependencyError {
    /// 创建服务未注册错误
    pub fn not_registered(capability: impl Into<String>) -> Self {
        Self::NotRegistered {
            capability: capability.into(),
        }
    }

    /// 创建服务创建失败错误
    pub fn creation_failed(
        capability: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::CreationFailed {
            capability: capability.into(),
            source: source.into(),
        }
    }
}

/// 验证错误类型
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("验证失败: {message}")]
    ValidationFailed { message: String },

    #[error("必需字段缺失: {field_name}")]
    RequiredFieldMissing { field_name: String },

    #[error("字段值无效: {field_name}, 原因: {reason}")]
    InvalidFieldValue { field_name: String, reason: String },
}

impl ValidationError {
    /// 创建新的验证错误
    pub fn new(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// 创建必需字段缺失错误
    pub fn required_field_missing(field_name: impl Into<String>) -> Self {
        Self::RequiredFieldMissing {
            field_name: field_name.into(),
        }
    }

    /// 创建字段值无效错误
    pub fn invalid_field_value(field_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field_name: field_name.into(),
            reason: reason.into(),
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("验证错误: {source}")]
    ValidationError {
        #[from]
        source: ValidationError,
    },

    #[error("IO 错误: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },

    #[error("基础设施关闭失败: {message}")]
    ShutdownFailed { message: String },
}

impl InfrastructureError {
    /// 创建启动失败错误
    pub fn bootstrap(message: impl Into<String>) -> Self {
        Self::BootstrapFailed {
            message: message.into(),
        }
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
