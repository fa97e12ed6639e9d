//! 请求级错误类型

use crate::http::HttpResponse;
use http::StatusCode;
use infrastructure_common::DependencyError;
use thiserror::Error;

/// 管道错误
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("未授权: {message}")]
    Unauthorized { message: String },

    #[error("请求验证失败: {message}")]
    ValidationFailed { message: String },

    #[error("处理器故障: {source}")]
    HandlerFault {
        #[source]
        source: HandlerError,
    },

    #[error("依赖解析失败: {source}")]
    Dependency {
        #[from]
        source: DependencyError,
    },
}

impl PipelineError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::HandlerFault { .. } | Self::Dependency { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 转换为响应，服务端错误不暴露细节
    pub fn into_response(self) -> HttpResponse {
        match self {
            Self::Unauthorized { .. } => HttpResponse::unauthorized(),
            Self::ValidationFailed { message } => HttpResponse::bad_request(message),
            Self::HandlerFault { .. } | Self::Dependency { .. } => HttpResponse::internal_error(),
        }
    }
}

impl From<HandlerError> for PipelineError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::MissingArgument { .. } | HandlerError::InvalidArgument { .. } => {
                Self::ValidationFailed {
                    message: err.to_string(),
                }
            }
            HandlerError::Dependency(source) => Self::Dependency { source },
            other => Self::HandlerFault { source: other },
        }
    }
}

/// 处理器错误
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{message}")]
    Fault { message: String },

    #[error("Missing argument '{name}'.")]
    MissingArgument { name: String },

    #[error("Invalid value for '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("服务未在路由参数中声明: {capability}")]
    UndeclaredService { capability: String },

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HandlerError {
    /// 创建处理器故障
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
pub type HandlerResult<T> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(
            PipelineError::unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PipelineError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::from(HandlerError::fault("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            PipelineError::from(DependencyError::not_registered("X")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn argument_errors_are_client_errors() {
        let err = PipelineError::from(HandlerError::InvalidArgument {
            name: "id".into(),
            reason: "not a number".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.body,
            Some(serde_json::Value::String(
                "Invalid value for 'id': not a number".into()
            ))
        );
    }

    #[test]
    fn server_errors_hide_details() {
        let response = PipelineError::from(HandlerError::fault("database password wrong")).into_response();
        assert!(!String::from_utf8_lossy(&response.body_bytes()).contains("password"));
    }
}
