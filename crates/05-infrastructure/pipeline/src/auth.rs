//! JWT Bearer 认证
//!
//! 令牌的签名、签发者、受众和有效期校验都交给 `jsonwebtoken`。
//! 认证阶段只在路由要求授权时才拒绝请求。

use crate::context::RequestContext;
use crate::errors::PipelineResult;
use crate::http::HttpResponse;
use crate::middleware::{Middleware, Next};
use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// 已认证的用户
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub subject: Option<String>,
    pub name: Option<String>,
    pub claims: Map<String, Value>,
}

impl Principal {
    /// 从声明集合构建
    pub fn from_claims(claims: Map<String, Value>) -> Self {
        let text = |key: &str| claims.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            subject: text("sub"),
            name: text("name").or_else(|| text("unique_name")),
            claims,
        }
    }

    /// 获取声明
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// 用于日志的身份标识
    pub fn identity(&self) -> &str {
        self.name
            .as_deref()
            .or(self.subject.as_deref())
            .unwrap_or("anonymous")
    }
}

/// 认证错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("缺少 Bearer 令牌")]
    MissingToken,

    #[error("令牌已过期")]
    Expired,

    #[error("令牌无效: {0}")]
    InvalidToken(String),
}

/// 令牌验证器
#[cfg_attr(test, mockall::automock)]
pub trait TokenValidator: Send + Sync {
    /// 验证令牌并返回用户
    fn validate(&self, token: &str) -> Result<Principal, AuthError>;
}

/// JWT 验证参数
#[derive(Debug, Clone)]
pub struct JwtValidationParameters {
    pub issuer: String,
    pub audience: String,
    pub secret_key: String,
    /// 允许的时钟偏差（秒）
    pub leeway_seconds: u64,
}

impl JwtValidationParameters {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            secret_key: secret_key.into(),
            leeway_seconds: 60,
        }
    }
}

/// HS256 对称密钥 JWT 验证器
pub struct JwtBearerValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtBearerValidator {
    pub fn new(parameters: &JwtValidationParameters) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[parameters.issuer.as_str()]);
        validation.set_audience(&[parameters.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_exp = true;
        validation.leeway = parameters.leeway_seconds;

        Self {
            key: DecodingKey::from_secret(parameters.secret_key.as_bytes()),
            validation,
        }
    }
}

impl TokenValidator for JwtBearerValidator {
    fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(err.to_string()),
            },
        )?;
        Ok(Principal::from_claims(data.claims))
    }
}

/// 认证中间件
///
/// 有效令牌附加到上下文；要求授权的路由在令牌缺失或无效时返回 401，
/// 后续过滤器和处理器都不会执行。
pub struct AuthenticationMiddleware {
    validator: Arc<dyn TokenValidator>,
}

impl AuthenticationMiddleware {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self { validator }
    }

    /// 使用 JWT 参数创建
    pub fn jwt(parameters: &JwtValidationParameters) -> Self {
        Self::new(Arc::new(JwtBearerValidator::new(parameters)))
    }
}

#[async_trait]
impl Middleware for AuthenticationMiddleware {
    async fn invoke(&self, ctx: &mut RequestContext, next: Next<'_>) -> PipelineResult<HttpResponse> {
        let outcome = match ctx.request.bearer_token() {
            Some(token) => self.validator.validate(token),
            None => Err(AuthError::MissingToken),
        };

        match outcome {
            Ok(principal) => {
                debug!("认证成功: {}", principal.identity());
                ctx.principal = Some(principal);
            }
            Err(err) if ctx.requires_authorization() => {
                warn!("认证失败 {}: {}", ctx.display_name(), err);
                return Ok(HttpResponse::unauthorized());
            }
            Err(AuthError::MissingToken) => {}
            Err(err) => debug!("忽略无效令牌: {}", err),
        }

        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "Authentication"
    }
}
