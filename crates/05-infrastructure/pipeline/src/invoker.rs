//! 处理器调用
//!
//! 终端先绑定请求体，再执行路由级过滤器，过滤器全部通过后才从当前作用域解析
//! 声明的服务并调用处理器。被过滤器拒绝的请求不会构造任何作用域或瞬时实例。

use crate::auth::Principal;
use crate::context::RequestContext;
use crate::errors::{HandlerError, HandlerResult, PipelineError, PipelineResult};
use crate::http::HttpResponse;
use crate::middleware::{Endpoint, Next};
use crate::routing::RouteEndpoint;
use async_trait::async_trait;
use di_abstractions::{downcast_instance, Capability, CapabilityKey, Instance, ServiceResolver};
use futures::future::BoxFuture;
use infrastructure_common::DependencyError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// 参数来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSource {
    /// JSON 请求体
    Body,
    /// 路由值
    RouteValue(String),
    /// 从当前作用域解析的服务
    Service(CapabilityKey),
    /// 已认证用户
    Principal,
}

/// 处理器
pub type Handler =
    Arc<dyn Fn(HandlerArguments) -> BoxFuture<'static, HandlerResult<HttpResponse>> + Send + Sync>;

/// 请求体绑定校验
pub(crate) type BodyBinder = fn(&Value) -> Result<(), serde_json::Error>;

pub(crate) fn bind_body_as<T: DeserializeOwned>(value: &Value) -> Result<(), serde_json::Error> {
    T::deserialize(value).map(|_| ())
}

/// 处理器参数
///
/// 按路由声明的顺序准备好，处理器按需取用。
pub struct HandlerArguments {
    body: Option<Value>,
    route_values: HashMap<String, String>,
    services: Vec<(CapabilityKey, Instance)>,
    principal: Option<Principal>,
    request_id: Uuid,
}

impl HandlerArguments {
    /// 反序列化请求体
    pub fn body<T: DeserializeOwned>(&self) -> HandlerResult<T> {
        let value = self.body.as_ref().ok_or_else(|| HandlerError::MissingArgument {
            name: "body".to_string(),
        })?;
        T::deserialize(value).map_err(|err| HandlerError::InvalidArgument {
            name: "body".to_string(),
            reason: err.to_string(),
        })
    }

    /// 原始请求体
    pub fn body_value(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// 转换路由值
    pub fn route_value<T>(&self, name: &str) -> HandlerResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self
            .route_values
            .get(name)
            .ok_or_else(|| HandlerError::MissingArgument {
                name: name.to_string(),
            })?;
        raw.parse().map_err(|err: T::Err| HandlerError::InvalidArgument {
            name: name.to_string(),
            reason: err.to_string(),
        })
    }

    /// 第一个声明的该能力实例
    pub fn service<T>(&self, capability: &Capability<T>) -> HandlerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services(capability)?
            .into_iter()
            .next()
            .ok_or_else(|| HandlerError::UndeclaredService {
                capability: capability.name().to_string(),
            })
    }

    /// 该能力的所有声明实例，按声明顺序
    ///
    /// 同一能力声明多次时，每次声明各自解析一次。
    pub fn services<T>(&self, capability: &Capability<T>) -> HandlerResult<Vec<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let resolved = self
            .services
            .iter()
            .filter(|(key, _)| *key == capability.key())
            .map(|(_, instance)| {
                downcast_instance(capability, instance).ok_or_else(|| {
                    HandlerError::Dependency(DependencyError::TypeMismatch {
                        capability: capability.name().to_string(),
                        expected: capability.type_name().to_string(),
                        actual: "<unknown>".to_string(),
                    })
                })
            })
            .collect::<HandlerResult<Vec<_>>>()?;

        if resolved.is_empty() {
            return Err(HandlerError::UndeclaredService {
                capability: capability.name().to_string(),
            });
        }
        Ok(resolved)
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }
}

/// 处理器调用器
pub struct HandlerInvoker;

impl HandlerInvoker {
    /// 解析参数并调用处理器
    pub async fn invoke(
        endpoint: &RouteEndpoint,
        ctx: &mut RequestContext,
    ) -> PipelineResult<HttpResponse> {
        let arguments = Self::bind_arguments(endpoint, ctx)?;
        let handler = endpoint.handler();
        handler(arguments).await.map_err(PipelineError::from)
    }

    /// 按声明顺序准备参数，服务从当前作用域解析
    pub fn bind_arguments(
        endpoint: &RouteEndpoint,
        ctx: &RequestContext,
    ) -> PipelineResult<HandlerArguments> {
        let mut arguments = HandlerArguments {
            body: None,
            route_values: HashMap::new(),
            services: Vec::new(),
            principal: None,
            request_id: ctx.request_id,
        };

        for parameter in endpoint.parameters() {
            match parameter {
                ParameterSource::Body => {
                    let body = ctx
                        .body
                        .clone()
                        .ok_or_else(|| PipelineError::validation("A request body is required."))?;
                    arguments.body = Some(body);
                }
                ParameterSource::RouteValue(name) => {
                    let value = ctx.route_value(name).ok_or_else(|| {
                        PipelineError::validation(format!("Missing route value '{name}'."))
                    })?;
                    arguments.route_values.insert(name.clone(), value.to_string());
                }
                ParameterSource::Service(key) => {
                    let instance = ctx.scope().resolve_instance(*key)?;
                    trace!("解析处理器参数: {}", key);
                    arguments.services.push((*key, instance));
                }
                ParameterSource::Principal => {
                    let principal = ctx
                        .principal
                        .clone()
                        .ok_or_else(|| PipelineError::unauthorized("未认证的请求"))?;
                    arguments.principal = Some(principal);
                }
            }
        }

        Ok(arguments)
    }
}

/// 将声明的请求体解析为 JSON 并按目标类型校验
fn bind_body(endpoint: &RouteEndpoint, ctx: &mut RequestContext) -> PipelineResult<()> {
    let Some(binder) = endpoint.body_binder() else {
        return Ok(());
    };

    if ctx.request.body.iter().all(u8::is_ascii_whitespace) {
        return Err(PipelineError::validation("A request body is required."));
    }

    let value: Value = serde_json::from_slice(&ctx.request.body)
        .map_err(|err| PipelineError::validation(format!("Invalid JSON body: {err}")))?;
    binder(&value)
        .map_err(|err| PipelineError::validation(format!("Failed to bind request body: {err}")))?;

    ctx.body = Some(value);
    Ok(())
}

#[async_trait]
impl Endpoint for RouteEndpoint {
    async fn call(&self, ctx: &mut RequestContext) -> PipelineResult<HttpResponse> {
        HandlerInvoker::invoke(self, ctx).await
    }
}

/// 管道终端
///
/// 未匹配路由返回 404；匹配时绑定请求体，再执行路由级过滤器和处理器。
#[derive(Debug, Default, Clone, Copy)]
pub struct EndpointTerminal;

#[async_trait]
impl Endpoint for EndpointTerminal {
    async fn call(&self, ctx: &mut RequestContext) -> PipelineResult<HttpResponse> {
        let Some(endpoint) = ctx.endpoint.clone() else {
            return Ok(HttpResponse::not_found());
        };

        bind_body(&endpoint, ctx)?;
        Next::new(endpoint.filters(), &*endpoint).run(ctx).await
    }
}
