//! 路由表
//!
//! 路由在启动时声明，构建后只读。每个路由声明有序的参数来源、
//! 路由级过滤器、是否要求授权以及处理器。

use crate::errors::HandlerResult;
use crate::filters::RequiredFieldFilter;
use crate::http::HttpResponse;
use crate::invoker::{BodyBinder, Handler, HandlerArguments, ParameterSource};
use crate::middleware::Middleware;
use di_abstractions::{CapabilityKey, ServiceResolver};
use futures::future::BoxFuture;
use http::Method;
use infrastructure_common::{DependencyError, DependencyResult};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// 路由错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("路由模式无效: {pattern}, 原因: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("不支持的路由约束: {constraint} ({pattern})")]
    UnknownConstraint { pattern: String, constraint: String },

    #[error("路由参数未在模式中出现: {name} ({pattern})")]
    UnknownRouteParameter { pattern: String, name: String },

    #[error("重复的路由: {method} {pattern}")]
    Duplicate { method: String, pattern: String },
}

/// 路由参数约束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteConstraint {
    /// 32 位整数
    Int,
}

impl RouteConstraint {
    fn parse(name: &str) -> Option<Self> {
        name.eq_ignore_ascii_case("int").then_some(Self::Int)
    }

    fn accepts(self, value: &str) -> bool {
        match self {
            Self::Int => value.parse::<i32>().is_ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Parameter {
        name: String,
        constraint: Option<RouteConstraint>,
    },
}

/// 路由模式
///
/// 支持字面量段（忽略大小写）、`{name}` 和 `{name:int}`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("必须以 / 开头"));
        }

        let mut segments = Vec::new();
        for part in pattern.split('/').filter(|part| !part.is_empty()) {
            if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                let (name, constraint) = match inner.split_once(':') {
                    Some((name, constraint)) => {
                        let parsed = RouteConstraint::parse(constraint).ok_or_else(|| {
                            RouteError::UnknownConstraint {
                                pattern: pattern.to_string(),
                                constraint: constraint.to_string(),
                            }
                        })?;
                        (name, Some(parsed))
                    }
                    None => (inner, None),
                };

                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(invalid("参数名无效"));
                }
                if segments.iter().any(|s| matches!(s, Segment::Parameter { name: n, .. } if n == name)) {
                    return Err(invalid("参数名重复"));
                }
                segments.push(Segment::Parameter {
                    name: name.to_string(),
                    constraint,
                });
            } else if part.contains(['{', '}']) {
                return Err(invalid("花括号不匹配"));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        let raw = if segments.is_empty() {
            "/".to_string()
        } else {
            pattern.trim_end_matches('/').to_string()
        };

        Ok(Self { raw, segments })
    }

    /// 匹配路径，成功时返回路由值
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut values = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) => {
                    if !literal.eq_ignore_ascii_case(part) {
                        return None;
                    }
                }
                Segment::Parameter { name, constraint } => {
                    if constraint.is_some_and(|c| !c.accepts(part)) {
                        return None;
                    }
                    values.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(values)
    }

    /// 是否包含指定参数
    pub fn has_parameter(&self, name: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Parameter { name: n, .. } if n == name))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 两个模式是否等价（忽略字面量大小写）
    fn equivalent(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a.eq_ignore_ascii_case(b),
                    (
                        Segment::Parameter { constraint: a, .. },
                        Segment::Parameter { constraint: b, .. },
                    ) => a == b,
                    _ => false,
                })
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// 路由端点
pub struct RouteEndpoint {
    method: Method,
    pattern: RoutePattern,
    display_name: String,
    parameters: Vec<ParameterSource>,
    body_binder: Option<BodyBinder>,
    filters: Vec<Arc<dyn Middleware>>,
    requires_authorization: bool,
    handler: Handler,
}

impl RouteEndpoint {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// 形如 `HTTP: POST /Scoped`
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn parameters(&self) -> &[ParameterSource] {
        &self.parameters
    }

    pub fn filters(&self) -> &[Arc<dyn Middleware>] {
        &self.filters
    }

    pub fn requires_authorization(&self) -> bool {
        self.requires_authorization
    }

    pub(crate) fn body_binder(&self) -> Option<BodyBinder> {
        self.body_binder
    }

    pub(crate) fn handler(&self) -> &Handler {
        &self.handler
    }

    /// 声明的服务能力
    pub fn service_keys(&self) -> impl Iterator<Item = CapabilityKey> + '_ {
        self.parameters.iter().filter_map(|parameter| match parameter {
            ParameterSource::Service(key) => Some(*key),
            _ => None,
        })
    }
}

impl fmt::Debug for RouteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEndpoint")
            .field("display_name", &self.display_name)
            .field("parameters", &self.parameters)
            .field("filters", &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>())
            .field("requires_authorization", &self.requires_authorization)
            .finish()
    }
}

/// 只读路由表
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    endpoints: Vec<Arc<RouteEndpoint>>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// 按方法和路径匹配路由
    pub fn match_route(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<RouteEndpoint>, HashMap<String, String>)> {
        self.endpoints
            .iter()
            .filter(|endpoint| endpoint.method == *method)
            .find_map(|endpoint| {
                endpoint
                    .pattern
                    .matches(path)
                    .map(|values| (Arc::clone(endpoint), values))
            })
    }

    /// 校验所有声明的服务都能解析
    pub fn validate(&self, resolver: &dyn ServiceResolver) -> DependencyResult<()> {
        for endpoint in &self.endpoints {
            for key in endpoint.service_keys() {
                if !resolver.is_registered(key) {
                    error!("路由 {} 声明的服务未注册: {}", endpoint.display_name, key);
                    return Err(DependencyError::not_registered(key.to_string()));
                }
            }
        }
        info!("路由表校验通过，共 {} 个路由", self.endpoints.len());
        Ok(())
    }

    pub fn endpoints(&self) -> &[Arc<RouteEndpoint>] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// 路由表构建器
#[derive(Default)]
pub struct RouteTableBuilder {
    endpoints: Vec<RouteEndpoint>,
    errors: Vec<RouteError>,
}

impl RouteTableBuilder {
    pub fn map(&mut self, method: Method, pattern: &str) -> EndpointBuilder<'_> {
        EndpointBuilder::new(self, method, pattern.to_string())
    }

    pub fn map_get(&mut self, pattern: &str) -> EndpointBuilder<'_> {
        self.map(Method::GET, pattern)
    }

    pub fn map_post(&mut self, pattern: &str) -> EndpointBuilder<'_> {
        self.map(Method::POST, pattern)
    }

    pub fn map_put(&mut self, pattern: &str) -> EndpointBuilder<'_> {
        self.map(Method::PUT, pattern)
    }

    pub fn map_delete(&mut self, pattern: &str) -> EndpointBuilder<'_> {
        self.map(Method::DELETE, pattern)
    }

    /// 创建路由组
    pub fn map_group(&mut self, prefix: &str) -> RouteGroupBuilder<'_> {
        RouteGroupBuilder {
            table: self,
            prefix: prefix.trim_end_matches('/').to_string(),
            requires_authorization: false,
            filters: Vec::new(),
        }
    }

    /// 构建路由表，报告第一个错误
    pub fn build(mut self) -> Result<RouteTable, RouteError> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }
        Ok(RouteTable {
            endpoints: self.endpoints.into_iter().map(Arc::new).collect(),
        })
    }

    fn push(&mut self, endpoint: RouteEndpoint) {
        let duplicate = self.endpoints.iter().any(|existing| {
            existing.method == endpoint.method && existing.pattern.equivalent(&endpoint.pattern)
        });
        if duplicate {
            self.errors.push(RouteError::Duplicate {
                method: endpoint.method.to_string(),
                pattern: endpoint.pattern.to_string(),
            });
            return;
        }
        debug!("注册路由: {}", endpoint.display_name);
        self.endpoints.push(endpoint);
    }
}

/// 路由组构建器
pub struct RouteGroupBuilder<'a> {
    table: &'a mut RouteTableBuilder,
    prefix: String,
    requires_authorization: bool,
    filters: Vec<Arc<dyn Middleware>>,
}

impl RouteGroupBuilder<'_> {
    /// 组内所有路由都要求授权
    #[must_use]
    pub fn require_authorization(mut self) -> Self {
        self.requires_authorization = true;
        self
    }

    /// 组内所有路由都追加过滤器
    #[must_use]
    pub fn filter<M: Middleware + 'static>(mut self, filter: M) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn map(&mut self, method: Method, pattern: &str) -> EndpointBuilder<'_> {
        let full = format!("{}/{}", self.prefix, pattern.trim_start_matches('/'));
        let mut builder = EndpointBuilder::new(self.table, method, full);
        builder.requires_authorization = self.requires_authorization;
        builder.filters = self.filters.clone();
        builder
    }

    pub fn map_get(&mut self, pattern: &str) -> EndpointBuilder<'_> {
        self.map(Method::GET, pattern)
    }

    pub fn map_post(&mut self, pattern: &str) -> EndpointBuilder<'_> {
        self.map(Method::POST, pattern)
    }

    pub fn map_put(&mut self, pattern: &str) -> EndpointBuilder<'_> {
        self.map(Method::PUT, pattern)
    }

    pub fn map_delete(&mut self, pattern: &str) -> EndpointBuilder<'_> {
        self.map(Method::DELETE, pattern)
    }
}

/// 单个路由的构建器，`handle()` 时注册到路由表
#[must_use = "路由只有在调用 handle() 后才会注册"]
pub struct EndpointBuilder<'a> {
    table: &'a mut RouteTableBuilder,
    method: Method,
    pattern: String,
    parameters: Vec<ParameterSource>,
    body_binder: Option<BodyBinder>,
    filters: Vec<Arc<dyn Middleware>>,
    requires_authorization: bool,
}

impl<'a> EndpointBuilder<'a> {
    fn new(table: &'a mut RouteTableBuilder, method: Method, pattern: String) -> Self {
        Self {
            table,
            method,
            pattern,
            parameters: Vec::new(),
            body_binder: None,
            filters: Vec::new(),
            requires_authorization: false,
        }
    }

    /// 声明 JSON 请求体，绑定时按 `T` 校验
    pub fn body<T: DeserializeOwned>(mut self) -> Self {
        self.parameters.push(ParameterSource::Body);
        self.body_binder = Some(crate::invoker::bind_body_as::<T>);
        self
    }

    /// 声明路由值
    pub fn route_value(mut self, name: &str) -> Self {
        self.parameters.push(ParameterSource::RouteValue(name.to_string()));
        self
    }

    /// 声明从当前作用域解析的服务
    pub fn service(mut self, key: impl Into<CapabilityKey>) -> Self {
        self.parameters.push(ParameterSource::Service(key.into()));
        self
    }

    /// 声明已认证用户
    pub fn principal(mut self) -> Self {
        self.parameters.push(ParameterSource::Principal);
        self
    }

    /// 追加路由级过滤器
    pub fn filter<M: Middleware + 'static>(mut self, filter: M) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// 请求体字段必填
    pub fn require_field(self, field: &str) -> Self {
        self.filter(RequiredFieldFilter::new(field))
    }

    pub fn require_authorization(mut self) -> Self {
        self.requires_authorization = true;
        self
    }

    /// 设置处理器并注册路由
    pub fn handle<F, Fut>(self, handler: F)
    where
        F: Fn(HandlerArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<HttpResponse>> + Send + 'static,
    {
        let handler: Handler = Arc::new(
            move |arguments: HandlerArguments| -> BoxFuture<'static, HandlerResult<HttpResponse>> {
                Box::pin(handler(arguments))
            },
        );

        let pattern = match RoutePattern::parse(&self.pattern) {
            Ok(pattern) => pattern,
            Err(err) => {
                self.table.errors.push(err);
                return;
            }
        };

        for parameter in &self.parameters {
            if let ParameterSource::RouteValue(name) = parameter {
                if !pattern.has_parameter(name) {
                    self.table.errors.push(RouteError::UnknownRouteParameter {
                        pattern: pattern.to_string(),
                        name: name.clone(),
                    });
                    return;
                }
            }
        }

        let endpoint = RouteEndpoint {
            display_name: format!("HTTP: {} {}", self.method, pattern),
            method: self.method,
            pattern,
            parameters: self.parameters,
            body_binder: self.body_binder,
            filters: self.filters,
            requires_authorization: self.requires_authorization,
            handler,
        };
        self.table.push(endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_matches_with_constraints() {
        let pattern = RoutePattern::parse("/users/{id:int}").unwrap();

        let values = pattern.matches("/Users/42").unwrap();
        assert_eq!(values["id"], "42");
        assert!(pattern.matches("/users/abc").is_none());
        assert!(pattern.matches("/users/42/extra").is_none());
        assert!(pattern.matches("/users/99999999999").is_none());
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let pattern = RoutePattern::parse("/users/").unwrap();
        assert_eq!(pattern.as_str(), "/users");
        assert!(pattern.matches("/users").is_some());
        assert!(pattern.matches("/users/").is_some());
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(matches!(
            RoutePattern::parse("users"),
            Err(RouteError::InvalidPattern { .. })
        ));
        assert!(matches!(
            RoutePattern::parse("/users/{id:guid}"),
            Err(RouteError::UnknownConstraint { .. })
        ));
        assert!(matches!(
            RoutePattern::parse("/a/{id}/{id}"),
            Err(RouteError::InvalidPattern { .. })
        ));
        assert!(matches!(
            RoutePattern::parse("/a/{id"),
            Err(RouteError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn group_prefix_and_authorization_apply() {
        let mut builder = RouteTable::builder();
        {
            let mut users = builder.map_group("/users").require_authorization();
            users
                .map_get("/{id:int}")
                .route_value("id")
                .handle(|_| async { Ok(HttpResponse::text("one")) });
            users
                .map_post("/")
                .handle(|_| async { Ok(HttpResponse::text("created")) });
        }
        builder
            .map_get("/config")
            .handle(|_| async { Ok(HttpResponse::text("config")) });
        let table = builder.build().unwrap();

        let (endpoint, values) = table.match_route(&Method::GET, "/users/7").unwrap();
        assert_eq!(endpoint.display_name(), "HTTP: GET /users/{id:int}");
        assert!(endpoint.requires_authorization());
        assert_eq!(values["id"], "7");

        let (endpoint, _) = table.match_route(&Method::POST, "/users").unwrap();
        assert!(endpoint.requires_authorization());

        let (endpoint, _) = table.match_route(&Method::GET, "/config").unwrap();
        assert!(!endpoint.requires_authorization());

        assert!(table.match_route(&Method::DELETE, "/config").is_none());
    }

    #[test]
    fn unknown_route_value_fails_build() {
        let mut builder = RouteTable::builder();
        builder
            .map_get("/users")
            .route_value("id")
            .handle(|_| async { Ok(HttpResponse::text("x")) });

        assert!(matches!(
            builder.build(),
            Err(RouteError::UnknownRouteParameter { .. })
        ));
    }

    #[test]
    fn unregistered_service_reports_bare_capability() {
        let mut builder = RouteTable::builder();
        builder
            .map_get("/clock")
            .service(di_abstractions::CapabilityKey::new("Clock"))
            .handle(|_| async { Ok(HttpResponse::text("tick")) });
        let table = builder.build().unwrap();
        let provider = di_impl::ServiceCollection::new().build().unwrap();

        match table.validate(&provider) {
            Err(DependencyError::NotRegistered { capability }) => assert_eq!(capability, "Clock"),
            other => panic!("应该报告未注册的服务: {:?}", other),
        }
    }

    #[test]
    fn duplicate_routes_fail_build() {
        let mut builder = RouteTable::builder();
        builder
            .map_get("/items/{id}")
            .handle(|_| async { Ok(HttpResponse::text("a")) });
        builder
            .map_get("/Items/{key}")
            .handle(|_| async { Ok(HttpResponse::text("b")) });

        assert!(matches!(builder.build(), Err(RouteError::Duplicate { .. })));
    }
}
