//! 请求上下文
//!
//! 作用域作为显式的值随上下文传递，上下文被丢弃时作用域随之释放。

use crate::auth::Principal;
use crate::http::HttpRequest;
use crate::routing::RouteEndpoint;
use di_impl::ServiceScope;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 请求上下文
#[derive(Debug)]
pub struct RequestContext {
    pub request: HttpRequest,
    /// 匹配到的路由，未匹配时为空
    pub endpoint: Option<Arc<RouteEndpoint>>,
    pub route_values: HashMap<String, String>,
    /// 已绑定的 JSON 请求体
    pub body: Option<Value>,
    pub principal: Option<Principal>,
    pub request_id: Uuid,
    scope: ServiceScope,
}

impl RequestContext {
    pub fn new(request: HttpRequest, scope: ServiceScope) -> Self {
        Self {
            request,
            endpoint: None,
            route_values: HashMap::new(),
            body: None,
            principal: None,
            request_id: Uuid::new_v4(),
            scope,
        }
    }

    /// 设置匹配到的路由
    #[must_use]
    pub fn with_endpoint(
        mut self,
        endpoint: Arc<RouteEndpoint>,
        route_values: HashMap<String, String>,
    ) -> Self {
        self.endpoint = Some(endpoint);
        self.route_values = route_values;
        self
    }

    /// 当前请求的服务作用域
    pub fn scope(&self) -> &ServiceScope {
        &self.scope
    }

    /// 路由值
    pub fn route_value(&self, name: &str) -> Option<&str> {
        self.route_values.get(name).map(String::as_str)
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// 匹配到的路由是否要求授权
    pub fn requires_authorization(&self) -> bool {
        self.endpoint
            .as_ref()
            .is_some_and(|endpoint| endpoint.requires_authorization())
    }

    /// 用于日志的请求名称
    pub fn display_name(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.display_name().to_string(),
            None => self.request.to_string(),
        }
    }

    /// 取出作用域，上下文结束
    pub fn into_scope(self) -> ServiceScope {
        self.scope
    }
}
