//! 请求分发
//!
//! 每个请求：匹配路由 → 打开作用域 → 执行管道 → 关闭作用域 → 错误转换为响应。

use crate::context::RequestContext;
use crate::http::{HttpRequest, HttpResponse};
use crate::invoker::EndpointTerminal;
use crate::middleware::Pipeline;
use crate::routing::RouteTable;
use di_impl::ServiceProvider;
use std::sync::Arc;
use tracing::{debug, error};

/// 请求分发器
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    provider: ServiceProvider,
    routes: Arc<RouteTable>,
    pipeline: Pipeline,
    terminal: EndpointTerminal,
}

impl RequestDispatcher {
    pub fn new(provider: ServiceProvider, routes: RouteTable, pipeline: Pipeline) -> Self {
        Self {
            provider,
            routes: Arc::new(routes),
            pipeline,
            terminal: EndpointTerminal,
        }
    }

    /// 处理单个请求
    ///
    /// 作用域由上下文持有，请求 future 被取消时随上下文一起释放。
    pub async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let matched = self.routes.match_route(&request.method, &request.path);

        let mut ctx = RequestContext::new(request, self.provider.open_scope());
        if let Some((endpoint, route_values)) = matched {
            ctx = ctx.with_endpoint(endpoint, route_values);
        }

        let result = self.pipeline.execute(&mut ctx, &self.terminal).await;

        let display_name = ctx.display_name();
        let request_id = ctx.request_id;
        self.provider.close_scope(ctx.into_scope());

        match result {
            Ok(response) => response,
            Err(err) => {
                if err.status_code().is_server_error() {
                    error!(%request_id, "请求 {} 处理失败: {}", display_name, err);
                } else {
                    debug!(%request_id, "请求 {} 被拒绝: {}", display_name, err);
                }
                err.into_response()
            }
        }
    }

    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}
