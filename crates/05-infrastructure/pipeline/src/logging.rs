//! 请求日志阶段

use crate::context::RequestContext;
use crate::errors::PipelineResult;
use crate::http::HttpResponse;
use crate::middleware::{Middleware, Next};
use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

/// 请求日志中间件
///
/// 进入时记录路由名称，退出时记录状态码与耗时。错误原样向上传播。
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLoggingMiddleware;

#[async_trait]
impl Middleware for RequestLoggingMiddleware {
    async fn invoke(&self, ctx: &mut RequestContext, next: Next<'_>) -> PipelineResult<HttpResponse> {
        let started = Instant::now();
        info!(request_id = %ctx.request_id, "Request: {}", ctx.display_name());

        let result = next.run(ctx).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => info!(
                request_id = %ctx.request_id,
                elapsed_ms,
                "Response: Status Code {}",
                response.status.as_u16()
            ),
            Err(err) => warn!(
                request_id = %ctx.request_id,
                elapsed_ms,
                "Response: Status Code {} ({})",
                err.status_code().as_u16(),
                err
            ),
        }

        result
    }

    fn name(&self) -> &'static str {
        "RequestLogging"
    }
}
