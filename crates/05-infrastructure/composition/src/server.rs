//! axum 适配
//!
//! 所有请求都进入同一个 fallback 处理器，由 [`RequestDispatcher`] 完成路由和管道执行。

use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use futures::StreamExt;
use http::StatusCode;
use request_pipeline::{HttpRequest, HttpResponse, RequestDispatcher};
use std::sync::Arc;
use tracing::warn;

/// 请求体上限
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 读取请求体，超过上限返回 413，传输错误返回 400
async fn read_body(body: Body) -> Result<Vec<u8>, StatusCode> {
    let mut stream = body.into_data_stream();
    let mut buffer = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            warn!("请求体传输中断: {}", e);
            StatusCode::BAD_REQUEST
        })?;
        if buffer.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

/// 构造 axum 路由
pub fn router(dispatcher: Arc<RequestDispatcher>) -> Router {
    Router::new()
        .fallback(dispatch_request)
        .with_state(dispatcher)
}

async fn dispatch_request(
    State(dispatcher): State<Arc<RequestDispatcher>>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match read_body(body).await {
        Ok(bytes) => bytes,
        Err(status) => {
            warn!("读取请求体失败 {} {}: {}", parts.method, parts.uri.path(), status);
            return into_axum_response(HttpResponse::new(status));
        }
    };

    let mut request = HttpRequest::new(parts.method, parts.uri.path());
    request.query = parts.uri.query().map(str::to_string);
    request.headers = parts.headers;
    request.body = body;

    into_axum_response(dispatcher.dispatch(request).await)
}

/// 转换为 axum 响应
pub fn into_axum_response(response: HttpResponse) -> Response {
    let mut converted = Response::new(Body::from(response.body_bytes()));
    *converted.status_mut() = response.status;
    *converted.headers_mut() = response.headers;
    converted
}
