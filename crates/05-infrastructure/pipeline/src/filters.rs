//! 路由级输入验证过滤器
//!
//! 过滤器也是 [`Middleware`]，在请求体绑定之后、服务解析之前执行。

use crate::context::RequestContext;
use crate::errors::PipelineResult;
use crate::http::HttpResponse;
use crate::middleware::{Middleware, Next};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// 必填字段过滤器
///
/// 请求体中的字段（忽略大小写）缺失、非字符串或仅含空白时返回 400。
#[derive(Debug, Clone)]
pub struct RequiredFieldFilter {
    field: String,
    message: String,
}

impl RequiredFieldFilter {
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("{} is required.", capitalize(&field));
        Self { field, message }
    }

    /// 自定义错误消息
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn is_present(&self, body: Option<&Value>) -> bool {
        body.and_then(Value::as_object)
            .and_then(|object| {
                object
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(&self.field))
                    .map(|(_, value)| value)
            })
            .and_then(Value::as_str)
            .is_some_and(|text| !text.trim().is_empty())
    }
}

#[async_trait]
impl Middleware for RequiredFieldFilter {
    async fn invoke(&self, ctx: &mut RequestContext, next: Next<'_>) -> PipelineResult<HttpResponse> {
        if !self.is_present(ctx.body.as_ref()) {
            debug!("字段 {} 验证失败: {}", self.field, ctx.display_name());
            return Ok(HttpResponse::bad_request(self.message.clone()));
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "RequiredField"
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
