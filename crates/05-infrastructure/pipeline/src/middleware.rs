//! 中间件管道
//!
//! 阶段在启动时按顺序注册，运行期不再调整。[`Next`] 是剩余阶段切片加终端的游标，
//! 每个阶段可以调用 `next.run(ctx)` 继续、直接返回响应短路，或原样传播错误。

use crate::context::RequestContext;
use crate::errors::PipelineResult;
use crate::http::HttpResponse;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// 管道阶段
#[async_trait]
pub trait Middleware: Send + Sync {
    /// 处理请求
    async fn invoke(&self, ctx: &mut RequestContext, next: Next<'_>) -> PipelineResult<HttpResponse>;

    /// 阶段名称
    fn name(&self) -> &'static str {
        "Middleware"
    }
}

/// 管道终端
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext) -> PipelineResult<HttpResponse>;
}

/// 剩余阶段的游标
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(stages: &'a [Arc<dyn Middleware>], terminal: &'a dyn Endpoint) -> Self {
        Self { stages, terminal }
    }

    /// 调用下一个阶段，阶段耗尽后调用终端
    pub async fn run(self, ctx: &mut RequestContext) -> PipelineResult<HttpResponse> {
        match self.stages.split_first() {
            Some((head, tail)) => {
                let next = Next {
                    stages: tail,
                    terminal: self.terminal,
                };
                head.invoke(ctx, next).await
            }
            None => self.terminal.call(ctx).await,
        }
    }

    /// 剩余阶段数量
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }
}

/// 已构建的管道
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Arc<Vec<Arc<dyn Middleware>>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// 以给定终端执行整条管道
    pub async fn execute(
        &self,
        ctx: &mut RequestContext,
        terminal: &dyn Endpoint,
    ) -> PipelineResult<HttpResponse> {
        Next::new(&self.stages, terminal).run(ctx).await
    }

    /// 按执行顺序的阶段名称
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// 管道构建器
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Middleware>>,
}

impl PipelineBuilder {
    /// 追加阶段
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.use_shared(Arc::new(middleware))
    }

    /// 追加共享阶段
    pub fn use_shared(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        debug!("注册管道阶段 #{}: {}", self.stages.len(), middleware.name());
        self.stages.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: Arc::new(self.stages),
        }
    }
}
