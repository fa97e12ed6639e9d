//! # 基础设施组合层
//!
//! 负责把配置、依赖注入容器、请求管道和路由组合成一个可运行的宿主。
//!
//! ## 主要功能
//!
//! - **宿主构建器**: 使用构建者模式组装配置源、服务、管道阶段和路由
//! - **配置热重载**: 监控配置文件，防抖后刷新所有强类型配置
//! - **HTTP 服务**: 基于 axum 的监听与优雅关闭
//! - **日志初始化**: `tracing-subscriber` 的统一配置
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::Host;
//! use request_pipeline::{HttpRequest, HttpResponse};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = Host::builder()
//!         .map_routes(|routes| {
//!             routes
//!                 .map_get("/ping")
//!                 .handle(|_| async { Ok(HttpResponse::text("pong")) });
//!         })
//!         .build()
//!         .await?;
//!
//!     host.start().await?;
//!     let response = host.handle(HttpRequest::get("/ping")).await;
//!     assert!(response.is_success());
//!     host.stop().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod host;
pub mod logging;
pub mod server;

#[cfg(test)]
mod tests;

// 重新导出主要类型
pub use builder::HostBuilder;
pub use host::{Host, HostStatus};
pub use logging::LoggingConfig;

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
