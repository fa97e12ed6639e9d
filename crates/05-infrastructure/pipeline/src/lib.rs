//! # Request Pipeline
//!
//! 请求级处理：中间件管道、JWT 认证、路由级过滤器、路由表和处理器调用。
//!
//! ## 核心组件
//!
//! - [`Pipeline`] / [`Next`] - 有序阶段与显式游标
//! - [`AuthenticationMiddleware`] - Bearer 令牌认证
//! - [`RequiredFieldFilter`] - 输入验证过滤器
//! - [`RouteTable`] - 路由声明与匹配
//! - [`HandlerInvoker`] - 从请求作用域解析参数并调用处理器
//! - [`RequestDispatcher`] - 作用域打开/关闭与错误转换

pub mod auth;
pub mod context;
pub mod dispatcher;
pub mod errors;
pub mod filters;
pub mod http;
pub mod invoker;
pub mod logging;
pub mod middleware;
pub mod routing;

pub use auth::{
    AuthError, AuthenticationMiddleware, JwtBearerValidator, JwtValidationParameters, Principal,
    TokenValidator,
};
pub use context::RequestContext;
pub use dispatcher::RequestDispatcher;
pub use errors::{HandlerError, HandlerResult, PipelineError, PipelineResult};
pub use filters::RequiredFieldFilter;
pub use crate::http::{HttpRequest, HttpResponse};
pub use invoker::{EndpointTerminal, Handler, HandlerArguments, HandlerInvoker, ParameterSource};
pub use logging::RequestLoggingMiddleware;
pub use middleware::{Endpoint, Middleware, Next, Pipeline, PipelineBuilder};
pub use routing::{
    EndpointBuilder, RouteConstraint, RouteEndpoint, RouteError, RouteGroupBuilder, RoutePattern,
    RouteTable, RouteTableBuilder,
};
