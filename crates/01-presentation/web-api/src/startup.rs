//! 宿主组装

use crate::routes::map_routes;
use crate::services::configure_services;
use crate::settings::{
    APP_SETTINGS, APP_SETTINGS_MONITOR, JWT_SETTINGS, JWT_SETTINGS_MONITOR,
};
use infrastructure_composition::HostBuilder;
use request_pipeline::{AuthenticationMiddleware, RequestLoggingMiddleware};
use tracing::info;

/// 在配置源之上注册设置、服务、管道和路由
///
/// 管道顺序：请求日志 → 认证 → 路由级过滤器 → 处理器。
pub fn configure(builder: HostBuilder) -> HostBuilder {
    builder
        .configure_options(&APP_SETTINGS, &APP_SETTINGS_MONITOR)
        .configure_options(&JWT_SETTINGS, &JWT_SETTINGS_MONITOR)
        .configure_services(configure_services)
        .configure_pipeline(|pipeline, provider| {
            let jwt = provider.resolve(&JWT_SETTINGS)?;
            info!("JWT 签发者: {}, 受众: {}", jwt.issuer, jwt.audience);
            pipeline
                .use_middleware(RequestLoggingMiddleware)
                .use_middleware(AuthenticationMiddleware::jwt(&jwt.validation_parameters()));
            Ok(())
        })
        .map_routes(map_routes)
}
