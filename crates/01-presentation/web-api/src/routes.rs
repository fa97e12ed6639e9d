//! 示例端点

use crate::services::{SCOPED_SERVICE, SINGLETON_SERVICE, TRANSIENT_SERVICE};
use crate::settings::{AppSettings, APP_SETTINGS, APP_SETTINGS_MONITOR};
use request_pipeline::{HandlerArguments, HandlerResult, HttpResponse, RouteTableBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 用户
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: i32,
    pub name: String,
}

fn settings_view(settings: &AppSettings) -> Value {
    json!({
        "application": settings.application_name,
        "version": settings.version,
        "featureX": if settings.enable_feature_x { "Enabled" } else { "Disabled" },
    })
}

/// 声明全部示例路由
pub fn map_routes(routes: &mut RouteTableBuilder) {
    map_configuration(routes);
    map_lifetimes(routes);
    map_users(routes);
}

fn map_configuration(routes: &mut RouteTableBuilder) {
    routes
        .map_get("/config")
        .service(APP_SETTINGS)
        .handle(|args| async move {
            let options = args.service(&APP_SETTINGS)?;
            Ok(HttpResponse::ok(settings_view(&options)))
        });

    routes
        .map_get("/config-live")
        .service(APP_SETTINGS_MONITOR)
        .handle(|args| async move {
            let monitor = args.service(&APP_SETTINGS_MONITOR)?;
            Ok(HttpResponse::ok(settings_view(&monitor.current_value())))
        });
}

fn map_lifetimes(routes: &mut RouteTableBuilder) {
    routes
        .map_post("/Singleton")
        .service(SINGLETON_SERVICE)
        .handle(|args| async move {
            let singleton = args.service(&SINGLETON_SERVICE)?;
            Ok(HttpResponse::text(format!(
                "Hello, World! Singleton ID: {}",
                singleton.get_id()
            )))
        });

    routes
        .map_post("/Scoped")
        .body::<User>()
        .service(SCOPED_SERVICE)
        .require_field("name")
        .handle(|args| async move {
            let user: User = args.body()?;
            let scoped = args.service(&SCOPED_SERVICE)?;
            Ok(HttpResponse::ok(json!(format!(
                "User: {}, Scoped ID: {}",
                user.name,
                scoped.get_id()
            ))))
        });

    routes
        .map_post("/Transient")
        .body::<User>()
        .service(TRANSIENT_SERVICE)
        .require_field("name")
        .handle(|args| async move {
            let user: User = args.body()?;
            let transient = args.service(&TRANSIENT_SERVICE)?;
            Ok(HttpResponse::ok(json!(format!(
                "User: {}, Transient ID: {}",
                user.name,
                transient.get_id()
            ))))
        });

    // 每个服务声明两次，便于在一次请求内比较
    routes
        .map_get("/lifetimes")
        .service(SINGLETON_SERVICE)
        .service(SINGLETON_SERVICE)
        .service(SCOPED_SERVICE)
        .service(SCOPED_SERVICE)
        .service(TRANSIENT_SERVICE)
        .service(TRANSIENT_SERVICE)
        .handle(|args| async move { lifetimes(&args) });
}

fn lifetimes(args: &HandlerArguments) -> HandlerResult<HttpResponse> {
    let ids = |services: Vec<std::sync::Arc<dyn crate::services::IdentifierService>>| {
        services
            .iter()
            .map(|service| service.get_id().to_string())
            .collect::<Vec<_>>()
    };

    Ok(HttpResponse::ok(json!({
        "singleton": ids(args.services(&SINGLETON_SERVICE)?),
        "scoped": ids(args.services(&SCOPED_SERVICE)?),
        "transient": ids(args.services(&TRANSIENT_SERVICE)?),
    })))
}

fn map_users(routes: &mut RouteTableBuilder) {
    let mut users = routes.map_group("/users").require_authorization();

    users
        .map_get("/{id:int}")
        .route_value("id")
        .service(TRANSIENT_SERVICE)
        .handle(|args| async move {
            let id: i32 = args.route_value("id")?;
            let transient = args.service(&TRANSIENT_SERVICE)?;
            Ok(HttpResponse::ok(json!({
                "id": id,
                "name": format!("User {}", id),
                "transientId": transient.get_id(),
            })))
        });

    users
        .map_post("/")
        .body::<User>()
        .service(SCOPED_SERVICE)
        .service(TRANSIENT_SERVICE)
        .handle(|args| async move {
            let user: User = args.body()?;
            let scoped = args.service(&SCOPED_SERVICE)?;
            let transient = args.service(&TRANSIENT_SERVICE)?;
            Ok(HttpResponse::created(
                &format!("/users/{}", user.id),
                json!({
                    "user": user,
                    "scopedId": scoped.get_id(),
                    "transientId": transient.get_id(),
                }),
            ))
        });
}
