//! 宿主构建、配置重载与 HTTP 适配集成测试

use crate::{Host, HostStatus};
use config_abstractions::{Options, OptionsMonitor};
use config_impl::InMemoryConfigProvider;
use di_abstractions::Capability;
use http::{Method, StatusCode};
use infrastructure_common::{
    Configurable, DependencyError, InfrastructureError, ValidationError,
};
use request_pipeline::{HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct GreetingSettings {
    message: String,
    #[serde(default)]
    repeat: u32,
}

impl Configurable for GreetingSettings {
    fn section_name() -> &'static str {
        "Greeting"
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.message.is_empty() {
            return Err(ValidationError::required_field_missing("Message"));
        }
        Ok(())
    }
}

const GREETING: Capability<Options<GreetingSettings>> = Capability::new("GreetingOptions");
const GREETING_MONITOR: Capability<dyn OptionsMonitor<GreetingSettings>> =
    Capability::new("GreetingMonitor");

trait Counter: Send + Sync {
    fn label(&self) -> &str;
}

struct FixedCounter(String);

impl Counter for FixedCounter {
    fn label(&self) -> &str {
        &self.0
    }
}

const COUNTER: Capability<dyn Counter> = Capability::new("Counter");

/// 带问候配置、一个作用域服务和两个路由的宿主构建器
fn builder() -> crate::HostBuilder {
    Host::builder()
        .configure_options(&GREETING, &GREETING_MONITOR)
        .configure_services(|services| {
            services.add_scoped(&COUNTER, |_| {
                let counter: Arc<dyn Counter> = Arc::new(FixedCounter("scoped".to_string()));
                Ok(counter)
            });
        })
        .map_routes(|routes| {
            routes
                .map_get("/greeting")
                .service(GREETING)
                .service(GREETING_MONITOR)
                .handle(|args| async move {
                    let snapshot = args.service(&GREETING)?;
                    let live = args.service(&GREETING_MONITOR)?;
                    Ok(HttpResponse::ok(json!({
                        "snapshot": snapshot.message,
                        "live": live.current_value().message,
                    })))
                });

            routes
                .map_post("/echo")
                .body::<Value>()
                .service(COUNTER)
                .handle(|args| async move {
                    let body: Value = args.body()?;
                    let counter = args.service(&COUNTER)?;
                    Ok(HttpResponse::ok(json!({ "echo": body, "counter": counter.label() })))
                });
        })
}

fn body_json(response: &HttpResponse) -> Value {
    serde_json::from_slice(&response.body_bytes()).unwrap()
}

async fn write_settings(path: &Path, message: &str) {
    let content = json!({ "Greeting": { "Message": message, "Repeat": 2 } });
    tokio::fs::write(path, content.to_string()).await.unwrap();
}

/// 在超时前反复检查条件
async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_host_handles_requests_with_bound_options() {
    let host = builder()
        .add_provider(InMemoryConfigProvider::new(json!({
            "greeting": { "Message": "hello" }
        })))
        .build()
        .await
        .expect("宿主构建应该成功");

    assert_eq!(host.status().await, HostStatus::Initialized);
    host.start().await.unwrap();
    assert_eq!(host.status().await, HostStatus::Running);

    let response = host.handle(HttpRequest::get("/greeting")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(body_json(&response), json!({ "snapshot": "hello", "live": "hello" }));

    let response = host
        .handle(HttpRequest::post("/echo").with_json(&json!({ "n": 1 })))
        .await;
    assert_eq!(body_json(&response), json!({ "echo": { "n": 1 }, "counter": "scoped" }));

    let response = host.handle(HttpRequest::get("/missing")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    host.stop().await.unwrap();
    assert_eq!(host.status().await, HostStatus::Stopped);

    let stats = host.services().stats();
    assert_eq!(stats.scopes_opened, 3);
    assert_eq!(stats.active_scopes(), 0);
    assert_eq!(stats.scoped_constructions, 1);
}

#[tokio::test]
async fn test_axum_router_round_trip() {
    let host = builder()
        .add_provider(InMemoryConfigProvider::new(json!({
            "Greeting": { "Message": "over http" }
        })))
        .build()
        .await
        .unwrap();

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/echo?verbose=true")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(r#"{"hello":"world"}"#))
        .unwrap();
    let response = host.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[http::header::CONTENT_TYPE],
        "application/json; charset=utf-8"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["echo"], json!({ "hello": "world" }));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let host = builder()
        .add_provider(InMemoryConfigProvider::new(json!({
            "Greeting": { "Message": "hi" }
        })))
        .build()
        .await
        .unwrap();

    let oversized = vec![b' '; crate::server::MAX_BODY_BYTES + 1];
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .body(axum::body::Body::from(oversized))
        .unwrap();
    let response = host.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(host.services().stats().scopes_opened, 0);
}

#[tokio::test]
async fn test_broken_body_stream_is_bad_request() {
    let host = builder()
        .add_provider(InMemoryConfigProvider::new(json!({
            "Greeting": { "Message": "hi" }
        })))
        .build()
        .await
        .unwrap();

    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
        Ok(b"{\"hello\":".to_vec()),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
    ];
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .body(axum::body::Body::from_stream(futures::stream::iter(chunks)))
        .unwrap();
    let response = host.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(host.services().stats().scopes_opened, 0);
}

#[tokio::test]
async fn test_reload_updates_monitor_but_not_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("appsettings.json");
    write_settings(&path, "first").await;

    let host = builder()
        .add_config_json(&path)
        .unwrap()
        .build()
        .await
        .unwrap();

    write_settings(&path, "second").await;
    assert_eq!(host.reload_configuration().await.unwrap(), 1);

    let response = host.handle(HttpRequest::get("/greeting")).await;
    assert_eq!(body_json(&response), json!({ "snapshot": "first", "live": "second" }));

    // 内容未变化时不发布
    assert_eq!(host.reload_configuration().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_reload_keeps_previous_value() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("appsettings.json");
    write_settings(&path, "stable").await;

    let host = builder()
        .add_config_json(&path)
        .unwrap()
        .build()
        .await
        .unwrap();
    let monitor = host.services().resolve(&GREETING_MONITOR).unwrap();

    // 验证失败
    write_settings(&path, "").await;
    assert!(host.reload_configuration().await.is_err());
    assert_eq!(monitor.current_value().message, "stable");

    // 解析失败
    tokio::fs::write(&path, "{ not json").await.unwrap();
    assert!(host.reload_configuration().await.is_err());
    assert_eq!(monitor.current_value().message, "stable");
}

#[tokio::test]
async fn test_hot_reload_follows_file_changes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("appsettings.json");
    write_settings(&path, "before").await;

    let host = builder()
        .add_config_json(&path)
        .unwrap()
        .enable_hot_reload(true)
        .reload_debounce(Duration::from_millis(50))
        .build()
        .await
        .unwrap();
    host.start().await.unwrap();

    let monitor = host.services().resolve(&GREETING_MONITOR).unwrap();
    let mut changes = monitor.subscribe();
    assert_eq!(monitor.current_value().message, "before");

    write_settings(&path, "after").await;
    let changed = eventually(|| monitor.current_value().message == "after").await;
    assert!(changed, "配置文件变更后监视器应该更新");
    assert!(changes.has_changed().unwrap());

    host.stop().await.unwrap();
}

#[tokio::test]
async fn test_missing_section_fails_validation_at_build() {
    let result = builder()
        .add_provider(InMemoryConfigProvider::new(json!({})))
        .build()
        .await;

    assert!(matches!(result, Err(InfrastructureError::BootstrapFailed { .. })));
}

#[tokio::test]
async fn test_unregistered_route_service_fails_build() {
    const UNKNOWN: Capability<dyn Counter> = Capability::new("Unknown");

    let result = Host::builder()
        .map_routes(|routes| {
            routes
                .map_get("/unknown")
                .service(UNKNOWN)
                .handle(|_| async { Ok(HttpResponse::text("unreachable")) });
        })
        .build()
        .await;

    match result {
        Err(InfrastructureError::DependencyError {
            source: DependencyError::NotRegistered { capability },
        }) => assert_eq!(capability, "Unknown"),
        other => panic!("应该因未注册的服务失败: {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_invalid_route_fails_build() {
    let result = Host::builder()
        .map_routes(|routes| {
            routes
                .map_get("/items/{id")
                .handle(|_| async { Ok(HttpResponse::text("unreachable")) });
        })
        .build()
        .await;

    assert!(matches!(result, Err(InfrastructureError::BootstrapFailed { .. })));
}

#[tokio::test]
async fn test_missing_config_file_fails_early() {
    let dir = TempDir::new().unwrap();
    let result = Host::builder().add_config_json(dir.path().join("absent.json"));

    assert!(matches!(result, Err(InfrastructureError::ConfigError { .. })));
}
