//! 管道执行顺序、短路与作用域释放测试

use async_trait::async_trait;
use di_abstractions::Capability;
use di_impl::{ServiceCollection, ServiceProvider};
use http::{header, Method, StatusCode};
use parking_lot::Mutex;
use request_pipeline::{
    AuthError, AuthenticationMiddleware, Endpoint, HandlerError, HttpRequest, HttpResponse,
    Middleware, Next, Pipeline, PipelineError, PipelineResult, Principal, RequestContext,
    RequestDispatcher, RequestLoggingMiddleware, RouteTable, TokenValidator,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Journal = Arc<Mutex<Vec<String>>>;

/// 记录进入与退出的阶段
struct Recorder {
    name: &'static str,
    journal: Journal,
}

#[async_trait]
impl Middleware for Recorder {
    async fn invoke(&self, ctx: &mut RequestContext, next: Next<'_>) -> PipelineResult<HttpResponse> {
        self.journal.lock().push(format!("{}-enter", self.name));
        let result = next.run(ctx).await;
        let status = match &result {
            Ok(response) => response.status.as_u16(),
            Err(err) => err.status_code().as_u16(),
        };
        self.journal.lock().push(format!("{}-exit:{}", self.name, status));
        result
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// 直接返回响应的阶段
struct ShortCircuit {
    journal: Journal,
}

#[async_trait]
impl Middleware for ShortCircuit {
    async fn invoke(&self, _ctx: &mut RequestContext, _next: Next<'_>) -> PipelineResult<HttpResponse> {
        self.journal.lock().push("B-short".to_string());
        Ok(HttpResponse::new(StatusCode::IM_A_TEAPOT))
    }
}

struct RecordingTerminal {
    journal: Journal,
}

#[async_trait]
impl Endpoint for RecordingTerminal {
    async fn call(&self, _ctx: &mut RequestContext) -> PipelineResult<HttpResponse> {
        self.journal.lock().push("C".to_string());
        Ok(HttpResponse::text("done"))
    }
}

/// 只接受固定令牌的验证器
struct StaticTokenValidator;

impl TokenValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        if token == "valid-token" {
            let mut claims = Map::new();
            claims.insert("sub".into(), json!("7"));
            Ok(Principal::from_claims(claims))
        } else {
            Err(AuthError::InvalidToken("unknown token".into()))
        }
    }
}

trait IdService: Send + Sync {
    fn id(&self) -> &str;
}

struct RandomId(String);

impl IdService for RandomId {
    fn id(&self) -> &str {
        &self.0
    }
}

fn random_id() -> Arc<dyn IdService> {
    Arc::new(RandomId(uuid::Uuid::new_v4().to_string()))
}

const SCOPED: Capability<dyn IdService> = Capability::new("ScopedId");
const TRANSIENT: Capability<dyn IdService> = Capability::new("TransientId");

#[derive(Deserialize)]
struct User {
    name: String,
}

fn provider() -> ServiceProvider {
    let mut services = ServiceCollection::new();
    services
        .add_scoped(&SCOPED, |_| Ok(random_id()))
        .add_transient(&TRANSIENT, |_| Ok(random_id()));
    services.build().expect("服务提供者构建失败")
}

fn context(provider: &ServiceProvider) -> RequestContext {
    RequestContext::new(HttpRequest::get("/"), provider.open_scope())
}

#[tokio::test]
async fn stages_run_in_order_and_unwind_in_reverse() {
    let journal = Journal::default();
    let mut builder = Pipeline::builder();
    builder
        .use_middleware(Recorder { name: "A", journal: journal.clone() })
        .use_middleware(Recorder { name: "B", journal: journal.clone() });
    let pipeline = builder.build();
    assert_eq!(pipeline.stage_names(), vec!["A", "B"]);

    let provider = provider();
    let mut ctx = context(&provider);
    let terminal = RecordingTerminal { journal: journal.clone() };
    let response = pipeline.execute(&mut ctx, &terminal).await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        *journal.lock(),
        vec!["A-enter", "B-enter", "C", "B-exit:200", "A-exit:200"]
    );
}

#[tokio::test]
async fn short_circuit_skips_downstream_and_outer_stage_sees_its_response() {
    let journal = Journal::default();
    let mut builder = Pipeline::builder();
    builder
        .use_middleware(Recorder { name: "A", journal: journal.clone() })
        .use_middleware(ShortCircuit { journal: journal.clone() })
        .use_middleware(Recorder { name: "D", journal: journal.clone() });
    let pipeline = builder.build();

    let provider = provider();
    let mut ctx = context(&provider);
    let terminal = RecordingTerminal { journal: journal.clone() };
    let response = pipeline.execute(&mut ctx, &terminal).await.unwrap();

    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(*journal.lock(), vec!["A-enter", "B-short", "A-exit:418"]);
}

#[tokio::test]
async fn errors_propagate_through_stages_unchanged() {
    struct Failing;

    #[async_trait]
    impl Endpoint for Failing {
        async fn call(&self, _ctx: &mut RequestContext) -> PipelineResult<HttpResponse> {
            Err(HandlerError::fault("boom").into())
        }
    }

    let journal = Journal::default();
    let mut builder = Pipeline::builder();
    builder.use_middleware(Recorder { name: "A", journal: journal.clone() });
    let pipeline = builder.build();

    let provider = provider();
    let mut ctx = context(&provider);
    let err = pipeline.execute(&mut ctx, &Failing).await.unwrap_err();

    assert!(matches!(err, PipelineError::HandlerFault { .. }));
    assert_eq!(*journal.lock(), vec!["A-enter", "A-exit:500"]);
}

fn dispatcher(provider: ServiceProvider, invocations: Arc<AtomicUsize>) -> RequestDispatcher {
    let mut routes = RouteTable::builder();

    let counter = Arc::clone(&invocations);
    routes
        .map_post("/Scoped")
        .body::<User>()
        .service(SCOPED)
        .require_field("name")
        .handle(move |args| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let user: User = args.body()?;
                let scoped = args.service(&SCOPED)?;
                Ok(HttpResponse::ok(json!(format!(
                    "User: {}, Scoped ID: {}",
                    user.name,
                    scoped.id()
                ))))
            }
        });

    {
        let mut users = routes.map_group("/users").require_authorization();
        let counter = Arc::clone(&invocations);
        users
            .map_get("/{id:int}")
            .route_value("id")
            .service(SCOPED)
            .service(TRANSIENT)
            .principal()
            .handle(move |args| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let id: i32 = args.route_value("id")?;
                    let subject = args
                        .principal()
                        .and_then(|p| p.subject.clone())
                        .unwrap_or_default();
                    Ok(HttpResponse::ok(json!({ "id": id, "subject": subject })))
                }
            });
    }

    routes.map_get("/fault").service(SCOPED).handle(|args| async move {
        let _scoped = args.service(&SCOPED)?;
        Err(HandlerError::fault("handler exploded"))
    });

    routes.map_get("/slow").service(SCOPED).handle(|args| async move {
        let _scoped = args.service(&SCOPED)?;
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(HttpResponse::text("never"))
    });

    let routes = routes.build().expect("路由表构建失败");
    routes.validate(&provider).expect("路由依赖校验失败");

    let mut pipeline = Pipeline::builder();
    pipeline
        .use_middleware(RequestLoggingMiddleware)
        .use_middleware(AuthenticationMiddleware::new(Arc::new(StaticTokenValidator)));

    RequestDispatcher::new(provider, routes, pipeline.build())
}

#[tokio::test]
async fn empty_name_is_rejected_before_handler_and_services() {
    let provider = provider();
    let invocations = Arc::new(AtomicUsize::new(0));
    let dispatcher = dispatcher(provider.clone(), Arc::clone(&invocations));

    let response = dispatcher
        .dispatch(HttpRequest::post("/Scoped").with_json(&json!({ "name": "  " })))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body, Some(Value::String("Name is required.".into())));
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
    assert_eq!(provider.stats().scoped_constructions, 0);
}

#[tokio::test]
async fn valid_name_reaches_handler() {
    let provider = provider();
    let invocations = Arc::new(AtomicUsize::new(0));
    let dispatcher = dispatcher(provider.clone(), Arc::clone(&invocations));

    let response = dispatcher
        .dispatch(HttpRequest::post("/scoped").with_json(&json!({ "name": "Ana" })))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.body.unwrap();
    assert!(body.as_str().unwrap().starts_with("User: Ana, Scoped ID: "));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(provider.stats().scoped_constructions, 1);
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let provider = provider();
    let dispatcher = dispatcher(provider.clone(), Arc::new(AtomicUsize::new(0)));

    let missing = dispatcher.dispatch(HttpRequest::post("/Scoped")).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let malformed = dispatcher
        .dispatch(HttpRequest::post("/Scoped").with_body("{not json"))
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let wrong_shape = dispatcher
        .dispatch(HttpRequest::post("/Scoped").with_json(&json!({ "name": 42 })))
        .await;
    assert_eq!(wrong_shape.status, StatusCode::BAD_REQUEST);
    assert_eq!(provider.stats().scoped_constructions, 0);
}

#[tokio::test]
async fn missing_credentials_are_rejected_without_resolving_services() {
    let provider = provider();
    let invocations = Arc::new(AtomicUsize::new(0));
    let dispatcher = dispatcher(provider.clone(), Arc::clone(&invocations));

    let anonymous = dispatcher.dispatch(HttpRequest::get("/users/5")).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.headers[header::WWW_AUTHENTICATE], "Bearer");

    let forged = dispatcher
        .dispatch(HttpRequest::get("/users/5").with_bearer_token("forged"))
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let stats = provider.stats();
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
    assert_eq!(stats.scoped_constructions, 0);
    assert_eq!(stats.transient_constructions, 0);
}

#[tokio::test]
async fn valid_credentials_reach_guarded_route() {
    let provider = provider();
    let dispatcher = dispatcher(provider.clone(), Arc::new(AtomicUsize::new(0)));

    let response = dispatcher
        .dispatch(HttpRequest::get("/users/5").with_bearer_token("valid-token"))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, Some(json!({ "id": 5, "subject": "7" })));

    let not_an_int = dispatcher
        .dispatch(HttpRequest::get("/users/abc").with_bearer_token("valid-token"))
        .await;
    assert_eq!(not_an_int.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unmatched_routes_get_not_found() {
    let provider = provider();
    let dispatcher = dispatcher(provider.clone(), Arc::new(AtomicUsize::new(0)));

    let response = dispatcher
        .dispatch(HttpRequest::new(Method::DELETE, "/nowhere"))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(provider.stats().active_scopes(), 0);
}

#[tokio::test]
async fn every_opened_scope_is_released_after_a_burst_with_faults() {
    let provider = provider();
    let dispatcher = Arc::new(dispatcher(provider.clone(), Arc::new(AtomicUsize::new(0))));

    let requests = (0..60).map(|i| {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let request = match i % 3 {
                0 => HttpRequest::get("/fault"),
                1 => HttpRequest::post("/Scoped").with_json(&json!({ "name": "Ana" })),
                _ => HttpRequest::get("/users/1"),
            };
            dispatcher.dispatch(request).await.status
        })
    });

    let statuses: Vec<StatusCode> = futures::future::join_all(requests)
        .await
        .into_iter()
        .map(|joined| joined.expect("任务异常"))
        .collect();

    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::INTERNAL_SERVER_ERROR).count(),
        20
    );
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 20);
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::UNAUTHORIZED).count(),
        20
    );

    let stats = provider.stats();
    assert_eq!(stats.scopes_opened, 60);
    assert_eq!(stats.scopes_released, 60);
    assert_eq!(stats.scoped_constructions, 40);
}

#[tokio::test]
async fn cancelled_request_releases_its_scope() {
    let provider = provider();
    let dispatcher = Arc::new(dispatcher(provider.clone(), Arc::new(AtomicUsize::new(0))));

    let task = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.dispatch(HttpRequest::get("/slow")).await })
    };

    // 等待处理器解析出作用域服务
    for _ in 0..100 {
        if provider.stats().scoped_constructions == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(provider.stats().active_scopes(), 1);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    let stats = provider.stats();
    assert_eq!(stats.scopes_opened, 1);
    assert_eq!(stats.scopes_released, 1);
}
