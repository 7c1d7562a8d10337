use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use calc_api::{create_routes, AppState, AuthConfig};
use calc_infrastructure::{
    SqliteExpressionRepository, SqliteTaskRepository, SqliteUserRepository,
};
use calc_orchestrator::{ExpressionScheduler, OperationTimes};
use calc_testing_utils::{test_database, TestDatabase};
use serde_json::{json, Value};
use tower::ServiceExt;

const TIMES: OperationTimes = OperationTimes {
    addition_ms: 100,
    subtraction_ms: 100,
    multiplication_ms: 100,
    division_ms: 100,
};

struct TestApp {
    app: Router,
    _db: TestDatabase,
}

async fn test_app() -> TestApp {
    let db = test_database().await;
    let user_repo = Arc::new(SqliteUserRepository::new(db.pool.clone()));
    let expr_repo = Arc::new(SqliteExpressionRepository::new(db.pool.clone()));
    let task_repo = Arc::new(SqliteTaskRepository::new(db.pool.clone()));
    let scheduler = Arc::new(ExpressionScheduler::new(
        expr_repo.clone(),
        task_repo.clone(),
        TIMES,
    ));
    let state = AppState {
        user_repo,
        expr_repo,
        task_repo,
        scheduler,
        auth_config: Arc::new(AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_hours: 24,
        }),
    };
    TestApp {
        app: create_routes(state),
        _db: db,
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, login: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/v1/register",
        None,
        Some(json!({ "login": login, "password": password })),
    )
    .await
}

async fn login_token(app: &Router, login: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "login": login, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_creates_user() {
    let t = test_app().await;
    let (status, body) = register(&t.app, "alice", "secret").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["login"], "alice");
    assert!(body["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_register_duplicate_login_conflicts() {
    let t = test_app().await;
    let (status, _) = register(&t.app, "alice", "secret").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = register(&t.app, "alice", "other").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_register_rejects_missing_fields() {
    let t = test_app().await;
    let (status, _) = send(
        &t.app,
        "POST",
        "/api/v1/register",
        None,
        Some(json!({ "login": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_returns_token_and_user() {
    let t = test_app().await;
    register(&t.app, "alice", "secret").await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "login": "alice", "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["login"], "alice");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let t = test_app().await;
    register(&t.app, "alice", "secret").await;

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "login": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "login": "nobody", "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_calculate_requires_auth() {
    let t = test_app().await;

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/v1/calculate",
        None,
        Some(json!({ "expression": "2+2" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/v1/calculate",
        Some("invalid_token"),
        Some(json!({ "expression": "2+2" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_calculate_accepts_valid_expression() {
    let t = test_app().await;
    register(&t.app, "alice", "secret").await;
    let token = login_token(&t.app, "alice", "secret").await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/v1/calculate",
        Some(&token),
        Some(json!({ "expression": "2+2*2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap();
    assert!(id.parse::<i64>().is_ok());
}

#[tokio::test]
async fn test_calculate_rejects_unparseable_expressions() {
    let t = test_app().await;
    register(&t.app, "alice", "secret").await;
    let token = login_token(&t.app, "alice", "secret").await;

    for bad in ["2++2", "(1+2", "1 2", ""] {
        let (status, body) = send(
            &t.app,
            "POST",
            "/api/v1/calculate",
            Some(&token),
            Some(json!({ "expression": bad })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "expression {bad:?}");
        assert!(body["error"].is_string());
    }

    // 解析失败不留下表达式
    let (_, body) = send(&t.app, "GET", "/api/v1/expressions", Some(&token), None).await;
    assert_eq!(body["expressions"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_expressions_visible_to_owner_only() {
    let t = test_app().await;
    register(&t.app, "alice", "secret").await;
    register(&t.app, "bob", "secret").await;
    let alice = login_token(&t.app, "alice", "secret").await;
    let bob = login_token(&t.app, "bob", "secret").await;

    let (_, body) = send(
        &t.app,
        "POST",
        "/api/v1/calculate",
        Some(&alice),
        Some(json!({ "expression": "1+1" })),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    // 所有者能看到
    let (status, body) = send(
        &t.app,
        "GET",
        &format!("/api/v1/expressions/{id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expression"]["expression"], "1+1");

    // 其他用户拿不到
    let (status, _) = send(
        &t.app,
        "GET",
        &format!("/api/v1/expressions/{id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&t.app, "GET", "/api/v1/expressions", Some(&bob), None).await;
    assert_eq!(body["expressions"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_expression_returns_not_found() {
    let t = test_app().await;
    register(&t.app, "alice", "secret").await;
    let token = login_token(&t.app, "alice", "secret").await;

    let (status, _) = send(&t.app, "GET", "/api/v1/expressions/9999", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_shows_status_and_hides_result_until_completed() {
    let t = test_app().await;
    register(&t.app, "alice", "secret").await;
    let token = login_token(&t.app, "alice", "secret").await;

    send(
        &t.app,
        "POST",
        "/api/v1/calculate",
        Some(&token),
        Some(json!({ "expression": "1+2" })),
    )
    .await;

    let (status, body) = send(&t.app, "GET", "/api/v1/expressions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["expressions"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "in_progress");
    assert!(listed[0].get("result").is_none());
}

#[tokio::test]
async fn test_plain_number_completes_immediately() {
    let t = test_app().await;
    register(&t.app, "alice", "secret").await;
    let token = login_token(&t.app, "alice", "secret").await;

    let (_, body) = send(
        &t.app,
        "POST",
        "/api/v1/calculate",
        Some(&token),
        Some(json!({ "expression": "42" })),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    let (_, body) = send(
        &t.app,
        "GET",
        &format!("/api/v1/expressions/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["expression"]["status"], "completed");
    assert_eq!(body["expression"]["result"], 42.0);
}

#[tokio::test]
async fn test_health_endpoint_is_open() {
    let t = test_app().await;
    let (status, body) = send(&t.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
