use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use calc_domain::{ExpressionRepository, TaskRepository, UserRepository};
use calc_orchestrator::ExpressionScheduler;

use crate::{
    auth::{auth_middleware, AuthConfig},
    handlers::{
        auth::{login, register},
        expressions::{calculate, get_expression, list_expressions},
        health::health_check,
    },
    middleware::{cors_layer, request_logging, trace_layer},
};

#[derive(Clone)]
pub struct AppState {
    pub user_repo: Arc<dyn UserRepository>,
    pub expr_repo: Arc<dyn ExpressionRepository>,
    pub task_repo: Arc<dyn TaskRepository>,
    pub scheduler: Arc<ExpressionScheduler>,
    pub auth_config: Arc<AuthConfig>,
}

pub fn create_routes(state: AppState) -> Router {
    // 认证路由不过鉴权中间件
    let public = Router::new()
        .route("/api/v1/register", post(register))
        .route("/api/v1/login", post(login))
        .route("/health", get(health_check));

    let protected = Router::new()
        .route("/api/v1/calculate", post(calculate))
        .route("/api/v1/expressions", get(list_expressions))
        .route("/api/v1/expressions/{id}", get(get_expression))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    public
        .merge(protected)
        .layer(middleware::from_fn(request_logging))
        .layer(trace_layer())
        .layer(cors_layer())
        .with_state(state)
}
