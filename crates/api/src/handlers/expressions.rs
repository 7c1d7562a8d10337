use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use calc_domain::Expression;
use calc_orchestrator::expression::parse;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    auth::AuthenticatedUser,
    error::{ApiError, ApiResult},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    #[serde(default)]
    pub expression: String,
}

/// 线上表示：ID 以字符串形式传输，`result` 只在 completed 时出现
#[derive(Debug, Serialize)]
pub struct ExpressionResponse {
    pub id: String,
    pub expression: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
}

impl From<&Expression> for ExpressionResponse {
    fn from(expression: &Expression) -> Self {
        Self {
            id: expression.id.to_string(),
            expression: expression.expression.clone(),
            status: expression.status.to_string(),
            result: expression.result,
        }
    }
}

pub async fn calculate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CalculateRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    // 先解析再落库，解析不过去的文本不留痕迹
    let tree = parse(&request.expression)?;

    let expression = state
        .expr_repo
        .create(user.user_id, &request.expression)
        .await?;
    state.scheduler.submit(expression.id, tree).await?;

    info!(
        "用户 {} 提交表达式 {} ({})",
        user.user_id, expression.id, request.expression
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": expression.id.to_string() })),
    ))
}

pub async fn list_expressions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Value>> {
    let expressions = state.expr_repo.list_for_user(user.user_id).await?;
    let payload: Vec<ExpressionResponse> =
        expressions.iter().map(ExpressionResponse::from).collect();
    Ok(Json(json!({ "expressions": payload })))
}

pub async fn get_expression(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let expression = state
        .expr_repo
        .get_by_id(id, user.user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(json!({
        "expression": ExpressionResponse::from(&expression)
    })))
}
