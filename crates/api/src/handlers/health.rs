use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::ApiResult, routes::AppState};

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let pending = state.task_repo.count_pending().await?;
    let completed = state.task_repo.count_completed().await?;

    Ok(Json(json!({
        "status": "ok",
        "pending_tasks": pending,
        "completed_tasks": completed,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
