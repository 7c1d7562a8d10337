use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    auth::{hash_password, verify_password, JwtService},
    error::{ApiError, ApiResult},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub login: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    if request.login.is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation("需要登录名和口令".to_string()));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::Internal(format!("口令哈希失败: {e}")))?;

    let user = state
        .user_repo
        .create(&request.login, &password_hash)
        .await?;

    info!("注册新用户 {} (id={})", user.login, user.id);
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            login: user.login,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .user_repo
        .get_by_login(&request.login)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("用户名或口令错误".to_string()))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("用户名或口令错误".to_string()));
    }

    let token = JwtService::from_config(&state.auth_config)
        .generate_token(user.id)
        .map_err(|e| ApiError::Internal(format!("生成令牌失败: {e}")))?;

    info!("用户 {} 登录成功", user.login);
    Ok(Json(json!({
        "token": token,
        "user": { "id": user.id, "login": user.login },
    })))
}
