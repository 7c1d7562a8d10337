use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use calc_errors::CalcError;
use calc_orchestrator::ParseError;
use serde_json::json;

/// API错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Calc(#[from] CalcError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("请求参数错误: {0}")]
    Validation(String),

    #[error("认证失败: {0}")]
    Unauthorized(String),

    #[error("资源未找到")]
    NotFound,

    #[error("内部服务器错误")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::Calc(CalcError::UserAlreadyExists { .. }) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            ApiError::Calc(CalcError::UserNotFound { .. }) => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            ApiError::Calc(CalcError::ExpressionNotFound { .. }) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Calc(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "内部服务器错误".to_string(),
            ),
            // 无法解析的表达式按语义错误返回
            ApiError::Parse(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "内部服务器错误".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

/// API结果类型
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                ApiError::Calc(CalcError::user_already_exists("a")),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Calc(CalcError::user_not_found("a")),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Calc(CalcError::expression_not_found(1)),
                StatusCode::NOT_FOUND,
            ),
            (ApiError::Parse(ParseError::Empty), StatusCode::UNPROCESSABLE_ENTITY),
            (
                ApiError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Unauthorized("nope".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (ApiError::NotFound, StatusCode::NOT_FOUND),
            (
                ApiError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
