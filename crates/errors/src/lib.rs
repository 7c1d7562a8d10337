use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalcError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),
    #[error("用户已存在: {login}")]
    UserAlreadyExists { login: String },
    #[error("用户未找到: {login}")]
    UserNotFound { login: String },
    #[error("表达式未找到: {id}")]
    ExpressionNotFound { id: i64 },
    #[error("任务未找到: {id}")]
    TaskNotFound { id: i64 },
    #[error("无效的表达式: {0}")]
    InvalidExpression(String),
    #[error("无效的状态转换: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },
    #[error("无效的运算符: {0}")]
    InvalidOperation(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("网络错误: {0}")]
    Network(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type CalcResult<T> = Result<T, CalcError>;

impl CalcError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn expression_not_found(id: i64) -> Self {
        Self::ExpressionNotFound { id }
    }
    pub fn task_not_found(id: i64) -> Self {
        Self::TaskNotFound { id }
    }
    pub fn user_not_found<S: Into<String>>(login: S) -> Self {
        Self::UserNotFound {
            login: login.into(),
        }
    }
    pub fn user_already_exists<S: Into<String>>(login: S) -> Self {
        Self::UserAlreadyExists {
            login: login.into(),
        }
    }
    pub fn invalid_expression<S: Into<String>>(msg: S) -> Self {
        Self::InvalidExpression(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CalcError::Database(_) | CalcError::DatabaseOperation(_) | CalcError::Network(_)
        )
    }
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CalcError::UserNotFound { .. }
                | CalcError::ExpressionNotFound { .. }
                | CalcError::TaskNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_helpers() {
        assert!(matches!(
            CalcError::expression_not_found(7),
            CalcError::ExpressionNotFound { id: 7 }
        ));
        assert!(matches!(
            CalcError::user_already_exists("alice"),
            CalcError::UserAlreadyExists { .. }
        ));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(CalcError::Network("connection reset".to_string()).is_retryable());
        assert!(CalcError::database_error("locked").is_retryable());
        assert!(!CalcError::task_not_found(1).is_retryable());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(CalcError::task_not_found(3).is_not_found());
        assert!(CalcError::user_not_found("bob").is_not_found());
        assert!(!CalcError::Internal("boom".to_string()).is_not_found());
    }
}
