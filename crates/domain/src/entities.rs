//! Domain Entities
//!
//! 核心领域实体定义，包含用户、表达式和二元计算任务。
//! 表达式由客户端提交，被分解为一组按依赖顺序执行的任务。

use calc_errors::CalcError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// 用户相关实体
// ============================================================================

/// 注册用户
///
/// `password_hash` 为 bcrypt 哈希，明文口令不落库。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

// ============================================================================
// 表达式相关实体
// ============================================================================

/// 算术表达式
///
/// # 字段说明
///
/// - `id`: 表达式的唯一标识符
/// - `user_id`: 所属用户
/// - `expression`: 客户端提交的原始文本
/// - `status`: 生命周期状态，只沿 pending → in_progress → {completed|error} 前进
/// - `result`: 终态为 completed 时的最终数值
/// - `created_at`: 创建时间
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub id: i64,
    pub user_id: i64,
    pub expression: String,
    pub status: ExpressionStatus,
    pub result: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Expression {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// 表达式状态
///
/// # 变体说明
///
/// - `Pending`: 已创建，尚未产生任务
/// - `InProgress`: 任务已入队，等待计算
/// - `Completed`: 计算完成，`result` 已写入
/// - `Error`: 解析失败或出现非有限中间值，`result` 保持为空
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExpressionStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "error")]
    Error,
}

impl ExpressionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionStatus::Pending => "pending",
            ExpressionStatus::InProgress => "in_progress",
            ExpressionStatus::Completed => "completed",
            ExpressionStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CalcError> {
        match s {
            "pending" => Ok(ExpressionStatus::Pending),
            "in_progress" => Ok(ExpressionStatus::InProgress),
            "completed" => Ok(ExpressionStatus::Completed),
            "error" => Ok(ExpressionStatus::Error),
            _ => Err(CalcError::Serialization(format!(
                "Invalid expression status: {s}"
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpressionStatus::Completed | ExpressionStatus::Error)
    }

    /// 状态只能单向推进，终态不可再变
    pub fn can_transition_to(&self, next: ExpressionStatus) -> bool {
        matches!(
            (self, next),
            (ExpressionStatus::Pending, ExpressionStatus::InProgress)
                | (ExpressionStatus::Pending, ExpressionStatus::Completed)
                | (ExpressionStatus::Pending, ExpressionStatus::Error)
                | (ExpressionStatus::InProgress, ExpressionStatus::Completed)
                | (ExpressionStatus::InProgress, ExpressionStatus::Error)
        )
    }
}

impl std::fmt::Display for ExpressionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<sqlx::Sqlite> for ExpressionStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for ExpressionStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        ExpressionStatus::parse(s).map_err(|e| e.to_string().into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for ExpressionStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

// ============================================================================
// 任务相关实体
// ============================================================================

/// 二元运算符
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Operation {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Sub => "-",
            Operation::Mul => "*",
            Operation::Div => "/",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CalcError> {
        match s {
            "+" => Ok(Operation::Add),
            "-" => Ok(Operation::Sub),
            "*" => Ok(Operation::Mul),
            "/" => Ok(Operation::Div),
            _ => Err(CalcError::InvalidOperation(s.to_string())),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<sqlx::Sqlite> for Operation {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Operation {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Operation::parse(s).map_err(|e| e.to_string().into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Operation {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

/// 计算任务
///
/// 一次独立的二元运算，由调度器持久化、由任意一个 Worker 认领执行。
///
/// # 字段说明
///
/// - `id`: 全局严格递增的任务标识符，由存储层分配
/// - `expression_id`: 所属表达式
/// - `arg1` / `arg2`: 两个实数操作数
/// - `operation`: 运算符
/// - `operation_time_ms`: Worker 模拟执行耗时（毫秒）
/// - `started_at`: 被认领的时间戳，超过陈旧阈值后可被重新认领
/// - `completed`: 完成标记，置位后任务不可变
/// - `result`: Worker 提交的运算结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub expression_id: i64,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: Operation,
    pub operation_time_ms: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed: bool,
    pub result: Option<f64>,
}

impl Task {
    pub fn is_claimed(&self) -> bool {
        self.started_at.is_some() && !self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ExpressionStatus::Pending,
            ExpressionStatus::InProgress,
            ExpressionStatus::Completed,
            ExpressionStatus::Error,
        ] {
            assert_eq!(ExpressionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(ExpressionStatus::parse("done").is_err());
    }

    #[test]
    fn test_status_transitions() {
        use ExpressionStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Error));
        assert!(!Completed.can_transition_to(Error));
        assert!(!Error.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Pending));
    }

    #[test]
    fn test_operation_roundtrip() {
        for op in [
            Operation::Add,
            Operation::Sub,
            Operation::Mul,
            Operation::Div,
        ] {
            assert_eq!(Operation::parse(op.as_str()).unwrap(), op);
        }
        assert!(Operation::parse("%").is_err());
    }

    #[test]
    fn test_status_serde_wire_names() {
        let json = serde_json::to_string(&ExpressionStatus::InProgress).unwrap();
        assert_eq!(json, r#""in_progress""#);
        let parsed: ExpressionStatus = serde_json::from_str(r#""error""#).unwrap();
        assert_eq!(parsed, ExpressionStatus::Error);
    }
}
