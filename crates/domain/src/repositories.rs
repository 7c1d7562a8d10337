//! 仓储抽象接口
//!
//! 存储层是系统唯一的共享可变资源，任务与表达式的 ID 分配、
//! 原子认领和完成判定都委托给它。内存缓存只允许作为派生状态。

use async_trait::async_trait;
use calc_errors::CalcResult;
use chrono::Duration;

use crate::entities::{Expression, ExpressionStatus, Operation, Task, User};

/// 待持久化的任务，ID 由存储层分配
#[derive(Debug, Clone)]
pub struct NewTask {
    pub expression_id: i64,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: Operation,
    pub operation_time_ms: i32,
}

/// `complete` 的结果：任务本体与同表达式未完成的兄弟任务数
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    pub task: Task,
    pub siblings_remaining: i64,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 创建用户；登录名冲突返回 `UserAlreadyExists`
    async fn create(&self, login: &str, password_hash: &str) -> CalcResult<User>;

    async fn get_by_login(&self, login: &str) -> CalcResult<Option<User>>;

    async fn get_by_id(&self, id: i64) -> CalcResult<Option<User>>;

    async fn delete(&self, id: i64) -> CalcResult<()>;
}

#[async_trait]
pub trait ExpressionRepository: Send + Sync {
    /// 创建表达式，初始状态为 `pending`
    async fn create(&self, user_id: i64, text: &str) -> CalcResult<Expression>;

    /// 按所属用户过滤查询，其他用户的表达式不可见
    async fn get_by_id(&self, id: i64, user_id: i64) -> CalcResult<Option<Expression>>;

    /// 用户的全部表达式，按创建时间倒序
    async fn list_for_user(&self, user_id: i64) -> CalcResult<Vec<Expression>>;

    /// 推进状态；非法转换返回 `InvalidStatusTransition`
    async fn update_status(
        &self,
        id: i64,
        status: ExpressionStatus,
        result: Option<f64>,
    ) -> CalcResult<()>;

    /// 所有未达终态的表达式，用于重启恢复
    async fn get_unfinished(&self) -> CalcResult<Vec<Expression>>;

    async fn delete(&self, id: i64, user_id: i64) -> CalcResult<()>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 持久化任务并分配严格递增的 ID
    async fn create(&self, task: &NewTask) -> CalcResult<Task>;

    /// 原子认领：选取 ID 最小的可认领任务并盖上 `started_at` 时间戳。
    /// 已认领但 `started_at` 早于 `stale_after` 的任务视为可重新认领。
    /// 必须在单个事务内完成，两个并发调用者不会拿到同一个任务。
    async fn claim_next(&self, stale_after: Duration) -> CalcResult<Option<Task>>;

    /// 标记完成并写入结果。对未知或已完成的任务返回 `Ok(None)`，
    /// 调用方据此做软失败处理。
    async fn complete(&self, task_id: i64, result: f64) -> CalcResult<Option<TaskCompletion>>;

    async fn get_by_id(&self, id: i64) -> CalcResult<Option<Task>>;

    /// 某表达式的全部任务，按 ID 升序
    async fn get_by_expression(&self, expression_id: i64) -> CalcResult<Vec<Task>>;

    async fn count_pending(&self) -> CalcResult<i64>;

    async fn count_completed(&self) -> CalcResult<i64>;
}
