//! 存储层实现
//!
//! 基于 sqlx + SQLite 的持久化仓储。所有跨 Worker 的并发协调
//! （任务认领、完成判定）都收敛在这里的单事务操作上。

pub mod database;

pub use database::sqlite::{
    SqliteExpressionRepository, SqliteTaskRepository, SqliteUserRepository,
};
pub use database::{create_pool, run_migrations};
