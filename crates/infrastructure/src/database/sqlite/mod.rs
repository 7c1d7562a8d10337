mod sqlite_expression_repository;
mod sqlite_task_repository;
mod sqlite_user_repository;

pub use sqlite_expression_repository::SqliteExpressionRepository;
pub use sqlite_task_repository::SqliteTaskRepository;
pub use sqlite_user_repository::SqliteUserRepository;
