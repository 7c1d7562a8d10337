//! 核心领域模型
//!
//! 定义用户、表达式和计算任务等业务实体，以及仓储抽象接口。
//! 这些类型不依赖具体的存储实现。

pub mod entities;
pub mod repositories;

pub use entities::{Expression, ExpressionStatus, Operation, Task, User};
pub use repositories::{
    ExpressionRepository, NewTask, TaskCompletion, TaskRepository, UserRepository,
};
