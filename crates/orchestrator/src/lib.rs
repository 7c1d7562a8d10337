//! 协调器
//!
//! 表达式求值引擎：解析器把表达式文本变成运算树，调度器把树
//! 序列化为可独立执行的二元任务并随结果回流逐步收敛到根值，
//! gRPC 服务把任务分发给 Worker，恢复服务在重启后从任务行重建进度。

pub mod expression;
pub mod recovery;
pub mod scheduler;
pub mod service;

pub use expression::{parse, ExprNode, ExprTree, NodeId, ParseError};
pub use recovery::{RecoveryReport, RecoveryService};
pub use scheduler::{ExpressionScheduler, OperationTimes};
pub use service::CoordinatorService;
