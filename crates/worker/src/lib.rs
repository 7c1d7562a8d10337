//! Worker
//!
//! 无状态的计算节点：循环认领任务、按配置的耗时模拟执行、
//! 计算二元运算并回传结果。一个进程内按 `computing_power`
//! 并行运行多个循环。

pub mod executors;
pub mod service;

pub use executors::execute;
pub use service::{WorkerConfig, WorkerService};
