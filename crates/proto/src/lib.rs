//! Worker RPC 协议定义
//!
//! 由 `proto/calculator.proto` 经 tonic 生成，协调器实现服务端，
//! Worker 使用客户端。

pub mod calculator {
    tonic::include_proto!("calculator");
}

pub use calculator::calculator_client::CalculatorClient;
pub use calculator::calculator_server::{Calculator, CalculatorServer};
pub use calculator::{ResultRequest, ResultResponse, TaskRequest, TaskResponse};
