use anyhow::Result;
use calc_service::app::AppMode;
use calc_service::common::run_cli;

#[tokio::main]
async fn main() -> Result<()> {
    run_cli(
        "calc-orchestrator",
        "分布式算术计算服务 - 协调器",
        Some("启动协调器：客户端 HTTP API、Worker RPC 以及表达式调度器"),
        AppMode::Orchestrator,
    )
    .await
}
