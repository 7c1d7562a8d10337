use anyhow::Result;
use calc_service::app::AppMode;
use calc_service::common::run_cli;

#[tokio::main]
async fn main() -> Result<()> {
    run_cli(
        "calc-agent",
        "分布式算术计算服务 - Worker",
        Some("启动 Worker 进程，按 COMPUTING_POWER 并行认领和执行计算任务"),
        AppMode::Worker,
    )
    .await
}
