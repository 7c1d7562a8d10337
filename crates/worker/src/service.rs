//! Worker 服务
//!
//! 每个循环独立执行：认领 → 模拟耗时 → 计算 → 回传。
//! 传输错误退避 2 秒重试，无任务退避 1 秒，永不升级为失败。

use std::time::Duration;

use calc_config::AppConfig;
use calc_domain::Operation;
use calc_errors::CalcResult;
use calc_proto::{CalculatorClient, ResultRequest, TaskRequest};
use tokio::sync::broadcast;
use tokio::time::sleep;
use tonic::transport::Channel;
use tracing::{debug, error, info, warn};

use crate::executors::execute;

/// 传输错误后的退避
const TRANSPORT_BACKOFF: Duration = Duration::from_secs(2);
/// 队列为空时的退避
const IDLE_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub computing_power: u32,
    pub orchestrator_url: String,
}

impl WorkerConfig {
    /// tonic 需要带 scheme 的地址
    fn endpoint(&self) -> String {
        if self.orchestrator_url.starts_with("http://")
            || self.orchestrator_url.starts_with("https://")
        {
            self.orchestrator_url.clone()
        } else {
            format!("http://{}", self.orchestrator_url)
        }
    }
}

impl From<&AppConfig> for WorkerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            computing_power: config.computing_power,
            orchestrator_url: config.orchestrator_url.clone(),
        }
    }
}

pub struct WorkerService {
    config: WorkerConfig,
}

impl WorkerService {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    /// 启动 `computing_power` 个并行循环，收到关闭信号后全部退出
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> CalcResult<()> {
        info!(
            "启动 Worker，{} 个并行循环，目标 {}",
            self.config.computing_power,
            self.config.orchestrator_url
        );

        let endpoint = self.config.endpoint();
        let mut handles = Vec::new();
        for worker_id in 0..self.config.computing_power {
            let endpoint = endpoint.clone();
            let computing_power = self.config.computing_power as i32;
            let shutdown = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                endpoint,
                computing_power,
                shutdown,
            )));
        }

        for handle in handles {
            let _ = handle.await;
        }
        info!("Worker 全部循环已退出");
        Ok(())
    }
}

async fn worker_loop(
    worker_id: u32,
    endpoint: String,
    computing_power: i32,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    debug!("Worker {} 循环启动", worker_id);
    let mut client: Option<CalculatorClient<Channel>> = None;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Worker {} 收到关闭信号", worker_id);
                return;
            }
            _ = process_one(&mut client, &endpoint, worker_id, computing_power) => {}
        }
    }
}

/// 一次完整的认领-执行-提交循环体
async fn process_one(
    client_slot: &mut Option<CalculatorClient<Channel>>,
    endpoint: &str,
    worker_id: u32,
    computing_power: i32,
) {
    if client_slot.is_none() {
        match CalculatorClient::connect(endpoint.to_string()).await {
            Ok(client) => *client_slot = Some(client),
            Err(e) => {
                warn!("Worker {} 连接协调器失败: {}", worker_id, e);
                sleep(TRANSPORT_BACKOFF).await;
                return;
            }
        }
    }
    let Some(client) = client_slot.as_mut() else {
        return;
    };

    let task = match client
        .get_task(TaskRequest {
            computing_power,
        })
        .await
    {
        Ok(response) => response.into_inner(),
        Err(status) => {
            warn!("Worker {} 获取任务失败: {}", worker_id, status);
            *client_slot = None;
            sleep(TRANSPORT_BACKOFF).await;
            return;
        }
    };

    // 空 id 表示暂时没有就绪任务
    if task.id.is_empty() {
        sleep(IDLE_BACKOFF).await;
        return;
    }

    // 模拟运算耗时
    sleep(Duration::from_millis(task.operation_time.max(0) as u64)).await;

    let result = match Operation::parse(&task.operation) {
        Ok(operation) => execute(operation, task.arg1, task.arg2),
        Err(e) => {
            error!("Worker {} 收到无法识别的运算符: {}", worker_id, e);
            f64::NAN
        }
    };

    match client
        .submit_result(ResultRequest {
            id: task.id.clone(),
            result,
        })
        .await
    {
        Ok(response) => {
            if response.into_inner().success {
                info!(
                    "Worker {} 完成任务 {}: {} {} {} = {}",
                    worker_id, task.id, task.arg1, task.operation, task.arg2, result
                );
            } else {
                // 任务已被别人完成或已失效，软失败
                debug!("Worker {} 的任务 {} 提交被拒绝", worker_id, task.id);
            }
        }
        Err(status) => {
            warn!(
                "Worker {} 提交任务 {} 结果失败: {}",
                worker_id, task.id, status
            );
            *client_slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalization() {
        let config = WorkerConfig {
            computing_power: 1,
            orchestrator_url: "localhost:50051".to_string(),
        };
        assert_eq!(config.endpoint(), "http://localhost:50051");

        let config = WorkerConfig {
            computing_power: 1,
            orchestrator_url: "http://10.0.0.1:50051".to_string(),
        };
        assert_eq!(config.endpoint(), "http://10.0.0.1:50051");
    }

    #[test]
    fn test_config_from_app_config() {
        let mut app = AppConfig::default();
        app.computing_power = 4;
        app.orchestrator_url = "coordinator:50051".to_string();

        let config = WorkerConfig::from(&app);
        assert_eq!(config.computing_power, 4);
        assert_eq!(config.endpoint(), "http://coordinator:50051");
    }
}
