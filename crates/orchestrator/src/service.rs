//! Worker RPC 服务端
//!
//! 桥接存储层与调度器：`GetTask` 做原子认领，`SubmitResult` 先落库
//! 再驱动推进遍历。对未知或重复的提交回软失败，不向 Worker 抛错。

use std::sync::Arc;

use calc_domain::TaskRepository;
use calc_proto::{Calculator, ResultRequest, ResultResponse, TaskRequest, TaskResponse};
use chrono::Duration;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use crate::scheduler::ExpressionScheduler;

pub struct CoordinatorService {
    task_repo: Arc<dyn TaskRepository>,
    scheduler: Arc<ExpressionScheduler>,
    stale_after: Duration,
}

impl CoordinatorService {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        scheduler: Arc<ExpressionScheduler>,
        stale_task_seconds: i64,
    ) -> Self {
        Self {
            task_repo,
            scheduler,
            stale_after: Duration::seconds(stale_task_seconds),
        }
    }
}

#[tonic::async_trait]
impl Calculator for CoordinatorService {
    async fn get_task(
        &self,
        request: Request<TaskRequest>,
    ) -> Result<Response<TaskResponse>, Status> {
        let computing_power = request.into_inner().computing_power;
        debug!("Worker 请求任务，并行度提示 {}", computing_power);

        match self.task_repo.claim_next(self.stale_after).await {
            Ok(Some(task)) => {
                info!(
                    "分发任务 {}: {} {} {}",
                    task.id, task.arg1, task.operation, task.arg2
                );
                Ok(Response::new(TaskResponse {
                    id: task.id.to_string(),
                    arg1: task.arg1,
                    arg2: task.arg2,
                    operation: task.operation.as_str().to_string(),
                    operation_time: task.operation_time_ms,
                }))
            }
            // 空 id 表示没有就绪任务，Worker 稍后重试
            Ok(None) => Ok(Response::new(TaskResponse::default())),
            Err(e) => {
                warn!("认领任务失败: {}", e);
                Err(Status::internal(e.to_string()))
            }
        }
    }

    async fn submit_result(
        &self,
        request: Request<ResultRequest>,
    ) -> Result<Response<ResultResponse>, Status> {
        let payload = request.into_inner();

        let Ok(task_id) = payload.id.parse::<i64>() else {
            warn!("收到无法解析的任务 ID: {:?}", payload.id);
            return Ok(Response::new(ResultResponse { success: false }));
        };

        match self.task_repo.complete(task_id, payload.result).await {
            Ok(Some(completion)) => {
                debug!(
                    "任务 {} 完成，同表达式剩余 {} 个任务",
                    task_id, completion.siblings_remaining
                );
                self.scheduler
                    .apply_result(task_id, payload.result)
                    .await
                    .map_err(|e| Status::internal(e.to_string()))?;
                Ok(Response::new(ResultResponse { success: true }))
            }
            // 未知任务或重复提交：软失败，不做任何推进
            Ok(None) => {
                debug!("忽略任务 {} 的提交：任务不存在或已完成", task_id);
                Ok(Response::new(ResultResponse { success: false }))
            }
            Err(e) => {
                warn!("写入任务 {} 结果失败: {}", task_id, e);
                Err(Status::internal(e.to_string()))
            }
        }
    }
}
