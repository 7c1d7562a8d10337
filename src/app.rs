use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use calc_api::{create_routes, AppState, AuthConfig};
use calc_config::AppConfig;
use calc_infrastructure::{
    create_pool, SqliteExpressionRepository, SqliteTaskRepository, SqliteUserRepository,
};
use calc_orchestrator::{
    CoordinatorService, ExpressionScheduler, OperationTimes, RecoveryService,
};
use calc_proto::CalculatorServer;
use calc_worker::{WorkerConfig, WorkerService};
use tokio::net::TcpListener;
use tracing::info;

use crate::shutdown::ShutdownManager;

/// 应用运行模式
#[derive(Debug, Clone, Copy)]
pub enum AppMode {
    /// 协调器：HTTP API + Worker RPC + 调度器
    Orchestrator,
    /// 仅 Worker 循环
    Worker,
    /// 单进程内同时运行协调器与 Worker
    All,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
}

impl Application {
    pub fn new(config: AppConfig, mode: AppMode) -> Self {
        Self { config, mode }
    }

    pub async fn run(&self, shutdown: &ShutdownManager) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        match self.mode {
            AppMode::Orchestrator => self.run_orchestrator(shutdown).await,
            AppMode::Worker => self.run_worker(shutdown).await,
            AppMode::All => {
                let orchestrator = self.run_orchestrator(shutdown);
                let worker = self.run_worker(shutdown);
                tokio::try_join!(orchestrator, worker)?;
                Ok(())
            }
        }
    }

    async fn run_orchestrator(&self, shutdown: &ShutdownManager) -> Result<()> {
        let pool = create_pool(&self.config.database_url)
            .await
            .context("初始化数据库失败")?;

        let user_repo = Arc::new(SqliteUserRepository::new(pool.clone()));
        let expr_repo = Arc::new(SqliteExpressionRepository::new(pool.clone()));
        let task_repo = Arc::new(SqliteTaskRepository::new(pool.clone()));

        let scheduler = Arc::new(ExpressionScheduler::new(
            expr_repo.clone(),
            task_repo.clone(),
            OperationTimes::from(&self.config),
        ));

        // 先恢复上次中断的工作，再开始接收新请求
        let report = RecoveryService::new(expr_repo.clone(), scheduler.clone())
            .recover()
            .await
            .context("恢复未完成表达式失败")?;
        info!(
            "恢复完成: 继续 {} 个, 终结 {} 个",
            report.resumed, report.finalized
        );

        // Worker RPC
        let grpc_addr: SocketAddr = self
            .config
            .grpc_bind_address()
            .parse()
            .context("gRPC 监听地址无效")?;
        let coordinator = CoordinatorService::new(
            task_repo.clone(),
            scheduler.clone(),
            self.config.stale_task_seconds,
        );
        let mut grpc_shutdown = shutdown.subscribe();
        let grpc_server = tonic::transport::Server::builder()
            .add_service(CalculatorServer::new(coordinator))
            .serve_with_shutdown(grpc_addr, async move {
                let _ = grpc_shutdown.recv().await;
            });
        info!("Worker RPC 监听 {}", grpc_addr);

        // 客户端 HTTP API
        let state = AppState {
            user_repo,
            expr_repo,
            task_repo,
            scheduler,
            auth_config: Arc::new(AuthConfig {
                jwt_secret: self.config.jwt_secret.clone(),
                jwt_expiration_hours: self.config.jwt_expiration_hours,
            }),
        };
        let router = create_routes(state);
        let listener = TcpListener::bind(self.config.http_bind_address())
            .await
            .context("HTTP 端口绑定失败")?;
        let mut http_shutdown = shutdown.subscribe();
        let http_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = http_shutdown.recv().await;
        });
        info!("HTTP API 监听 {}", self.config.http_bind_address());

        tokio::try_join!(
            async { grpc_server.await.context("gRPC 服务器错误") },
            async { http_server.await.context("HTTP 服务器错误") },
        )?;

        info!("协调器已停止");
        Ok(())
    }

    async fn run_worker(&self, shutdown: &ShutdownManager) -> Result<()> {
        let service = WorkerService::new(WorkerConfig::from(&self.config));
        service
            .run(shutdown.subscribe())
            .await
            .context("Worker 运行失败")?;
        Ok(())
    }
}
