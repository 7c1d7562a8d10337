use tokio::sync::broadcast;
use tracing::{debug, info};

/// 优雅关闭管理器
///
/// 所有长驻组件订阅同一个广播信号；收到 SIGINT/SIGTERM 或
/// 显式触发后各自停止接收新工作并退出。
pub struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self { shutdown_tx }
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// 触发关闭
    pub fn trigger(&self) {
        let subscribers = self.shutdown_tx.receiver_count();
        info!("触发系统关闭，通知 {} 个订阅者", subscribers);
        // 可能没有接收者，忽略发送错误
        let _ = self.shutdown_tx.send(());
    }

    /// 监听进程信号，收到后触发关闭
    pub fn spawn_signal_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("收到进程终止信号");
            let _ = shutdown_tx.send(());
        });
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            debug!("注册 SIGTERM 处理器失败: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
