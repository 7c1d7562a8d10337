//! 应用配置
//!
//! 默认值内置，环境变量以同名大写形式覆盖（`HTTP_PORT`、`GRPC_PORT`、
//! `TIME_ADDITION_MS` 等）。加载后统一经过 `validate` 校验。

use anyhow::{Context, Result};
use calc_domain::Operation;
use config::{Config as ConfigBuilder, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 客户端 HTTP API 端口
    pub http_port: u16,
    /// Worker RPC 端口
    pub grpc_port: u16,
    /// 各运算符的模拟执行耗时（毫秒）
    pub time_addition_ms: i32,
    pub time_subtraction_ms: i32,
    pub time_multiplications_ms: i32,
    pub time_divisions_ms: i32,
    /// 单个 Worker 进程内并行循环数
    pub computing_power: u32,
    /// Worker 连接的协调器地址
    pub orchestrator_url: String,
    /// SQLite 连接串
    pub database_url: String,
    /// JWT 签名密钥
    pub jwt_secret: String,
    /// JWT 有效期（小时）
    pub jwt_expiration_hours: i64,
    /// 已认领任务超过该秒数未完成即可被重新认领
    pub stale_task_seconds: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            grpc_port: 50051,
            time_addition_ms: 100,
            time_subtraction_ms: 100,
            time_multiplications_ms: 100,
            time_divisions_ms: 100,
            computing_power: 1,
            orchestrator_url: "localhost:50051".to_string(),
            database_url: "sqlite:calc_service.db".to_string(),
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_hours: 24,
            stale_task_seconds: 300,
        }
    }
}

impl AppConfig {
    /// 加载配置：内置默认值 + 环境变量覆盖
    pub fn load() -> Result<Self> {
        let defaults = AppConfig::default();

        let builder = ConfigBuilder::builder()
            .set_default("http_port", defaults.http_port as i64)?
            .set_default("grpc_port", defaults.grpc_port as i64)?
            .set_default("time_addition_ms", defaults.time_addition_ms as i64)?
            .set_default("time_subtraction_ms", defaults.time_subtraction_ms as i64)?
            .set_default(
                "time_multiplications_ms",
                defaults.time_multiplications_ms as i64,
            )?
            .set_default("time_divisions_ms", defaults.time_divisions_ms as i64)?
            .set_default("computing_power", defaults.computing_power as i64)?
            .set_default("orchestrator_url", defaults.orchestrator_url.as_str())?
            .set_default("database_url", defaults.database_url.as_str())?
            .set_default("jwt_secret", defaults.jwt_secret.as_str())?
            .set_default("jwt_expiration_hours", defaults.jwt_expiration_hours)?
            .set_default("stale_task_seconds", defaults.stale_task_seconds)?
            .add_source(Environment::default().try_parsing(true));

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.http_port == 0 {
            anyhow::bail!("http_port 不能为 0");
        }
        if self.grpc_port == 0 {
            anyhow::bail!("grpc_port 不能为 0");
        }
        if self.computing_power < 1 {
            anyhow::bail!("computing_power 至少为 1");
        }
        if self.database_url.is_empty() {
            anyhow::bail!("database_url 不能为空");
        }
        if self.orchestrator_url.is_empty() {
            anyhow::bail!("orchestrator_url 不能为空");
        }
        if self.stale_task_seconds <= 0 {
            anyhow::bail!("stale_task_seconds 必须为正数");
        }
        for (name, ms) in [
            ("time_addition_ms", self.time_addition_ms),
            ("time_subtraction_ms", self.time_subtraction_ms),
            ("time_multiplications_ms", self.time_multiplications_ms),
            ("time_divisions_ms", self.time_divisions_ms),
        ] {
            if ms < 0 {
                anyhow::bail!("{} 不能为负数", name);
            }
        }
        Ok(())
    }

    /// 按运算符解析模拟耗时
    pub fn operation_time_for(&self, operation: Operation) -> i32 {
        match operation {
            Operation::Add => self.time_addition_ms,
            Operation::Sub => self.time_subtraction_ms,
            Operation::Mul => self.time_multiplications_ms,
            Operation::Div => self.time_divisions_ms,
        }
    }

    pub fn http_bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.http_port)
    }

    pub fn grpc_bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.grpc_port)
    }
}
