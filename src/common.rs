use anyhow::{Context, Result};
use calc_config::AppConfig;
use clap::{Arg, ArgMatches, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::{AppMode, Application};
use crate::shutdown::ShutdownManager;

/// CLI构建器，用于创建统一的命令行接口
pub struct CliBuilder {
    command: Command,
}

impl CliBuilder {
    pub fn new(name: &'static str, about: &'static str) -> Self {
        let command = Command::new(name)
            .version(env!("CARGO_PKG_VERSION"))
            .about(about);

        Self { command }
    }

    /// 通用参数：日志级别与日志格式
    pub fn with_common_args(mut self) -> Self {
        self.command = self
            .command
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("日志级别")
                    .value_parser(["trace", "debug", "info", "warn", "error"])
                    .default_value("info"),
            )
            .arg(
                Arg::new("log-format")
                    .long("log-format")
                    .value_name("FORMAT")
                    .help("日志格式")
                    .value_parser(["json", "pretty"])
                    .default_value("pretty"),
            );
        self
    }

    pub fn with_long_about(mut self, long_about: &'static str) -> Self {
        self.command = self.command.long_about(long_about);
        self
    }

    pub fn build_and_parse(self) -> ArgMatches {
        self.command.get_matches()
    }
}

/// 初始化日志系统
pub fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志失败")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer())
                .try_init()
                .context("初始化日志失败")?;
        }
    }

    Ok(())
}

/// 统一的CLI运行函数：解析参数、初始化日志、加载配置并启动应用
pub async fn run_cli(
    app_name: &'static str,
    app_description: &'static str,
    long_description: Option<&'static str>,
    app_mode: AppMode,
) -> Result<()> {
    let mut cli_builder = CliBuilder::new(app_name, app_description).with_common_args();
    if let Some(long_about) = long_description {
        cli_builder = cli_builder.with_long_about(long_about);
    }
    let matches = cli_builder.build_and_parse();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    let log_format = matches
        .get_one::<String>("log-format")
        .map(String::as_str)
        .unwrap_or("pretty");
    init_logging(log_level, log_format)?;

    let config = AppConfig::load().context("加载配置失败")?;

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_listener();

    Application::new(config, app_mode).run(&shutdown).await
}
