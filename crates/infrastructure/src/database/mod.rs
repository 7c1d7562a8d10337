//! 数据库连接与迁移

pub mod sqlite;

use std::str::FromStr;

use calc_errors::CalcResult;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

/// 创建 SQLite 连接池并执行迁移
///
/// 启用外键约束和 WAL 模式，数据库文件不存在时自动创建。
pub async fn create_pool(database_url: &str) -> CalcResult<SqlitePool> {
    debug!("Connecting to database: {}", database_url);

    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .connect_with(connect_options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// 幂等迁移：三张表，外键强制开启
pub async fn run_migrations(pool: &SqlitePool) -> CalcResult<()> {
    debug!("Running SQLite database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            login TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expressions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            expression TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            result REAL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            expression_id INTEGER NOT NULL,
            arg1 REAL NOT NULL,
            arg2 REAL NOT NULL,
            operation TEXT NOT NULL,
            operation_time INTEGER NOT NULL,
            started_at DATETIME,
            completed BOOLEAN NOT NULL DEFAULT FALSE,
            result REAL,
            FOREIGN KEY (expression_id) REFERENCES expressions(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    debug!("Migrations complete");
    Ok(())
}
