//! Throwaway database helper
//!
//! Creates a file-backed SQLite database in a temp directory with the full
//! schema applied. The directory lives as long as the returned handle.

use calc_infrastructure::create_pool;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub struct TestDatabase {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn test_database() -> TestDatabase {
    let dir = TempDir::new().expect("failed to create temp dir");
    let url = format!("sqlite:{}", dir.path().join("test.db").display());
    let pool = create_pool(&url).await.expect("failed to create test pool");
    TestDatabase { pool, _dir: dir }
}
