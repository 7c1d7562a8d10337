use async_trait::async_trait;
use calc_domain::{User, UserRepository};
use calc_errors::{CalcError, CalcResult};
use sqlx::{Row, SqlitePool};

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> CalcResult<User> {
        Ok(User {
            id: row.try_get("id")?,
            login: row.try_get("login")?,
            password_hash: row.try_get("password")?,
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, login: &str, password_hash: &str) -> CalcResult<User> {
        let row = sqlx::query("INSERT INTO users (login, password) VALUES (?, ?) RETURNING id")
            .bind(login)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err)
                    if db_err.message().contains("UNIQUE constraint failed") =>
                {
                    CalcError::user_already_exists(login)
                }
                _ => CalcError::Database(e),
            })?;

        Ok(User {
            id: row.try_get("id")?,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    async fn get_by_login(&self, login: &str) -> CalcResult<Option<User>> {
        let row = sqlx::query("SELECT id, login, password FROM users WHERE login = ?")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::map_row(&r)).transpose()
    }

    async fn get_by_id(&self, id: i64) -> CalcResult<Option<User>> {
        let row = sqlx::query("SELECT id, login, password FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::map_row(&r)).transpose()
    }

    async fn delete(&self, id: i64) -> CalcResult<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
