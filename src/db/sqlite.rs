//! Embedded SQLite backend.
//!
//! Ignores the network fields of [`ConnectionConfig`]; every session opens
//! the same database file.

use super::{Backend, HabitRow, Session};
use crate::config::ConnectionConfig;
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const INSERT_HABIT: &str = r#"
INSERT INTO habit_tracking (task_type, task_name, description, mins, begin_time, end_time)
VALUES (?, ?, ?, ?, ?, ?)
"#;

/// Opens single-connection pools over a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
    acquire_timeout: Duration,
}

impl SqliteBackend {
    /// Connection acquire timeout.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            acquire_timeout: Self::ACQUIRE_TIMEOUT,
        }
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn open(&self, _config: &ConnectionConfig) -> Result<Arc<dyn Session>, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.acquire_timeout)
            .connect_lazy_with(options);

        debug!(path = %self.path.display(), "SQLite pool constructed");
        Ok(Arc::new(SqliteSession { pool }))
    }
}

struct SqliteSession {
    pool: SqlitePool,
}

#[async_trait]
impl Session for SqliteSession {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_habit(&self, row: &HabitRow) -> Result<(), sqlx::Error> {
        sqlx::query(INSERT_HABIT)
            .bind(row.task_type)
            .bind(&row.task_name)
            .bind(&row.description)
            .bind(row.mins)
            .bind(row.begin_time)
            .bind(row.end_time)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
