//! PostgreSQL backend.

use super::{Backend, HabitRow, Session};
use crate::config::ConnectionConfig;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const INSERT_HABIT: &str = r#"
INSERT INTO habit_tracking (task_type, task_name, description, mins, begin_time, end_time)
VALUES ($1, $2, $3, $4, $5, $6)
"#;

/// Opens single-connection pools against a PostgreSQL server with TLS disabled.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    acquire_timeout: Duration,
}

impl PostgresBackend {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self { acquire_timeout }
    }

    /// Connect options for `config`.
    pub fn connect_options(config: &ConnectionConfig) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .ssl_mode(PgSslMode::Disable)
            .application_name("habit-timer")
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn open(&self, config: &ConnectionConfig) -> Result<Arc<dyn Session>, sqlx::Error> {
        // Lazy: the transport is dialed on first use, so failures surface at the probe.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.acquire_timeout)
            .test_before_acquire(false)
            .connect_lazy_with(Self::connect_options(config));

        debug!(host = %config.host, port = config.port, database = %config.database, "Postgres pool constructed");
        Ok(Arc::new(PostgresSession { pool }))
    }
}

struct PostgresSession {
    pool: PgPool,
}

#[async_trait]
impl Session for PostgresSession {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_habit(&self, row: &HabitRow) -> Result<(), sqlx::Error> {
        let mins = int4_mins(row.mins)?;

        sqlx::query(INSERT_HABIT)
            .bind(row.task_type)
            .bind(&row.task_name)
            .bind(&row.description)
            .bind(mins)
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

/// The `mins` column is INTEGER (int4).
fn int4_mins(mins: i64) -> Result<i32, sqlx::Error> {
    i32::try_from(mins).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}
