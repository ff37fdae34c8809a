//! Integration test common infrastructure.
//!
//! Provides a SQLite-backed connection manager in a temp dir and helpers
//! for reading `habit_tracking` back.

#![allow(dead_code)]

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use habit_timer::config::{ConnectionConfig, ConnectionTuning};
use habit_timer::db::SqliteBackend;
use habit_timer::ConnectionManager;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub type HabitRecord = (String, String, String, i64, NaiveDateTime, NaiveDateTime);

pub fn fast_tuning() -> ConnectionTuning {
    ConnectionTuning {
        settle_ms: 5,
        keepalive_secs: 1,
        connect_timeout_secs: 1,
    }
}

/// Connection parameters; the SQLite backend ignores them.
pub fn config() -> ConnectionConfig {
    ConnectionConfig {
        host: "localhost".into(),
        port: 5432,
        user: "tracker".into(),
        password: "pw".into(),
        database: "habits".into(),
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 10, 14, 0, 0).unwrap()
}

/// A manager over a fresh SQLite file.
pub fn sqlite_manager() -> (TempDir, PathBuf, Arc<ConnectionManager>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("habits.sqlite");
    let backend = Arc::new(SqliteBackend::new(&db_path));
    let manager = Arc::new(ConnectionManager::new(backend, fast_tuning()));
    (dir, db_path, manager)
}

/// Independent read-only view of the store.
pub async fn reader(db_path: &Path) -> SqlitePool {
    let options = SqliteConnectOptions::new().filename(db_path).read_only(true);
    SqlitePool::connect_with(options).await.expect("open reader")
}

pub async fn rows(db_path: &Path) -> Vec<HabitRecord> {
    let pool = reader(db_path).await;
    let rows = sqlx::query_as::<_, HabitRecord>(
        "SELECT task_type, task_name, description, mins, begin_time, end_time
         FROM habit_tracking ORDER BY begin_time, task_name",
    )
    .fetch_all(&pool)
    .await
    .expect("select rows");
    pool.close().await;
    rows
}

pub async fn row_by_key(
    db_path: &Path,
    task_type: &str,
    task_name: &str,
    begin_time: NaiveDateTime,
) -> Option<HabitRecord> {
    let pool = reader(db_path).await;
    let row = sqlx::query_as::<_, HabitRecord>(
        "SELECT task_type, task_name, description, mins, begin_time, end_time
         FROM habit_tracking
         WHERE task_type = ? AND task_name = ? AND begin_time = ?",
    )
    .bind(task_type)
    .bind(task_name)
    .bind(begin_time)
    .fetch_optional(&pool)
    .await
    .expect("select by key");
    pool.close().await;
    row
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
