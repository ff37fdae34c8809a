//! Tests against a real PostgreSQL server.
//!
//! Ignored by default. Run with `--ignored` after exporting
//! `HABIT_TIMER_PG_HOST`, `HABIT_TIMER_PG_PORT`, `HABIT_TIMER_PG_USER`,
//! `HABIT_TIMER_PG_PASS` and `HABIT_TIMER_PG_DB`.

mod common;

use chrono::{Duration, Utc};
use habit_timer::config::ConnectionConfig;
use habit_timer::db::PostgresBackend;
use habit_timer::{
    ConnectionManager, ConnectionState, FailureKind, TimerEntry, TimerKind, WriteError, writer,
};
use std::sync::Arc;

fn live_config() -> ConnectionConfig {
    let var = |key: &str| std::env::var(key).unwrap_or_else(|_| panic!("{key} not set"));
    ConnectionConfig {
        host: var("HABIT_TIMER_PG_HOST"),
        port: var("HABIT_TIMER_PG_PORT").parse().expect("port"),
        user: var("HABIT_TIMER_PG_USER"),
        password: var("HABIT_TIMER_PG_PASS"),
        database: var("HABIT_TIMER_PG_DB"),
    }
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server"]
async fn test_postgres_insert_and_duplicate() {
    let backend = Arc::new(PostgresBackend::new(std::time::Duration::from_secs(5)));
    let manager = ConnectionManager::new(backend, common::fast_tuning());

    manager.connect(&live_config()).await.expect("connect");
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(manager.test_connection().await);

    let name = format!("live-{}", uuid::Uuid::new_v4());
    let mut entry = TimerEntry::begin(TimerKind::Task, &name, "integration", Utc::now());
    entry.advance_to(entry.start_time() + Duration::seconds(61));

    writer::insert(&manager, &entry).await.expect("first insert");
    match writer::insert(&manager, &entry).await {
        Err(WriteError::InsertFailed(f)) => assert_eq!(f.kind, FailureKind::Duplicate),
        other => panic!("expected duplicate failure, got {other:?}"),
    }

    manager.disconnect().await;
    assert_eq!(manager.active_drive_loops(), 0);
}

#[tokio::test]
#[ignore = "requires a closed local port"]
async fn test_postgres_unreachable_fails_establish() {
    let backend = Arc::new(PostgresBackend::new(std::time::Duration::from_secs(1)));
    let manager = ConnectionManager::new(backend, common::fast_tuning());
    let config = ConnectionConfig {
        host: "127.0.0.1".into(),
        port: 1,
        user: "nobody".into(),
        password: "x".into(),
        database: "none".into(),
    };

    assert!(manager.connect(&config).await.is_err());
    assert_eq!(manager.state(), ConnectionState::Failed);
}
