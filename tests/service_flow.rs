//! End-to-end tests through the `HabitTimer` facade.

mod common;

use async_trait::async_trait;
use chrono::Duration;
use common::{eventually, rows, t0};
use habit_timer::config::{ConnectionConfig, OutboxConfig};
use habit_timer::db::{Backend, HabitRow, Session, SqliteBackend};
use habit_timer::{
    ConnectionError, ConnectionState, HabitTimer, ManualClock, ServiceError, SettingsStore,
    TimerKind,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    db: PathBuf,
    clock: Arc<ManualClock>,
    timer: HabitTimer,
}

async fn fixture(with_outbox: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("habits.sqlite");
    let outbox = dir.path().join("outbox.sqlite");

    let settings = SettingsStore::open(dir.path().join("settings.toml")).unwrap();
    settings
        .update(|s| {
            s.timer.tick_ms = 0;
            s.connection = common::fast_tuning();
            s.outbox = with_outbox.then(|| OutboxConfig {
                path: outbox.to_string_lossy().to_string(),
            });
        })
        .unwrap();

    let clock = Arc::new(ManualClock::new(t0()));
    let timer = HabitTimer::with_backend(
        settings,
        Arc::new(SqliteBackend::new(&db)),
        clock.clone(),
    )
    .await
    .unwrap();

    Fixture {
        _dir: dir,
        db,
        clock,
        timer,
    }
}

#[tokio::test]
async fn test_connect_without_settings_is_rejected() {
    let f = fixture(false).await;

    let err = f.timer.connect().await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Connection(ConnectionError::IncompleteConfig("postgresHost"))
    ));
    assert_eq!(f.timer.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_full_session_round_trip() {
    let f = fixture(false).await;
    f.timer
        .set_config("localhost", 5432, "me", "pw", "habits")
        .unwrap();
    f.timer.connect().await.unwrap();
    assert_eq!(f.timer.state(), ConnectionState::Connected);
    assert!(f.timer.test_connection().await);

    f.timer.start_timer(TimerKind::Task, "Write report", "Q3");
    f.clock.advance(Duration::seconds(125));
    let running = f.timer.current().unwrap();
    assert_eq!(running.name(), "Write report");

    let stopped = f.timer.stop_timer().unwrap();
    assert_eq!(stopped.duration(), 2);

    let stats = f.timer.shutdown().await;
    assert_eq!(stats.written, 1);

    let stored = rows(&f.db).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].3, 2);
    assert_eq!(stored[0].2, "Q3");
}

#[tokio::test]
async fn test_disconnected_stop_is_delivered_after_connect() {
    let f = fixture(true).await;
    f.timer
        .set_config("localhost", 5432, "me", "pw", "habits")
        .unwrap();

    f.timer.start_timer(TimerKind::Break, "Coffee", "");
    f.clock.advance(Duration::minutes(10));
    f.timer.stop_timer().unwrap();

    let outbox = f.timer.outbox().unwrap();
    assert!(eventually(|| async move { outbox.len().await.unwrap() == 1 }).await);

    f.timer.connect().await.unwrap();
    assert!(outbox.is_empty().await.unwrap());

    f.timer.connect().await.unwrap();
    let stored = rows(&f.db).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].1, "Coffee");
    assert_eq!(stored[0].3, 10);

    let stats = f.timer.shutdown().await;
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.written, 0);
}

#[tokio::test]
async fn test_disconnected_stop_without_outbox_is_dropped() {
    let f = fixture(false).await;

    f.timer.start_timer(TimerKind::Hobby, "Piano", "");
    f.timer.stop_timer().unwrap();

    let stats = f.timer.shutdown().await;
    assert_eq!(stats.dropped, 1);
}

#[tokio::test]
async fn test_shutdown_flushes_running_session() {
    let f = fixture(false).await;
    f.timer
        .set_config("localhost", 5432, "me", "pw", "habits")
        .unwrap();
    f.timer.connect().await.unwrap();

    f.timer.start_timer(TimerKind::Recreation, "Walk", "");
    f.clock.advance(Duration::minutes(3));

    let stats = f.timer.shutdown().await;
    assert_eq!(stats.written, 1);
    assert_eq!(rows(&f.db).await[0].3, 3);
}

#[tokio::test]
async fn test_state_watch_follows_lifecycle() {
    let f = fixture(false).await;
    let states = f.timer.subscribe();
    f.timer
        .set_config("localhost", 5432, "me", "pw", "habits")
        .unwrap();

    f.timer.connect().await.unwrap();
    assert_eq!(*states.borrow(), ConnectionState::Connected);

    f.timer.disconnect().await;
    assert_eq!(*states.borrow(), ConnectionState::Disconnected);
    assert!(!f.timer.test_connection().await);
}

/// Session activity observed from outside the crate.
#[derive(Default)]
struct Pings {
    count: AtomicUsize,
    released: AtomicBool,
}

struct CountingSession(Arc<Pings>);

impl Drop for CountingSession {
    fn drop(&mut self) {
        self.0.released.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Session for CountingSession {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        self.0.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, _sql: &str) -> Result<(), sqlx::Error> {
        Ok(())
    }

    async fn insert_habit(&self, _row: &HabitRow) -> Result<(), sqlx::Error> {
        Ok(())
    }

    async fn close(&self) {}
}

struct CountingBackend(Arc<Pings>);

#[async_trait]
impl Backend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn open(&self, _config: &ConnectionConfig) -> Result<Arc<dyn Session>, sqlx::Error> {
        Ok(Arc::new(CountingSession(self.0.clone())))
    }
}

#[tokio::test]
async fn test_dropping_timer_stops_background_work() {
    let dir = tempfile::tempdir().unwrap();
    let settings = SettingsStore::open(dir.path().join("settings.toml")).unwrap();
    settings
        .update(|s| s.connection = common::fast_tuning())
        .unwrap();
    settings
        .set_connection("localhost", 5432, "me", "pw", "habits")
        .unwrap();
    assert!(settings.settings().timer.tick_ms > 0);

    let pings = Arc::new(Pings::default());
    let timer = HabitTimer::with_backend(
        settings,
        Arc::new(CountingBackend(pings.clone())),
        Arc::new(ManualClock::new(t0())),
    )
    .await
    .unwrap();
    timer.connect().await.unwrap();
    timer.start_timer(TimerKind::Task, "Abandoned", "");
    assert!(pings.count.load(Ordering::SeqCst) >= 1);

    drop(timer);
    let observed = &pings;
    assert!(eventually(|| async move { observed.released.load(Ordering::SeqCst) }).await);

    let after_release = pings.count.load(Ordering::SeqCst);
    tokio::time::sleep(std::time::Duration::from_millis(1_500)).await;
    assert_eq!(pings.count.load(Ordering::SeqCst), after_release);
}
