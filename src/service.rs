//! Service facade for the host application.
//!
//! [`HabitTimer`] is constructed explicitly and passed where needed; it wires
//! settings, connection manager, tracker, writer task and outbox together.

use crate::clock::{Clock, SystemClock};
use crate::config::SettingsStore;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::db::{Backend, Outbox, PostgresBackend};
use crate::entry::{TimerEntry, TimerKind};
use crate::error::ServiceError;
use crate::telemetry;
use crate::tracker::{Tracker, spawn_ticker};
use crate::writer::{EntryWriter, WriteStats};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{info, warn};

pub struct HabitTimer {
    settings: SettingsStore,
    manager: Arc<ConnectionManager>,
    tracker: Arc<Tracker>,
    outbox: Option<Arc<Outbox>>,
    writer: EntryWriter,
    /// Dropping the guard stops the ticker, which releases its tracker handle.
    ticker: Option<(DropGuard, JoinHandle<()>)>,
}

impl HabitTimer {
    /// Open with the PostgreSQL backend and the system clock.
    ///
    /// Installs the fmt subscriber unless the host already set one.
    pub async fn open<P: AsRef<Path>>(settings_path: P) -> Result<Self, ServiceError> {
        let settings = SettingsStore::open(settings_path)?;
        let snapshot = settings.settings();
        telemetry::init_logging(&snapshot.logging.filter);
        let timeout = snapshot.connection.connect_timeout();
        Self::with_backend(
            settings,
            Arc::new(PostgresBackend::new(timeout)),
            Arc::new(SystemClock),
        )
        .await
    }

    /// Open with an explicit backend and clock.
    pub async fn with_backend(
        settings: SettingsStore,
        backend: Arc<dyn Backend>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServiceError> {
        let snapshot = settings.settings();

        let outbox = match &snapshot.outbox {
            Some(cfg) => Some(Arc::new(Outbox::open(&cfg.path).await?)),
            None => None,
        };

        let manager = Arc::new(ConnectionManager::new(backend, snapshot.connection.clone()));
        let (tx, writer) =
            EntryWriter::spawn(manager.clone(), outbox.clone(), snapshot.timer.queue_capacity);
        let tracker = Arc::new(Tracker::new(clock, tx));

        let ticker = (snapshot.timer.tick_ms > 0).then(|| {
            let token = CancellationToken::new();
            let every = Duration::from_millis(snapshot.timer.tick_ms);
            let handle = spawn_ticker(tracker.clone(), every, token.clone());
            (token.drop_guard(), handle)
        });

        info!(
            settings = %settings.path().display(),
            outbox = outbox.is_some(),
            "Habit timer ready"
        );

        Ok(Self {
            settings,
            manager,
            tracker,
            outbox,
            writer,
            ticker,
        })
    }

    /// Persist new connection parameters. Takes effect on the next `connect`.
    pub fn set_config(
        &self,
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: &str,
    ) -> Result<(), ServiceError> {
        self.settings
            .set_connection(host, port, user, password, database)?;
        Ok(())
    }

    /// Connect with the stored settings, then deliver any queued entries.
    pub async fn connect(&self) -> Result<(), ServiceError> {
        let config = self.settings.connection_config()?;
        self.manager.connect(&config).await?;

        if let Some(outbox) = &self.outbox
            && let Err(e) = outbox.drain(&self.manager).await
        {
            warn!(error = %e, "Outbox drain failed");
        }
        Ok(())
    }

    pub async fn disconnect(&self) {
        self.manager.disconnect().await;
    }

    pub fn start_timer(
        &self,
        kind: TimerKind,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> TimerEntry {
        self.tracker.start(kind, name, description)
    }

    pub fn stop_timer(&self) -> Option<TimerEntry> {
        self.tracker.stop()
    }

    pub fn current(&self) -> Option<TimerEntry> {
        self.tracker.current()
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.manager.subscribe()
    }

    pub async fn test_connection(&self) -> bool {
        self.manager.test_connection().await
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn outbox(&self) -> Option<&Outbox> {
        self.outbox.as_deref()
    }

    /// Stop any running session, wait for pending writes, then disconnect.
    ///
    /// Dropping the facade instead stops the ticker and writer and cancels
    /// the drive loop, but a running session is not written.
    pub async fn shutdown(self) -> WriteStats {
        if let Some((guard, handle)) = self.ticker {
            drop(guard);
            if let Err(e) = handle.await
                && !e.is_cancelled()
            {
                warn!(error = %e, "Ticker ended abnormally");
            }
        }

        self.tracker.stop();
        self.tracker.close();
        let stats = self.writer.join().await;

        self.manager.disconnect().await;
        info!(?stats, "Habit timer shut down");
        stats
    }
}
