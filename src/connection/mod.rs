//! Connection lifecycle management.
//!
//! [`ConnectionManager`] owns the single live [`Session`] and its drive loop.
//! Other components reach the session only through the manager and never
//! hold it across a reconnect.

mod drive;
mod state;

pub use state::ConnectionState;

use crate::config::{ConnectionConfig, ConnectionTuning};
use crate::db::{Backend, Session, schema};
use crate::error::ConnectionError;
use crate::telemetry::spans;
use drive::DriveLoop;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tracing::{Instrument, debug, info, warn};

struct Active {
    session: Arc<dyn Session>,
    drive: DriveLoop,
}

/// Owner of the database session.
pub struct ConnectionManager {
    backend: Arc<dyn Backend>,
    tuning: ConnectionTuning,
    active: Mutex<Option<Active>>,
    state: watch::Sender<ConnectionState>,
    /// Serializes connect/disconnect so teardown and establish never interleave.
    lifecycle: tokio::sync::Mutex<()>,
    live_loops: Arc<AtomicUsize>,
}

impl ConnectionManager {
    pub fn new(backend: Arc<dyn Backend>, tuning: ConnectionTuning) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            backend,
            tuning,
            active: Mutex::new(None),
            state,
            lifecycle: tokio::sync::Mutex::new(()),
            live_loops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace any existing session with a new one against `config`.
    ///
    /// On success the schema exists and the state is `Connected`. On failure
    /// the new session is torn down and the state is `Failed`.
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<(), ConnectionError> {
        let span = spans::connect(self.backend.name(), &config.host, &config.database);
        async {
            let _lifecycle = self.lifecycle.lock().await;

            self.teardown().await;
            self.set_state(ConnectionState::Connecting);
            let mut attempt = Attempt::new(self);
            info!(port = config.port, user = %config.user, "Connecting to database");

            let session = match self.backend.open(config).await {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "Failed to construct session");
                    attempt.settle();
                    self.set_state(ConnectionState::Failed);
                    return Err(ConnectionError::EstablishFailed(e.to_string()));
                }
            };

            let drive = DriveLoop::spawn(
                session.clone(),
                self.tuning.keepalive(),
                self.live_loops.clone(),
            );
            *self.active.lock() = Some(Active {
                session: session.clone(),
                drive,
            });

            tokio::time::sleep(self.tuning.settle()).await;

            if let Err(e) = session.ping().await {
                warn!(error = %e, "Liveness probe failed");
                attempt.settle();
                self.fail().await;
                return Err(ConnectionError::EstablishFailed(e.to_string()));
            }

            if let Err(e) = schema::ensure_schema(self).await {
                attempt.settle();
                self.fail().await;
                return Err(e);
            }

            attempt.settle();
            self.set_state(ConnectionState::Connected);
            info!("Database connected");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Tear down the session, if any, and return to `Disconnected`.
    pub async fn disconnect(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.teardown().await;
        self.set_state(ConnectionState::Disconnected);
        info!("Database disconnected");
    }

    /// Advisory liveness check. Never errors.
    pub async fn test_connection(&self) -> bool {
        let Some(session) = self.session() else {
            return false;
        };
        match session.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Connection test failed");
                false
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Number of drive loops currently alive. Never more than one.
    pub fn active_drive_loops(&self) -> usize {
        self.live_loops.load(Ordering::SeqCst)
    }

    /// The established session, regardless of state.
    pub(crate) fn session(&self) -> Option<Arc<dyn Session>> {
        self.active.lock().as_ref().map(|a| a.session.clone())
    }

    /// The session, only while `Connected`.
    pub(crate) fn connected_session(&self) -> Option<Arc<dyn Session>> {
        if self.state().is_connected() {
            self.session()
        } else {
            None
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Connection state changed");
        }
    }

    async fn fail(&self) {
        self.teardown().await;
        self.set_state(ConnectionState::Failed);
    }

    /// Cancel and await the drive loop, then close the session.
    async fn teardown(&self) {
        let previous = self.active.lock().take();
        if let Some(Active { session, drive }) = previous {
            drive.shutdown().await;
            session.close().await;
            debug!("Previous session torn down");
        }
    }
}

/// Marks an in-flight connect. If the future is dropped before the attempt
/// settles, the half-built session is discarded and the state set to `Failed`.
struct Attempt<'a> {
    manager: &'a ConnectionManager,
    settled: bool,
}

impl<'a> Attempt<'a> {
    fn new(manager: &'a ConnectionManager) -> Self {
        Self {
            manager,
            settled: false,
        }
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Dropping the drive loop handle cancels it.
        self.manager.active.lock().take();
        self.manager.set_state(ConnectionState::Failed);
        warn!("Connect abandoned before completion");
    }
}
