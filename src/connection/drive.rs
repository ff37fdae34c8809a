//! Session drive loop.
//!
//! One task per session keeps the transport exercised with periodic pings
//! until its token is cancelled. It only logs; state changes and reconnects
//! belong to the manager's caller.

use crate::db::Session;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle to a running drive loop. Dropping it cancels the loop.
pub(crate) struct DriveLoop {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Decrements the live-loop counter when the task finishes or is dropped.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DriveLoop {
    /// Spawn the loop for `session`, pinging every `keepalive`.
    pub(crate) fn spawn(
        session: Arc<dyn Session>,
        keepalive: Duration,
        live: Arc<AtomicUsize>,
    ) -> Self {
        let token = CancellationToken::new();
        let child = token.clone();

        live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(live);

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let mut interval = tokio::time::interval(keepalive);
            // First tick completes immediately; the manager probes on its own.
            interval.tick().await;
            let mut healthy = true;

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = interval.tick() => {
                        let outcome = tokio::select! {
                            _ = child.cancelled() => break,
                            outcome = session.ping() => outcome,
                        };
                        match outcome {
                            Ok(()) => {
                                if !healthy {
                                    debug!("Keep-alive recovered");
                                }
                                healthy = true;
                            }
                            Err(e) => {
                                warn!(error = %e, "Keep-alive ping failed");
                                healthy = false;
                            }
                        }
                    }
                }
            }
            debug!("Drive loop stopped");
        });

        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Cancel the loop and wait for it to finish.
    pub(crate) async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            warn!(error = %e, "Drive loop ended abnormally");
        }
    }
}

impl Drop for DriveLoop {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
