//! Write path: completed entries into `habit_tracking`.
//!
//! [`insert`] is the single-row operation. [`EntryWriter`] is the dedicated
//! task that consumes the tracker's channel, so a synchronous `stop()` never
//! waits on the database.

use crate::connection::ConnectionManager;
use crate::db::{HabitRow, Outbox};
use crate::entry::TimerEntry;
use crate::error::{FailureKind, InsertFailure, WriteError};
use crate::telemetry::spans;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

/// Insert one entry through the manager's connected session. Never retries.
pub async fn insert(manager: &ConnectionManager, entry: &TimerEntry) -> Result<(), WriteError> {
    let session = manager.connected_session().ok_or(WriteError::NoSession)?;
    let row = HabitRow::from(entry);

    session
        .insert_habit(&row)
        .await
        .map_err(|e| WriteError::InsertFailed(InsertFailure::from_sqlx(&e)))?;

    debug!(task_type = row.task_type, mins = row.mins, "Row inserted");
    Ok(())
}

/// Outcome counters reported when the writer task exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub written: usize,
    pub duplicates: usize,
    pub rejected: usize,
    /// Kept in the outbox for a later connect.
    pub queued: usize,
    /// Lost: retryable failure with no usable outbox.
    pub dropped: usize,
}

enum Outcome {
    Written,
    Duplicate,
    Rejected,
    Queued,
    Dropped,
}

impl WriteStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Written => self.written += 1,
            Outcome::Duplicate => self.duplicates += 1,
            Outcome::Rejected => self.rejected += 1,
            Outcome::Queued => self.queued += 1,
            Outcome::Dropped => self.dropped += 1,
        }
    }
}

/// Dedicated writer task.
pub struct EntryWriter {
    handle: JoinHandle<WriteStats>,
}

impl EntryWriter {
    /// Spawn the writer. Entries sent on the returned channel are written in
    /// order; the task exits once every sender is dropped.
    pub fn spawn(
        manager: Arc<ConnectionManager>,
        outbox: Option<Arc<Outbox>>,
        capacity: usize,
    ) -> (mpsc::Sender<TimerEntry>, Self) {
        let (tx, mut rx) = mpsc::channel::<TimerEntry>(capacity.max(1));

        let handle = tokio::spawn(async move {
            let mut stats = WriteStats::default();
            while let Some(entry) = rx.recv().await {
                let span = spans::write(entry.id(), entry.kind().tag());
                let outcome = write_one(&manager, outbox.as_deref(), &entry)
                    .instrument(span)
                    .await;
                stats.record(outcome);
            }
            debug!(?stats, "Writer task finished");
            stats
        });

        (tx, Self { handle })
    }

    /// Wait for the task to drain its channel and exit.
    pub async fn join(self) -> WriteStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Writer task failed");
                WriteStats::default()
            }
        }
    }
}

async fn write_one(
    manager: &ConnectionManager,
    outbox: Option<&Outbox>,
    entry: &TimerEntry,
) -> Outcome {
    let err = match insert(manager, entry).await {
        Ok(()) => {
            info!(name = %entry.name(), mins = entry.duration(), "Entry written");
            return Outcome::Written;
        }
        Err(err) => err,
    };

    if err.is_retryable() {
        let Some(outbox) = outbox else {
            warn!(error = %err, code = err.error_code(), "Entry dropped; no outbox configured");
            return Outcome::Dropped;
        };
        return match outbox.push(entry).await {
            Ok(()) => {
                warn!(error = %err, code = err.error_code(), "Entry queued in outbox");
                Outcome::Queued
            }
            Err(e) => {
                error!(error = %e, write_error = %err, "Entry dropped; outbox unavailable");
                Outcome::Dropped
            }
        };
    }

    match err {
        WriteError::InsertFailed(InsertFailure {
            kind: FailureKind::Duplicate,
            ..
        }) => {
            warn!(error = %err, "Entry already recorded; discarded");
            Outcome::Duplicate
        }
        _ => {
            error!(error = %err, code = err.error_code(), "Entry rejected by database");
            Outcome::Rejected
        }
    }
}
