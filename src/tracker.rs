//! Timer session tracker.
//!
//! `Idle -> Running -> Idle`. Stopping hands the frozen entry to the writer
//! channel without waiting for the write.

use crate::clock::Clock;
use crate::entry::{TimerEntry, TimerKind};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Produces [`TimerEntry`] records from start/stop events.
pub struct Tracker {
    clock: Arc<dyn Clock>,
    current: Mutex<Option<TimerEntry>>,
    sink: Mutex<Option<mpsc::Sender<TimerEntry>>>,
}

impl Tracker {
    pub fn new(clock: Arc<dyn Clock>, sink: mpsc::Sender<TimerEntry>) -> Self {
        Self {
            clock,
            current: Mutex::new(None),
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Begin a session, flushing any running one first.
    pub fn start(
        &self,
        kind: TimerKind,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> TimerEntry {
        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            self.finish(previous);
        }

        let entry = TimerEntry::begin(kind, name, description, self.clock.now());
        info!(kind = %entry.kind(), name = %entry.name(), "Timer started");
        *current = Some(entry.clone());
        entry
    }

    /// Refresh the running entry's duration and end time.
    pub fn tick(&self) {
        if let Some(entry) = self.current.lock().as_mut() {
            entry.advance_to(self.clock.now());
        }
    }

    /// Freeze and submit the running entry. No-op while idle.
    pub fn stop(&self) -> Option<TimerEntry> {
        let entry = self.current.lock().take()?;
        Some(self.finish(entry))
    }

    /// Snapshot of the running entry.
    pub fn current(&self) -> Option<TimerEntry> {
        self.current.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Release the writer channel. Later stops are logged and dropped.
    pub fn close(&self) {
        self.sink.lock().take();
    }

    fn finish(&self, mut entry: TimerEntry) -> TimerEntry {
        entry.advance_to(self.clock.now());
        info!(kind = %entry.kind(), name = %entry.name(), mins = entry.duration(), "Timer stopped");
        self.submit(entry.clone());
        entry
    }

    fn submit(&self, entry: TimerEntry) {
        let sink = self.sink.lock();
        let Some(tx) = sink.as_ref() else {
            error!(entry = %entry.id(), "Tracker closed; entry dropped");
            return;
        };
        match tx.try_send(entry) {
            Ok(()) => debug!("Entry handed to writer"),
            Err(TrySendError::Full(entry)) => {
                error!(entry = %entry.id(), "Write queue full; entry dropped");
            }
            Err(TrySendError::Closed(entry)) => {
                error!(entry = %entry.id(), "Writer gone; entry dropped");
            }
        }
    }
}

/// Tick `tracker` every `every` until `token` is cancelled.
pub fn spawn_ticker(
    tracker: Arc<Tracker>,
    every: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => tracker.tick(),
            }
        }
    })
}
