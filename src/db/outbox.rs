//! SQLite-backed outbox for entries that could not reach the store.
//!
//! # Schema
//!
//! ```text
//! pending_entries: seq (FIFO order) -> entry fields, entry_id UNIQUE
//! ```
//!
//! Entries are drained after every successful connect. A duplicate on the
//! remote side counts as delivered.

use crate::connection::ConnectionManager;
use crate::entry::{TimerEntry, TimerKind};
use crate::error::{FailureKind, WriteError};
use crate::telemetry::spans;
use crate::writer;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use thiserror::Error;
use tracing::{Instrument, info, warn};
use uuid::Uuid;

const CREATE_PENDING: &str = r#"
CREATE TABLE IF NOT EXISTS pending_entries (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id    TEXT NOT NULL UNIQUE,
    task_type   TEXT NOT NULL,
    task_name   TEXT NOT NULL,
    description TEXT NOT NULL,
    mins        INTEGER NOT NULL,
    begin_time  TEXT NOT NULL,
    end_time    TEXT NOT NULL,
    queued_at   TEXT NOT NULL
)
"#;

/// Errors from outbox persistence.
#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("outbox database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("outbox directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    /// Already present remotely; removed from the outbox.
    pub duplicates: usize,
    /// Rejected for a non-retryable reason; removed and logged.
    pub discarded: usize,
    /// Still queued after the pass.
    pub remaining: usize,
}

type PendingRow = (
    i64,
    String,
    String,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// Local queue of undelivered entries.
#[derive(Debug, Clone)]
pub struct Outbox {
    pool: SqlitePool,
}

impl Outbox {
    /// Open or create the outbox file.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, OutboxError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_PENDING).execute(&pool).await?;
        info!(path = %path.display(), "Outbox opened");
        Ok(Self { pool })
    }

    /// Queue an entry. Queueing the same entry twice is a no-op.
    pub async fn push(&self, entry: &TimerEntry) -> Result<(), OutboxError> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO pending_entries
            (entry_id, task_type, task_name, description, mins, begin_time, end_time, queued_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id().to_string())
        .bind(entry.kind().tag())
        .bind(entry.name())
        .bind(entry.description())
        .bind(entry.duration())
        .bind(entry.start_time())
        .bind(entry.end_time())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn len(&self) -> Result<usize, OutboxError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub async fn is_empty(&self) -> Result<bool, OutboxError> {
        Ok(self.len().await? == 0)
    }

    /// Queued entries in FIFO order. Rows that no longer decode are removed.
    pub async fn pending(&self) -> Result<Vec<(i64, TimerEntry)>, OutboxError> {
        let rows = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT seq, entry_id, task_type, task_name, description, begin_time, end_time
            FROM pending_entries
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (seq, entry_id, task_type, name, description, begin, end) in rows {
            let id = Uuid::parse_str(&entry_id).ok();
            let kind = TimerKind::from_tag(&task_type);
            match (id, kind) {
                (Some(id), Some(kind)) => {
                    out.push((seq, TimerEntry::restore(id, kind, name, description, begin, end)));
                }
                _ => {
                    warn!(seq, entry_id = %entry_id, task_type = %task_type, "Removing undecodable outbox row");
                    self.remove(seq).await?;
                }
            }
        }
        Ok(out)
    }

    async fn remove(&self, seq: i64) -> Result<(), OutboxError> {
        sqlx::query("DELETE FROM pending_entries WHERE seq = ?")
            .bind(seq)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deliver queued entries through `manager`, oldest first.
    ///
    /// Stops at the first retryable failure, leaving it and everything after
    /// it queued.
    pub async fn drain(&self, manager: &ConnectionManager) -> Result<DrainReport, OutboxError> {
        let pending = self.pending().await?;
        if pending.is_empty() {
            return Ok(DrainReport::default());
        }

        let span = spans::drain(pending.len());
        async {
            let mut report = DrainReport::default();
            for (seq, entry) in pending {
                match writer::insert(manager, &entry).await {
                    Ok(()) => report.delivered += 1,
                    Err(WriteError::InsertFailed(f)) if f.kind == FailureKind::Duplicate => {
                        report.duplicates += 1;
                    }
                    Err(e) if e.is_retryable() => {
                        warn!(error = %e, "Drain interrupted; keeping remaining entries");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, entry = %entry.id(), "Discarding rejected outbox entry");
                        report.discarded += 1;
                    }
                }
                self.remove(seq).await?;
            }
            report.remaining = self.len().await?;
            info!(
                delivered = report.delivered,
                duplicates = report.duplicates,
                discarded = report.discarded,
                remaining = report.remaining,
                "Outbox drained"
            );
            Ok::<_, OutboxError>(report)
        }
        .instrument(span)
        .await
    }
}
