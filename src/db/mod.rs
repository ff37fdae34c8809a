//! Database module for session persistence.
//!
//! A [`Backend`] opens a [`Session`] against a [`ConnectionConfig`]. Two
//! flavors exist:
//! - [`PostgresBackend`]: the durable store, a single unencrypted TCP connection
//! - [`SqliteBackend`]: an embedded file-backed store with the same schema
//!
//! Also provides the SQLite [`Outbox`] for entries that could not be written.

pub mod outbox;
mod postgres;
pub mod schema;
mod sqlite;

pub use outbox::{DrainReport, Outbox, OutboxError};
pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;

use crate::config::ConnectionConfig;
use crate::entry::TimerEntry;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Factory for sessions of one database flavor.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Construct a session. Transport readiness is confirmed by the caller
    /// through [`Session::ping`].
    async fn open(&self, config: &ConnectionConfig) -> Result<Arc<dyn Session>, sqlx::Error>;
}

/// A live handle to the store.
#[async_trait]
pub trait Session: Send + Sync {
    /// `SELECT 1` round trip.
    async fn ping(&self) -> Result<(), sqlx::Error>;

    /// Run a statement without parameters.
    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error>;

    /// Insert one `habit_tracking` row with bound parameters.
    async fn insert_habit(&self, row: &HabitRow) -> Result<(), sqlx::Error>;

    /// Close the underlying connection.
    async fn close(&self);
}

/// A `habit_tracking` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitRow {
    pub task_type: &'static str,
    pub task_name: String,
    pub description: String,
    pub mins: i64,
    pub begin_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl From<&TimerEntry> for HabitRow {
    fn from(entry: &TimerEntry) -> Self {
        Self {
            task_type: entry.kind().tag(),
            task_name: entry.name().to_string(),
            description: entry.description().to_string(),
            mins: entry.duration(),
            begin_time: entry.start_time().naive_utc(),
            end_time: entry.end_time().naive_utc(),
        }
    }
}
