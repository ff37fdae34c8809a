//! Unified error handling for habit-timer.
//!
//! Connection lifecycle and write path failures are separate hierarchies so
//! callers can tell a surfaced connect failure from a logged write failure.

use sqlx::error::DatabaseError;
use sqlx::sqlite::SqliteError;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Connection Errors (connect, probe, schema)
// ============================================================================

/// Errors raised while establishing or preparing a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The transport could not be confirmed live.
    #[error("could not establish connection: {0}")]
    EstablishFailed(String),

    #[error("no active database session")]
    NoSession,

    #[error("schema initialization failed: {0}")]
    SchemaFailed(String),

    /// A required connection setting is missing; no attempt was made.
    #[error("connection setting missing: {0}")]
    IncompleteConfig(&'static str),
}

impl ConnectionError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EstablishFailed(_) => "establish_failed",
            Self::NoSession => "no_session",
            Self::SchemaFailed(_) => "schema_failed",
            Self::IncompleteConfig(_) => "incomplete_config",
        }
    }
}

// ============================================================================
// Write Errors (insert path)
// ============================================================================

/// Classification of a failed insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Primary-key collision on (task_type, task_name, begin_time).
    Duplicate,
    /// The database refused the row for another reason.
    Rejected,
    /// The round trip itself failed (IO, pool timeout, closed connection).
    Transport,
}

impl FailureKind {
    /// Whether the same row could succeed on a later attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transport)
    }
}

/// Driver-level detail for [`WriteError::InsertFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl InsertFailure {
    /// Classify a sqlx error.
    pub fn from_sqlx(err: &sqlx::Error) -> Self {
        let kind = match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => FailureKind::Duplicate,
            sqlx::Error::Database(db) if is_transient_server_error(db.as_ref()) => {
                FailureKind::Transport
            }
            sqlx::Error::Database(_) => FailureKind::Rejected,
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => FailureKind::Transport,
            _ => FailureKind::Rejected,
        };
        Self {
            kind,
            detail: err.to_string(),
        }
    }
}

/// Server-reported errors that concern the connection, not the row.
fn is_transient_server_error(db: &dyn DatabaseError) -> bool {
    let Some(code) = db.code() else {
        return false;
    };
    if db.try_downcast_ref::<SqliteError>().is_some() {
        sqlite_code_is_transient(&code)
    } else {
        sqlstate_is_transient(&code)
    }
}

/// SQLSTATE class 08 (connection exception) and 57P01..57P03 (operator intervention).
fn sqlstate_is_transient(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03")
}

/// SQLITE_BUSY and SQLITE_LOCKED, including their extended codes.
fn sqlite_code_is_transient(code: &str) -> bool {
    code.parse::<i32>()
        .is_ok_and(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl fmt::Display for InsertFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// Errors from submitting a completed entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    #[error("insert attempted without a connected session")]
    NoSession,

    #[error("insert failed: {0}")]
    InsertFailed(InsertFailure),
}

impl WriteError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::InsertFailed(f) => match f.kind {
                FailureKind::Duplicate => "duplicate",
                FailureKind::Rejected => "rejected",
                FailureKind::Transport => "transport",
            },
        }
    }

    /// Whether the entry should be kept for a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoSession => true,
            Self::InsertFailed(f) => f.kind.is_retryable(),
        }
    }
}

// ============================================================================
// Service Errors (facade)
// ============================================================================

/// Errors surfaced by [`crate::HabitTimer`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Outbox(#[from] crate::db::OutboxError),
}
