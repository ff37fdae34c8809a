//! habit-timer - personal activity timer with durable session logging.
//!
//! Completed task/break/recreation/hobby sessions are written as rows of
//! `habit_tracking` in PostgreSQL. The host application drives everything
//! through [`HabitTimer`].

pub mod clock;
pub mod config;
pub mod connection;
pub mod db;
pub mod entry;
pub mod error;
pub mod service;
pub mod telemetry;
pub mod tracker;
pub mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConnectionConfig, Settings, SettingsStore};
pub use connection::{ConnectionManager, ConnectionState};
pub use entry::{TimerEntry, TimerKind};
pub use error::{ConnectionError, FailureKind, InsertFailure, ServiceError, WriteError};
pub use service::HabitTimer;
pub use tracker::Tracker;
pub use writer::{EntryWriter, WriteStats};
