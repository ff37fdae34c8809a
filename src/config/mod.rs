//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Settings, connection parameters and tuning tables
//! - [`store`]: File-backed [`SettingsStore`]
//! - [`validation`]: Completeness checks before a connect attempt

mod defaults;
mod store;
mod types;
pub mod validation;

pub use store::SettingsStore;
pub use types::{
    ConfigError, ConnectionConfig, ConnectionTuning, LoggingConfig, OutboxConfig, Settings,
    TimerConfig,
};
