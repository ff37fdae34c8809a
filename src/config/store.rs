//! File-backed settings store.

use super::{ConfigError, ConnectionConfig, Settings, validation};
use crate::error::ConnectionError;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::info;

/// Settings persisted to a TOML file on every mutation.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: RwLock<Settings>,
}

impl SettingsStore {
    /// Open the store at `path`, loading existing settings if present.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let settings = Settings::load(&path)?;
        Ok(Self {
            path,
            settings: RwLock::new(settings),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Replace the connection parameters and persist.
    pub fn set_connection(
        &self,
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: &str,
    ) -> Result<(), ConfigError> {
        self.update(|s| {
            s.host = Some(host.to_string());
            s.port = Some(port);
            s.user = Some(user.to_string());
            s.password = Some(password.to_string());
            s.database = Some(database.to_string());
        })?;
        info!(path = %self.path.display(), host = %host, port, database = %database, "Connection settings saved");
        Ok(())
    }

    /// Apply `f` to the settings and persist the result.
    ///
    /// The in-memory copy is only replaced once the file write succeeds.
    pub fn update<F>(&self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.settings.write();
        let mut next = guard.clone();
        f(&mut next);
        next.save(&self.path)?;
        *guard = next;
        Ok(())
    }

    /// Complete connection parameters, read at connect time.
    pub fn connection_config(&self) -> Result<ConnectionConfig, ConnectionError> {
        validation::connection_config(&self.settings.read())
    }
}
