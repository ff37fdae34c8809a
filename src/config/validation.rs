//! Connection settings validation.
//!
//! A connect attempt is only made with a complete set of parameters.

use super::{ConnectionConfig, Settings};
use crate::error::ConnectionError;

/// Build a [`ConnectionConfig`], naming the first missing or empty key.
pub fn connection_config(settings: &Settings) -> Result<ConnectionConfig, ConnectionError> {
    fn required(value: &Option<String>, key: &'static str) -> Result<String, ConnectionError> {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(ConnectionError::IncompleteConfig(key)),
        }
    }

    let host = required(&settings.host, "postgresHost")?;
    let port = settings
        .port
        .filter(|p| *p != 0)
        .ok_or(ConnectionError::IncompleteConfig("postgresPort"))?;
    let user = required(&settings.user, "postgresUser")?;
    // Passwords are not trimmed.
    let password = match settings.password.as_deref() {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => return Err(ConnectionError::IncompleteConfig("postgresPass")),
    };
    let database = required(&settings.database, "postgresDB")?;

    Ok(ConnectionConfig {
        host,
        port,
        user,
        password,
        database,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Settings {
        toml::from_str(
            r#"
postgresHost = "db.local"
postgresPort = 5432
postgresUser = "me"
postgresPass = " s3cret "
postgresDB = "habits"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_complete_settings_pass() {
        let cfg = connection_config(&complete()).unwrap();
        assert_eq!(cfg.host, "db.local");
        assert_eq!(cfg.port, 5432);
        assert_eq!(cfg.password, " s3cret ");
        assert_eq!(cfg.database, "habits");
    }

    #[test]
    fn test_missing_host_fails() {
        let mut settings = complete();
        settings.host = Some("  ".into());
        assert_eq!(
            connection_config(&settings),
            Err(ConnectionError::IncompleteConfig("postgresHost"))
        );
    }

    #[test]
    fn test_missing_port_fails() {
        let mut settings = complete();
        settings.port = None;
        assert_eq!(
            connection_config(&settings),
            Err(ConnectionError::IncompleteConfig("postgresPort"))
        );
    }

    #[test]
    fn test_missing_password_fails() {
        let mut settings = complete();
        settings.password = None;
        assert_eq!(
            connection_config(&settings),
            Err(ConnectionError::IncompleteConfig("postgresPass"))
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = connection_config(&complete()).unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("s3cret"));
        assert!(shown.contains("<redacted>"));
    }
}
