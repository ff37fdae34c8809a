//! Logging setup and standard spans.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` when a
/// subscriber was already installed by the host.
pub fn init_logging(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};
    use uuid::Uuid;

    /// Span for one connect attempt.
    pub fn connect(backend: &str, host: &str, database: &str) -> Span {
        info_span!("connect", backend = %backend, host = %host, database = %database)
    }

    /// Span for writing one entry.
    pub fn write(entry_id: Uuid, kind: &str) -> Span {
        info_span!("write", entry = %entry_id, kind = %kind)
    }

    /// Span for an outbox drain pass.
    pub fn drain(pending: usize) -> Span {
        info_span!("drain", pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        init_logging("warn");
        assert!(!init_logging("debug"));
    }
}
