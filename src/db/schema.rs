//! Schema initialization for the `habit_tracking` table.

use crate::connection::ConnectionManager;
use crate::error::ConnectionError;
use tracing::{debug, warn};

/// Idempotent creation statement, valid for both backends.
pub const CREATE_HABIT_TRACKING: &str = r#"
CREATE TABLE IF NOT EXISTS habit_tracking (
    task_type   TEXT,
    task_name   TEXT,
    description TEXT,
    mins        INTEGER,
    begin_time  TIMESTAMP,
    end_time    TIMESTAMP,
    PRIMARY KEY (task_type, task_name, begin_time)
)
"#;

/// Ensure `habit_tracking` exists on the manager's established session.
pub async fn ensure_schema(manager: &ConnectionManager) -> Result<(), ConnectionError> {
    let session = manager.session().ok_or(ConnectionError::NoSession)?;

    session.execute(CREATE_HABIT_TRACKING).await.map_err(|e| {
        warn!(error = %e, "Failed to create habit_tracking table");
        ConnectionError::SchemaFailed(e.to_string())
    })?;

    debug!("habit_tracking table checked/created");
    Ok(())
}
