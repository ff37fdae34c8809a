//! Default value functions for configuration.

// =============================================================================
// Connection Defaults
// =============================================================================

pub fn default_settle_ms() -> u64 {
    100
}

pub fn default_keepalive() -> u64 {
    30
}

pub fn default_connect_timeout() -> u64 {
    5
}

// =============================================================================
// Timer Defaults
// =============================================================================

pub fn default_tick_ms() -> u64 {
    1000
}

pub fn default_queue_capacity() -> usize {
    64
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_filter() -> String {
    "info".to_string()
}
