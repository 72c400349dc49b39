//! Logging utilities for cfmap
//!
//! Provides helpers for initializing tracing subscribers. Parser, schema
//! creator and DAOs emit `tracing` events; nothing is printed unless a
//! subscriber is installed.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "CFMAP_LOG";

/// Event targets used across the crate.
pub const LOG_TARGETS: &[&str] = &["parser", "schema", "dao", "join", "slice", "metadata"];

/// Filter directives enabling every crate event at `level`.
pub fn directives(level: &str) -> String {
    std::iter::once("cfmap_core")
        .chain(LOG_TARGETS.iter().copied())
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize logging with default settings
///
/// # Environment Variables
/// - `CFMAP_LOG` - Log level filter (default: "info")
///
/// # Example
/// ```rust
/// cfmap_core::logging::init();
/// ```
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with a specific level
///
/// # Arguments
/// * `level` - Log level (trace, debug, info, warn, error)
///
/// # Example
/// ```rust
/// cfmap_core::logging::init_with_level("debug");
/// ```
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init();
}

/// Initialize logging for tests
///
/// Output goes through the test writer so it is captured per test.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(directives("trace")))
        .with_test_writer()
        .try_init();
}

// Stub implementations when logging feature is disabled
#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_cover_every_target() {
        let filter = directives("trace");
        assert!(filter.starts_with("cfmap_core=trace,"));
        for target in LOG_TARGETS {
            assert!(filter.contains(&format!("{target}=trace")), "missing {target}");
        }
    }
}
