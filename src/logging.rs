//! Logging and tracing setup.
//!
//! All logs are written to **stderr** so they never interfere with the
//! handshake line on stdout.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: standard `tracing` filter (e.g. `debug`, `hashicups_provider=debug`)
//! - `TF_LOG`: used when `RUST_LOG` is unset; `TRACE`, `DEBUG`, `INFO`,
//!   `WARN`, `ERROR` map to the matching level and `JSON` to `trace`
//!
//! With neither set, the level is `info`.
//!
//! ```bash
//! # See the full data source state on every read
//! TF_LOG=DEBUG ./hashicups-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when no environment variable selects one.
pub const DEFAULT_LEVEL: &str = "info";

/// Map a `TF_LOG` value to a `tracing` level directive.
pub fn level_from_tf_log(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        "ERROR" => Some("error"),
        _ => None,
    }
}

fn env_filter() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = std::env::var("TF_LOG")
        .ok()
        .and_then(|value| level_from_tf_log(&value))
        .unwrap_or(DEFAULT_LEVEL);
    EnvFilter::new(level)
}

/// Initialize the global logging subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been set. Use
/// [`try_init_logging`] where that can happen.
pub fn init_logging() {
    if !try_init_logging() {
        panic!("a global tracing subscriber is already set");
    }
}

/// Try to initialize logging, returning false if already initialized.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}
