//! Structured logging setup.
//!
//! Mirrors the verbosity-tiered, JSON-or-console-rendered structured logger
//! used by the system this crate's semantics were distilled from: level 0 is
//! warnings only, level 1 adds info, level 2+ adds debug output annotated
//! with call-site module/function.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Configures the global `tracing` subscriber for the given verbosity.
///
/// `verbosity == 0` → warnings only, `1` → info, `>=2` → debug with
/// call-site annotations. `json` selects a machine-readable renderer instead
/// of the human-readable console one.
pub fn configure_logging(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        // A subscriber is already installed (e.g. set up by an embedding
        // binary, or by a previous call in the same process/tests); that's
        // fine, logging just keeps using whatever is already configured.
    }
}
