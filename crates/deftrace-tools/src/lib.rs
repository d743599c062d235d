//! deftrace tools
//!
//! Command implementations and the logging bootstrap for the `deftrace`
//! binary.

pub mod index;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Default is `info` for deftrace crates and `warn` for others. Logs go to
/// stderr; stdout carries records.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "warn,deftrace=info,deftrace_tools=info,deftrace_core=info,deftrace_clojure=info,deftrace_cpp=info",
        )
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
