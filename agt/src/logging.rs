//! Diagnostic tracing for `agt`.
//!
//! - **Tracing (this module)**: developer diagnostics on stderr, filtered by
//!   `AGT_LOG` (or `RUST_LOG`). Not persisted.
//! - **Audit log (`io/audit_log`)**: one JSON record per external command in
//!   `~/.agt/agt.log`. Always written, unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "AGT_LOG";

/// Initialize the stderr subscriber. `debug` overrides the environment.
///
/// ```bash
/// AGT_LOG=agt=debug agt pr
/// ```
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
