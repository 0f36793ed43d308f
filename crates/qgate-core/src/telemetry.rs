//! Tracing setup for QGate binaries.
//!
//! Logs go to stderr so stdout stays free for command output.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter override, checked before `RUST_LOG`.
pub const LOG_ENV: &str = "QGATE_LOG";

/// Default directives: qgate crates at `level`, dependencies at `warn`.
fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,qgate_core={level},qgate_cli={level}")
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber, as newline-delimited JSON when `json` is
/// set. Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let plain = (!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));
    let structured = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(plain)
        .with(structured)
        .try_init()
        .ok();
}
