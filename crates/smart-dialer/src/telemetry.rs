// smart-dialer/crates/smart-dialer/src/telemetry.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Dialer events at info, everything else (r2d2, rusqlite) only when it warns.
pub const DEFAULT_LOG_FILTER: &str = "warn,smart_dialer=info,smart_dialer_ffi=info";

/// `DIALER_LOG` wins over `RUST_LOG`; blank values are ignored.
fn filter_directive(dialer_log: Option<String>, rust_log: Option<String>) -> String {
    [dialer_log, rust_log]
        .into_iter()
        .flatten()
        .find(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Install the global subscriber for dialer logs.
///
/// Returns false when a subscriber was already installed, by this crate or by
/// the embedding application; the existing one is left in place.
pub fn init_tracing() -> bool {
    let directive = filter_directive(
        std::env::var("DIALER_LOG").ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter {:?}: {}", directive, e);
        EnvFilter::new(DEFAULT_LOG_FILTER)
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}
