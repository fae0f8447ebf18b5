/// Environment variable holding the `tracing` filter directives.
pub const LOG_ENV: &str = "KENNEL_IMPORT_LOG";
pub const DEFAULT_FILTER: &str = "kennel_import=info";

/// Installs the JSON subscriber. `log` records are bridged by the
/// subscriber's `tracing-log` feature during `try_init`.
///
/// Logs go to stderr so command output on stdout stays machine readable.
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(std::env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .json()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .try_init();
}
