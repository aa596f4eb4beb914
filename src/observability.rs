//! Logging and observability helpers.

use std::fs;
use std::path::Path;

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::paths;

const LOG_FILE_PREFIX: &str = "driverscope.log";
const DEFAULT_FILTER: &str = "driverscope=info";

/// Installs a global subscriber writing to a daily rolling file in
/// `log_dir` (or the per-user default directory). Does nothing if a
/// subscriber is already set.
pub fn init_tracing(log_dir: Option<&Path>) {
    let log_dir = log_dir.map(Path::to_path_buf).unwrap_or_else(paths::log_dir);
    let _ = fs::create_dir_all(&log_dir);

    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Installs a stderr subscriber, handy for tests and command-line tools
pub fn init_stderr_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
