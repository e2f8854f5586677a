use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config;

/// Installs the global tracing subscriber.
///
/// Logs go to a daily-rolling, non-blocking file appender under the directory
/// of `log_file` (or `logs/` when it has none). When `LOG_TO_STDOUT=true` an
/// ANSI stdout layer is added. The filter comes from `LOG_LEVEL` if it parses
/// as an `EnvFilter` directive, otherwise from `default_level`.
///
/// The returned guard flushes the appender on drop; keep it alive for the
/// lifetime of the process.
pub fn init_logging(log_file: &str, default_level: &str) -> WorkerGuard {
    let path = Path::new(log_file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("logs"));
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "judge.log".into());

    fs::create_dir_all(dir).ok();

    let file_appender = rolling::daily(dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(true);

    let env_filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    // try_init so that a second call (tests, embedded use) does not abort
    if config::log_to_stdout() {
        registry.with(stdout_layer).try_init().ok();
    } else {
        registry.try_init().ok();
    }

    guard
}
