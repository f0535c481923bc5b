//! # Logging Setup
//!
//! One-call tracing initialisation for the relay binaries: console output
//! always, plus a daily-rolling file appender when a log directory is
//! configured. `RUST_LOG` overrides the configured filter.

use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::configs::settings::LoggingSettings;

/// Initialises the global tracing subscriber.
///
/// Returns the appender worker guard when file logging is enabled; the
/// caller must keep it alive for the lifetime of the process or buffered
/// log lines are lost on shutdown.
pub fn init(app_name: &str, settings: &LoggingSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let default_filter = settings.filter.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_owned()));

    match &settings.directory {
        Some(directory) => {
            fs::create_dir_all(directory)?;
            let appender =
                tracing_appender::rolling::daily(directory, format!("{app_name}.log"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}
