//! `tracing` subscriber setup. Silent unless `YAM_LOG` holds a filter.

use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const ENV_VAR: &str = "YAM_LOG";
pub const LOG_FILE: &str = "yam.log";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogTarget {
    /// Full-screen sessions: stderr belongs to the terminal UI.
    File,
    Stderr,
}

/// Installs the global subscriber. Keep the returned guard alive for the
/// session so buffered file output is flushed on exit.
pub fn init(target: LogTarget) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_env(ENV_VAR).ok()?;

    match target {
        LogTarget::File => {
            let dir = std::env::temp_dir();
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .ok()?;
            Some(guard)
        }
        LogTarget::Stderr => {
            // A second install (tests, embedding) is not an error.
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init();
            None
        }
    }
}
