//! Tracing subscriber setup
//!
//! Logs go to stderr so stdout stays free for the report. An optional log
//! file receives the same events through a non-blocking writer.

use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor `--verbose` says otherwise
pub const DEFAULT_FILTER: &str = "campusdeck=info";
const VERBOSE_FILTER: &str = "campusdeck=debug";

/// Picks the filter directive: `--verbose` wins, then `RUST_LOG`, then the default
pub fn filter_directive(verbose: bool, rust_log: Option<&str>) -> String {
    match (verbose, rust_log) {
        (true, _) => VERBOSE_FILTER.to_string(),
        (false, Some(env)) if !env.trim().is_empty() => env.to_string(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Installs the global subscriber
///
/// # Arguments
/// * `verbose` - Enable debug output for this crate
/// * `log_file` - Also append events to this file
///
/// # Returns
/// The file writer's guard, which must be held until the program exits so
/// buffered lines get flushed.
pub fn init(verbose: bool, log_file: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(verbose, rust_log.as_deref());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)?;
            let file_name = path.file_name().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "log file has no name")
            })?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    Ok(guard)
}
