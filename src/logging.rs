//! Log file setup.
//!
//! Every run starts a fresh file. Headless modes also mirror warnings and
//! errors to stderr; the TUI does not, since it owns the terminal.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

pub const DEFAULT_LOG_FILE: &str = "action-deck.log";

/// Keep alive until exit; dropping it flushes both writers.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    _stderr_guard: Option<WorkerGuard>,
}

/// File verbosity: `RUST_LOG` if set, otherwise debug so registry setup is recorded.
fn file_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
}

fn file_layer<S>(writer: NonBlocking) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(file_filter())
}

/// Warnings and errors only; status lines already go to stderr through the CLI writer.
fn stderr_layer<S>(writer: NonBlocking) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .compact()
        .with_filter(LevelFilter::WARN)
}

pub fn init(log_file: &Path, mirror_to_stderr: bool) -> Result<LoggingGuard> {
    let dir = match log_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = log_file
        .file_name()
        .context("log file path has no file name")?;

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    // Previous session's log is discarded.
    let path = dir.join(file_name);
    if path.exists() {
        let _ = std::fs::remove_file(&path);
    }

    let file_appender = tracing_appender::rolling::never(&dir, file_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    // Own worker thread, so log calls never contend with the CLI's stderr writes.
    let (mirror, stderr_guard) = if mirror_to_stderr {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
        (Some(stderr_layer(writer)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(file_layer(file_writer))
        .with(mirror)
        .try_init()
        .context("install tracing subscriber")?;

    tracing::info!(log_path = %path.display(), "logging initialized");

    Ok(LoggingGuard {
        _file_guard: file_guard,
        _stderr_guard: stderr_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_previous_log_and_installs_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs").join(DEFAULT_LOG_FILE);
        std::fs::create_dir_all(log.parent().unwrap()).unwrap();
        std::fs::write(&log, "stale line from an earlier run\n").unwrap();

        let guard = init(&log, false).unwrap();
        tracing::info!("fresh");
        drop(guard);

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(!content.contains("stale line"));
        assert!(content.contains("fresh"));

        // The global subscriber is already installed.
        assert!(init(&dir.path().join("other.log"), false).is_err());
    }

    #[test]
    fn file_records_every_registered_script() {
        use crate::locator::{Layout, ResourceLocator};
        use crate::model::{ActionName, ScriptConvention};
        use crate::registry::ActionRegistry;

        let dir = tempfile::tempdir().unwrap();
        let appender = tracing_appender::rolling::never(dir.path(), "registry.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let subscriber = tracing_subscriber::registry().with(file_layer(writer));

        tracing::subscriber::with_default(subscriber, || {
            let loc = ResourceLocator::new(dir.path().to_path_buf(), Layout::Explicit);
            ActionRegistry::build(&loc, &ScriptConvention::platform_default());
        });
        drop(guard);

        let content = std::fs::read_to_string(dir.path().join("registry.log")).unwrap();
        let registered: Vec<&str> = content
            .lines()
            .filter(|l| l.contains("registered script"))
            .collect();
        assert_eq!(registered.len(), ActionName::ALL.len());
        for name in ActionName::ALL {
            assert!(
                registered.iter().any(|l| l.contains(&format!("action={name}"))),
                "{name}"
            );
        }
    }
}
