use crate::error::RequestError;
use crate::locator::ResourceLocator;
use crate::model::{ActionEvent, ActionName, ActivationOutcome, Outcome, ScriptConvention};
use crate::orchestrator::{display_name, Orchestrator, ProcessLauncher};
use crate::registry::ActionRegistry;
use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
///
/// Each line takes the stream lock only while it is written; the tracing
/// stderr layer shares that stream.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let mut out = std::io::stdout().lock();
                    let _ = writeln!(out, "{}", msg);
                    let _ = out.flush();
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(std::io::stderr().lock(), "{}", msg);
                }
            }
        }
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "action-deck",
    version,
    about = "Run per-tool setup scripts from a TUI grid or headless"
)]
pub struct Cli {
    /// Directory that contains `scripts/` [default: executable dir if it has one, else cwd]
    #[arg(long, env = "ACTION_DECK_RESOURCE_ROOT")]
    pub resource_root: Option<PathBuf>,

    /// Script host executable [default: wscript.exe on Windows, sh elsewhere]
    #[arg(long, env = "ACTION_DECK_SCRIPT_HOST")]
    pub script_host: Option<OsString>,

    /// Recognized script extension [default: vbs on Windows, sh elsewhere]
    #[arg(long, env = "ACTION_DECK_SCRIPT_EXTENSION")]
    pub script_extension: Option<String>,

    /// Log file, truncated on every start
    #[arg(long, env = "ACTION_DECK_LOG_FILE", default_value = crate::logging::DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Refuse to start unless running elevated (always on for Windows)
    #[arg(long, env = "ACTION_DECK_REQUIRE_ELEVATION")]
    pub require_elevation: bool,

    /// Print every action with its script path and availability, then exit (no TUI)
    #[arg(long, conflicts_with = "run")]
    pub list: bool,

    /// Run a single action and wait for it to finish (no TUI)
    #[arg(long, value_name = "ACTION")]
    pub run: Option<ActionName>,

    /// Print JSON instead of text for --list / --run
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Whether this invocation stays out of the TUI.
    pub fn is_headless(&self) -> bool {
        self.list || self.run.is_some() || !cfg!(feature = "tui")
    }

    pub fn convention(&self) -> ScriptConvention {
        ScriptConvention::platform_default()
            .with_overrides(self.script_host.clone(), self.script_extension.clone())
    }
}

pub async fn run(args: Cli) -> Result<ExitCode> {
    let convention = args.convention();
    let locator =
        ResourceLocator::detect(args.resource_root.clone()).context("locate resource root")?;
    tracing::info!(
        root = %locator.root().display(),
        layout = ?locator.layout(),
        host = %convention.host.to_string_lossy(),
        extension = %convention.extension,
        "resolved resources"
    );
    let registry = Arc::new(ActionRegistry::build(&locator, &convention));
    tracing::debug!(actions = registry.len(), "registry built");

    if let Some(action) = args.run {
        return run_single(&args, registry, convention, action).await;
    }

    if !args.list {
        #[cfg(feature = "tui")]
        {
            crate::tui::run(registry, convention).await?;
            return Ok(ExitCode::SUCCESS);
        }
    }

    run_list(&args, &registry, &convention).await
}

async fn run_list(
    args: &Cli,
    registry: &ActionRegistry,
    convention: &ScriptConvention,
) -> Result<ExitCode> {
    let view = registry.eligibility_view(convention);
    let (out_tx, out_handle) = spawn_output_writer();

    if args.json {
        let out = serde_json::to_string_pretty(&view)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let width = view
            .iter()
            .map(|v| v.name.as_str().len())
            .max()
            .unwrap_or(0);
        for v in &view {
            let mark = if v.eligible { "ok" } else { "missing" };
            let _ = out_tx.send(OutputLine::Stdout(format!(
                "{:<width$}  {:<7}  {}",
                v.name.as_str(),
                mark,
                v.script.display()
            )));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(ExitCode::SUCCESS)
}

/// Dispatch one action, stream its status lines to stderr and print the outcome.
async fn run_single(
    args: &Cli,
    registry: Arc<ActionRegistry>,
    convention: ScriptConvention,
    action: ActionName,
) -> Result<ExitCode> {
    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ActionEvent>();

    let status_tx = out_tx.clone();
    let printer = tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            match ev {
                ActionEvent::Status(s) => {
                    let _ = status_tx.send(OutputLine::Stderr(s.to_message()));
                }
                ActionEvent::Notice(n) if n.is_error() => {
                    let _ = status_tx.send(OutputLine::Stderr(format!("{}: {}", n.title, n.body)));
                }
                _ => {}
            }
        }
    });

    let script = registry.get(action).map(|e| e.script.clone());
    let mut orchestrator =
        Orchestrator::new(registry, convention.clone(), ProcessLauncher, event_tx);
    let result = match orchestrator.request_execution(action) {
        Ok(pending) => {
            let (ticket, report) = pending.wait().await;
            Ok(orchestrator.finish(ticket, report))
        }
        Err(RequestError::Launch(e)) => {
            let display = script
                .as_deref()
                .map(|p| display_name(p, &convention.marker))
                .unwrap_or_else(|| action.to_string());
            Ok(ActivationOutcome::new(
                action,
                display,
                Outcome::LaunchFailed {
                    cause: e.to_string(),
                },
                Duration::ZERO,
            ))
        }
        Err(e) => Err(e),
    };
    // Closing the event channel lets the printer finish.
    drop(orchestrator);
    let _ = printer.await;

    let success = match &result {
        Ok(outcome) => {
            let line = if args.json {
                serde_json::to_string_pretty(outcome)?
            } else {
                match &outcome.outcome {
                    Outcome::Succeeded => format!("{}: succeeded", outcome.display_name),
                    Outcome::Failed { code } => {
                        format!("{}: failed (exit code {code})", outcome.display_name)
                    }
                    Outcome::LaunchFailed { cause } => {
                        format!("{}: could not start ({cause})", outcome.display_name)
                    }
                }
            };
            let _ = out_tx.send(OutputLine::Stdout(line));
            outcome.is_success()
        }
        Err(e) => {
            if args.json {
                let out = serde_json::json!({
                    "action": action,
                    "status": "rejected",
                    "error": e.to_string(),
                });
                let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&out)?));
            }
            false
        }
    };

    drop(out_tx);
    let _ = out_handle.await;

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
