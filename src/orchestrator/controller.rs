//! Dispatch loop.
//!
//! Owns the orchestrator, turns UI commands into requests and feeds process
//! completions back in, so every status change is made from this one task.

use super::dispatch::Orchestrator;
use super::launcher::Launcher;
use crate::model::ActionName;
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Execute(ActionName),
    Quit,
}

/// Run until the UI quits or drops its command sender.
///
/// Processes still running at that point are left alone; there is no cancel.
pub(crate) async fn run_controller<L: Launcher>(
    mut orchestrator: Orchestrator<L>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut pending = FuturesUnordered::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Execute(action)) => {
                        // Rejections were already reported to the UI as notices.
                        if let Ok(attempt) = orchestrator.request_execution(action) {
                            tracing::debug!(
                                action = %attempt.action(),
                                in_flight = orchestrator.in_flight(),
                                "dispatched"
                            );
                            pending.push(attempt.wait());
                        }
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some((ticket, report)) = pending.next(), if !pending.is_empty() => {
                orchestrator.finish(ticket, report);
            }
        }
    }

    if orchestrator.in_flight() > 0 {
        tracing::info!(
            running = orchestrator.in_flight(),
            "exiting with scripts still running"
        );
    }
    Ok(())
}
