//! Script-backed action dispatch.
//!
//! One request starts at most one external process and, if it started, yields
//! exactly one terminal outcome through [`Orchestrator::finish`].

use super::launcher::{ExitReport, Launcher};
use crate::error::RequestError;
use crate::model::{
    ActionEvent, ActionName, ActionView, ActivationOutcome, Notice, NoticeKind, Outcome,
    ScriptConvention, StatusLine,
};
use crate::registry::ActionRegistry;
use crate::validator;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

/// Identity of a dispatched attempt, handed back to `finish`.
#[derive(Debug)]
pub(crate) struct AttemptTicket {
    pub action: ActionName,
    pub display: String,
    pub script: PathBuf,
    started: Instant,
}

/// A dispatched attempt whose process has not reported yet.
#[derive(Debug)]
pub(crate) struct PendingAttempt {
    ticket: AttemptTicket,
    exit: oneshot::Receiver<ExitReport>,
}

impl PendingAttempt {
    pub fn action(&self) -> ActionName {
        self.ticket.action
    }

    /// Resolve once the process exits.
    pub async fn wait(self) -> (AttemptTicket, ExitReport) {
        let report = self
            .exit
            .await
            .unwrap_or_else(|_| ExitReport::WaitFailed("process watcher dropped".into()));
        (self.ticket, report)
    }
}

pub(crate) struct Orchestrator<L> {
    registry: Arc<ActionRegistry>,
    convention: ScriptConvention,
    launcher: L,
    events: UnboundedSender<ActionEvent>,
    in_flight: HashSet<ActionName>,
}

impl<L: Launcher> Orchestrator<L> {
    pub fn new(
        registry: Arc<ActionRegistry>,
        convention: ScriptConvention,
        launcher: L,
        events: UnboundedSender<ActionEvent>,
    ) -> Self {
        Self {
            registry,
            convention,
            launcher,
            events,
            in_flight: HashSet::new(),
        }
    }

    pub fn eligibility_view(&self) -> Vec<ActionView> {
        self.registry.eligibility_view(&self.convention)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Validate and start the script for `action`. Never waits on the process.
    pub fn request_execution(
        &mut self,
        action: ActionName,
    ) -> Result<PendingAttempt, RequestError> {
        let Some(entry) = self.registry.get(action) else {
            tracing::error!(action = %action, "no registry entry");
            self.notify(
                NoticeKind::InvalidPath,
                "File error",
                format!("No script is configured for {action}."),
            );
            return Err(RequestError::UnknownAction(action));
        };
        let script = entry.script.clone();

        // One attempt per action at a time.
        if self.in_flight.contains(&action) {
            tracing::warn!(action = %action, "request ignored: previous attempt still running");
            self.notify(
                NoticeKind::Busy,
                "Already running",
                format!("{action} is still running. Wait for it to finish first."),
            );
            return Err(RequestError::Busy(action));
        }

        // Re-check: the file may have changed since the grid was built.
        if !validator::is_eligible(&script, &self.convention.extension) {
            self.notify(
                NoticeKind::InvalidPath,
                "File error",
                format!("Invalid script path:\n{}", script.display()),
            );
            return Err(RequestError::InvalidPath(script));
        }

        let display = display_name(&script, &self.convention.marker);
        self.status(StatusLine::InProgress {
            display: display.clone(),
        });
        let _ = self.events.send(ActionEvent::Repaint);

        let exit = match self.launcher.launch(&self.convention.host, &script) {
            Ok(rx) => rx,
            Err(e) => {
                tracing::error!(action = %action, error = %e, "failed to start process");
                self.status(StatusLine::LaunchFailed {
                    display: display.clone(),
                });
                self.notify(
                    NoticeKind::RuntimeError,
                    "Runtime error",
                    format!("Could not run script:\n{e}"),
                );
                return Err(RequestError::Launch(e));
            }
        };

        tracing::info!(
            action = %action,
            "started process: {} {}",
            self.convention.host.to_string_lossy(),
            script.display()
        );
        self.in_flight.insert(action);

        Ok(PendingAttempt {
            ticket: AttemptTicket {
                action,
                display,
                script,
                started: Instant::now(),
            },
            exit,
        })
    }

    /// Turn a completion into the terminal outcome. Call exactly once per attempt.
    pub fn finish(&mut self, ticket: AttemptTicket, report: ExitReport) -> ActivationOutcome {
        self.in_flight.remove(&ticket.action);

        match &report {
            ExitReport::NoCode => {
                tracing::warn!(action = %ticket.action, "process ended without an exit code");
            }
            ExitReport::WaitFailed(e) => {
                tracing::warn!(action = %ticket.action, error = %e, "lost track of process");
            }
            ExitReport::Code(_) => {}
        }

        let code = report.code();
        let outcome = Outcome::from_exit_code(code);
        let display = ticket.display;

        if code == 0 {
            let msg = format!("{display} completed successfully!");
            self.status(StatusLine::Succeeded {
                display: display.clone(),
            });
            self.notify(NoticeKind::Success, "Success", msg.clone());
            tracing::info!(action = %ticket.action, "{msg}");
        } else {
            let msg = format!("{display} failed (exit code: {code})");
            self.status(StatusLine::Failed {
                display: display.clone(),
                code,
            });
            self.notify(
                NoticeKind::Error,
                "Error",
                format!(
                    "{msg}\nSuggestions:\n\
                     1. Disable proxy or antivirus software that may block the script\n\
                     2. Check your network connection\n\
                     3. Try again"
                ),
            );
            tracing::error!(
                action = %ticket.action,
                script = %ticket.script.display(),
                code,
                "{msg}"
            );
        }

        let outcome =
            ActivationOutcome::new(ticket.action, display, outcome, ticket.started.elapsed());
        let _ = self.events.send(ActionEvent::Completed(outcome.clone()));
        outcome
    }

    fn status(&self, line: StatusLine) {
        let _ = self.events.send(ActionEvent::Status(line));
    }

    fn notify(&self, kind: NoticeKind, title: &str, body: String) {
        let _ = self.events.send(ActionEvent::Notice(Notice {
            kind,
            title: title.to_string(),
            body,
        }));
    }
}

/// Human-readable label: the script's base name up to the marker.
pub(crate) fn display_name(script: &Path, marker: &str) -> String {
    let base = script
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match base.find(marker) {
        Some(idx) if !marker.is_empty() => base[..idx].to_string(),
        _ => script
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::{Layout, ResourceLocator};
    use std::ffi::OsStr;
    use std::io;
    use std::sync::Mutex;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    /// Records launches; the test decides when and how each process "exits".
    #[derive(Default)]
    struct FakeLauncher {
        fail_with: Option<io::ErrorKind>,
        launched: Mutex<Vec<(String, PathBuf)>>,
        senders: Mutex<Vec<oneshot::Sender<ExitReport>>>,
    }

    impl FakeLauncher {
        fn exit_next(&self, report: ExitReport) {
            let tx = self.senders.lock().unwrap().remove(0);
            tx.send(report).unwrap();
        }
    }

    impl Launcher for Arc<FakeLauncher> {
        fn launch(
            &self,
            host: &OsStr,
            script: &Path,
        ) -> io::Result<oneshot::Receiver<ExitReport>> {
            if let Some(kind) = self.fail_with {
                return Err(io::Error::new(kind, "script host not found"));
            }
            self.launched
                .lock()
                .unwrap()
                .push((host.to_string_lossy().into_owned(), script.to_path_buf()));
            let (tx, rx) = oneshot::channel();
            self.senders.lock().unwrap().push(tx);
            Ok(rx)
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        orch: Orchestrator<Arc<FakeLauncher>>,
        launcher: Arc<FakeLauncher>,
        events: UnboundedReceiver<ActionEvent>,
        root: PathBuf,
    }

    fn fixture_with(launcher: FakeLauncher, present: &[ActionName]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let convention = ScriptConvention {
            marker: "-setup".into(),
            extension: "vbs".into(),
            host: "wscript.exe".into(),
        };
        std::fs::create_dir(root.join("scripts")).unwrap();
        for a in present {
            std::fs::write(root.join("scripts").join(convention.file_name(*a)), "x").unwrap();
        }
        let locator = ResourceLocator::new(root.clone(), Layout::Explicit);
        let registry = Arc::new(ActionRegistry::build(&locator, &convention));
        let launcher = Arc::new(launcher);
        let (tx, rx) = mpsc::unbounded_channel();
        Fixture {
            _dir: dir,
            orch: Orchestrator::new(registry, convention, launcher.clone(), tx),
            launcher,
            events: rx,
            root,
        }
    }

    fn fixture(present: &[ActionName]) -> Fixture {
        fixture_with(FakeLauncher::default(), present)
    }

    fn drain(rx: &mut UnboundedReceiver<ActionEvent>) -> Vec<ActionEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn notices(events: &[ActionEvent]) -> Vec<&Notice> {
        events
            .iter()
            .filter_map(|e| match e {
                ActionEvent::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    fn statuses(events: &[ActionEvent]) -> Vec<&StatusLine> {
        events
            .iter()
            .filter_map(|e| match e {
                ActionEvent::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn display_name_strips_marker() {
        assert_eq!(
            display_name(Path::new("/x/scripts/PhpStorm-setup.vbs"), "-setup"),
            "PhpStorm"
        );
        assert_eq!(display_name(Path::new("/x/plain.vbs"), "-setup"), "plain");
    }

    #[tokio::test]
    async fn dispatch_reports_in_progress_before_outcome() {
        let mut fx = fixture(&[ActionName::CLion]);
        let pending = fx.orch.request_execution(ActionName::CLion).unwrap();

        let events = drain(&mut fx.events);
        assert_eq!(
            statuses(&events),
            vec![&StatusLine::InProgress {
                display: "CLion".into()
            }]
        );
        assert!(matches!(events.last(), Some(ActionEvent::Repaint)));
        assert!(notices(&events).is_empty());

        let launched = fx.launcher.launched.lock().unwrap().clone();
        assert_eq!(
            launched,
            vec![(
                "wscript.exe".to_string(),
                fx.root.join("scripts/CLion-setup.vbs")
            )]
        );
        assert_eq!(pending.action(), ActionName::CLion);
        assert_eq!(fx.orch.in_flight(), 1);
    }

    #[tokio::test]
    async fn exit_zero_is_success_with_one_notice() {
        let mut fx = fixture(&[ActionName::Rider]);
        let pending = fx.orch.request_execution(ActionName::Rider).unwrap();
        drain(&mut fx.events);

        fx.launcher.exit_next(ExitReport::Code(0));
        let (ticket, report) = pending.wait().await;
        let outcome = fx.orch.finish(ticket, report);

        assert!(outcome.is_success());
        let events = drain(&mut fx.events);
        assert_eq!(
            statuses(&events),
            vec![&StatusLine::Succeeded {
                display: "Rider".into()
            }]
        );
        let n = notices(&events);
        assert_eq!(n.len(), 1);
        assert_eq!(n[0].kind, NoticeKind::Success);
        assert_eq!(fx.orch.in_flight(), 0);
    }

    #[tokio::test]
    async fn nonzero_exit_reports_code_once() {
        let mut fx = fixture(&[ActionName::GoLand]);
        let pending = fx.orch.request_execution(ActionName::GoLand).unwrap();
        drain(&mut fx.events);

        fx.launcher.exit_next(ExitReport::Code(5));
        let (ticket, report) = pending.wait().await;
        let outcome = fx.orch.finish(ticket, report);

        assert_eq!(outcome.outcome, Outcome::Failed { code: 5 });
        let events = drain(&mut fx.events);
        let status = statuses(&events);
        assert_eq!(status.len(), 1);
        assert!(status[0].to_message().contains('5'));
        let n = notices(&events);
        assert_eq!(n.len(), 1);
        assert_eq!(n[0].kind, NoticeKind::Error);
        assert!(n[0].body.contains("exit code: 5"));
        assert!(n[0].body.contains("network"));
    }

    #[tokio::test]
    async fn launch_failure_yields_runtime_error_and_no_completion() {
        let launcher = FakeLauncher {
            fail_with: Some(io::ErrorKind::NotFound),
            ..Default::default()
        };
        let mut fx = fixture_with(launcher, &[ActionName::DataGrip]);

        let err = fx.orch.request_execution(ActionName::DataGrip).unwrap_err();
        assert!(matches!(err, RequestError::Launch(_)));

        let events = drain(&mut fx.events);
        let n = notices(&events);
        assert_eq!(n.len(), 1);
        assert_eq!(n[0].kind, NoticeKind::RuntimeError);
        assert!(n[0].body.contains("script host not found"));
        assert!(!events
            .iter()
            .any(|e| matches!(e, ActionEvent::Completed(_))));
        assert_eq!(fx.orch.in_flight(), 0);
    }

    #[tokio::test]
    async fn missing_script_is_rejected_without_launch() {
        let mut fx = fixture(&[]);
        let view = fx.orch.eligibility_view();
        assert!(view.iter().all(|v| !v.eligible));

        let err = fx.orch.request_execution(ActionName::WebStorm).unwrap_err();
        assert!(matches!(err, RequestError::InvalidPath(_)));
        assert!(fx.launcher.launched.lock().unwrap().is_empty());

        let events = drain(&mut fx.events);
        assert!(statuses(&events).is_empty());
        let n = notices(&events);
        assert_eq!(n.len(), 1);
        assert_eq!(n[0].kind, NoticeKind::InvalidPath);
        assert!(n[0].body.contains("WebStorm-setup.vbs"));
    }

    #[tokio::test]
    async fn script_removed_after_view_is_caught_at_trigger() {
        let mut fx = fixture(&[ActionName::PyCharm]);
        let row = fx
            .orch
            .eligibility_view()
            .into_iter()
            .find(|v| v.name == ActionName::PyCharm)
            .unwrap();
        assert!(row.eligible);

        std::fs::remove_file(&row.script).unwrap();
        let err = fx.orch.request_execution(ActionName::PyCharm).unwrap_err();
        assert!(matches!(err, RequestError::InvalidPath(_)));
        assert!(fx.launcher.launched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn retrigger_while_running_is_rejected_until_finished() {
        let mut fx = fixture(&[ActionName::Idea]);
        let pending = fx.orch.request_execution(ActionName::Idea).unwrap();

        let err = fx.orch.request_execution(ActionName::Idea).unwrap_err();
        assert!(matches!(err, RequestError::Busy(ActionName::Idea)));
        assert_eq!(fx.launcher.launched.lock().unwrap().len(), 1);

        fx.launcher.exit_next(ExitReport::Code(0));
        let (ticket, report) = pending.wait().await;
        fx.orch.finish(ticket, report);

        assert!(fx.orch.request_execution(ActionName::Idea).is_ok());
        assert_eq!(fx.launcher.launched.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn dropped_watcher_counts_as_failure() {
        let mut fx = fixture(&[ActionName::CLion]);
        let pending = fx.orch.request_execution(ActionName::CLion).unwrap();
        fx.launcher.senders.lock().unwrap().clear();

        let (ticket, report) = pending.wait().await;
        let outcome = fx.orch.finish(ticket, report);
        assert_eq!(outcome.outcome, Outcome::Failed { code: -1 });
    }
}
