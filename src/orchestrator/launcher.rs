//! Process launch boundary.
//!
//! The orchestrator only needs "start this host with this script" and one exit
//! report later, so the seam is a trait that hands back a single-shot receiver.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;

/// How a launched process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReport {
    Code(i32),
    /// Terminated without an exit code (killed by a signal).
    NoCode,
    /// Waiting on the child failed, or the watcher went away.
    WaitFailed(String),
}

impl ExitReport {
    /// Exit code as reported to users; `-1` when the process gave none.
    pub fn code(&self) -> i32 {
        match self {
            ExitReport::Code(c) => *c,
            ExitReport::NoCode | ExitReport::WaitFailed(_) => -1,
        }
    }
}

pub trait Launcher: Send {
    /// Start `host script` without waiting for it.
    ///
    /// An `Err` means nothing was started and no report will ever arrive.
    fn launch(&self, host: &OsStr, script: &Path) -> io::Result<oneshot::Receiver<ExitReport>>;
}

/// Runs the script host as a real child process. Must be called inside a Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, host: &OsStr, script: &Path) -> io::Result<oneshot::Receiver<ExitReport>> {
        // Output is not consumed; only the exit code matters.
        let mut child = Command::new(host)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let report = match child.wait().await {
                Ok(status) => match status.code() {
                    Some(c) => ExitReport::Code(c),
                    None => ExitReport::NoCode,
                },
                Err(e) => ExitReport::WaitFailed(e.to_string()),
            };
            let _ = tx.send(report);
        });
        Ok(rx)
    }
}
