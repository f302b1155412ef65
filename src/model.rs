use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Supported tools, in grid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActionName {
    CLion,
    DataGrip,
    GoLand,
    #[serde(rename = "IDEA")]
    Idea,
    PhpStorm,
    PyCharm,
    Rider,
    WebStorm,
}

impl ActionName {
    pub const ALL: [ActionName; 8] = [
        ActionName::CLion,
        ActionName::DataGrip,
        ActionName::GoLand,
        ActionName::Idea,
        ActionName::PhpStorm,
        ActionName::PyCharm,
        ActionName::Rider,
        ActionName::WebStorm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionName::CLion => "CLion",
            ActionName::DataGrip => "DataGrip",
            ActionName::GoLand => "GoLand",
            ActionName::Idea => "IDEA",
            ActionName::PhpStorm => "PhpStorm",
            ActionName::PyCharm => "PyCharm",
            ActionName::Rider => "Rider",
            ActionName::WebStorm => "WebStorm",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionName::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = ActionName::ALL.iter().map(|a| a.as_str()).collect();
                format!("unknown action '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// File naming and execution rules shared by the registry, validator and orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptConvention {
    /// Trailing marker between the tool name and the extension.
    pub marker: String,
    /// Recognized script extension, without the leading dot.
    pub extension: String,
    /// Script host executable; receives the script path as its only argument.
    pub host: OsString,
}

impl ScriptConvention {
    pub const MARKER: &'static str = "-setup";

    /// Platform default: `wscript.exe` + `.vbs` on Windows, `sh` + `.sh` elsewhere.
    pub fn platform_default() -> Self {
        let (extension, host) = if cfg!(windows) {
            ("vbs", "wscript.exe")
        } else {
            ("sh", "sh")
        };
        Self {
            marker: Self::MARKER.to_string(),
            extension: extension.to_string(),
            host: host.into(),
        }
    }

    /// Apply configured overrides on top of the platform default.
    pub fn with_overrides(mut self, host: Option<OsString>, extension: Option<String>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(ext) = extension {
            self.extension = ext.trim_start_matches('.').to_string();
        }
        self
    }

    pub fn file_name(&self, action: ActionName) -> String {
        format!("{}{}.{}", action.as_str(), self.marker, self.extension)
    }
}

/// Per-action row handed to presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct ActionView {
    pub name: ActionName,
    pub script: PathBuf,
    pub eligible: bool,
}

/// Terminal result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed { code: i32 },
    LaunchFailed { cause: String },
}

impl Outcome {
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            Outcome::Succeeded
        } else {
            Outcome::Failed { code }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivationOutcome {
    pub action: ActionName,
    pub display_name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub elapsed_ms: u64,
    pub finished_utc: String,
}

impl ActivationOutcome {
    pub fn new(
        action: ActionName,
        display_name: String,
        outcome: Outcome,
        elapsed: Duration,
    ) -> Self {
        Self {
            action,
            display_name,
            outcome,
            elapsed_ms: elapsed.as_millis() as u64,
            finished_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded)
    }
}

/// The single status indicator shown by presentation layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Ready,
    InProgress { display: String },
    Succeeded { display: String },
    Failed { display: String, code: i32 },
    LaunchFailed { display: String },
}

impl StatusLine {
    pub fn to_message(&self) -> String {
        match self {
            StatusLine::Ready => "Ready | pick a tool to run its setup script".to_string(),
            StatusLine::InProgress { display } => format!("Running {display}..."),
            StatusLine::Succeeded { display } => format!("{display} completed successfully"),
            StatusLine::Failed { display, code } => {
                format!("{display} failed (exit code: {code})")
            }
            StatusLine::LaunchFailed { display } => format!("{display} could not be started"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    RuntimeError,
    InvalidPath,
    Busy,
}

/// Modal notification; exactly one is produced per terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn is_error(&self) -> bool {
        !matches!(self.kind, NoticeKind::Success)
    }
}

/// Events emitted by the orchestrator and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum ActionEvent {
    Status(StatusLine),
    Notice(Notice),
    /// Redraw now so the latest status is visible before the external work proceeds.
    Repaint,
    Completed(ActivationOutcome),
}
