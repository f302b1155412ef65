//! Action orchestration.
//!
//! This module owns the lifecycle of script runs: validation at trigger time,
//! process launch, and conversion of exit codes into status and notices.
//! UI/CLI layers talk to it through `UiCommand`s and `ActionEvent`s only.

mod controller;
mod dispatch;
mod launcher;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use dispatch::{display_name, Orchestrator};
pub(crate) use launcher::ProcessLauncher;
