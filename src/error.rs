use crate::model::ActionName;
use std::path::PathBuf;
use thiserror::Error;

/// Why a request did not produce a running attempt.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("no script registered for {0}")]
    UnknownAction(ActionName),

    #[error("{0} is already running")]
    Busy(ActionName),

    #[error("invalid script path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to start script host: {0}")]
    Launch(#[source] std::io::Error),
}
