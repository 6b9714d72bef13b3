use crate::path::PathError;
use thiserror::Error;

/// Lifecycle misuse and initialization failures for [`crate::FileSink`].
#[derive(Debug, Error)]
pub enum FileSinkError {
    #[error("file sink has not been initialized")]
    NotInitialized,
    #[error("file sink is already running")]
    AlreadyStarted,
    #[error("file sink is not running")]
    NotRunning,
    #[error("invalid target path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("target directory does not exist or is not writable: {0}")]
    DirectoryNotFound(String),
    #[error("failed to open log file: {0}")]
    IoFailure(#[from] std::io::Error),
    #[error("forwarding is already attached")]
    DuplicateForwarding,
    #[error("forwarding is not attached")]
    UnknownForwarding,
    #[error("a sink cannot forward to itself")]
    SelfForwarding,
}
