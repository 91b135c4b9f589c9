use std::{io, path::PathBuf};

use thiserror::Error;

/// Error raised by a caller-supplied transform.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Terminal failure of a processing operation.
///
/// Every failure is reported once and is never retried.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to open source file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("destination file {} already exists", path.display())]
    DestinationExists { path: PathBuf },
    #[error("failed to read source file at offset {offset}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("transform failed")]
    Transform {
        #[source]
        source: BoxError,
    },
    #[error("failed to write destination file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("operation was cancelled")]
    Cancelled,
}

impl ProcessError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProcessError::Open { .. } => FailureKind::Open,
            ProcessError::DestinationExists { .. } => FailureKind::DestinationExists,
            ProcessError::Read { .. } => FailureKind::Read,
            ProcessError::Transform { .. } => FailureKind::Transform,
            ProcessError::Write { .. } => FailureKind::Write,
            ProcessError::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Category of a `ProcessError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The source could not be opened.
    Open,
    /// Something already exists at the destination path.
    DestinationExists,
    /// Reading from the source failed mid-stream.
    Read,
    /// The transform returned an error or panicked.
    Transform,
    /// Writing the destination failed.
    Write,
    /// The caller cancelled the operation.
    Cancelled,
}

/// Error for an actor that stopped before replying to a request.
pub(crate) fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "actor stopped before replying")
}
