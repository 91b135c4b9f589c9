mod handle;
mod service;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::sync::mpsc;
use uuid::Uuid;

pub use self::{handle::OperationHandle, service::ChunkedFileProcessor};
use crate::{ProcessError, Transform};

/// Default size of the buffer used for each chunk read.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default initial capacity of the accumulated content buffer.
pub const DEFAULT_CONTENT_CAPACITY: usize = 8192;

/// Terminal outcome of a processing operation.
pub type OperationOutcome = Result<Processed, ProcessError>;

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    chunk_size: usize,
    content_capacity: usize,
}

impl ProcessorOptions {
    /// Set the size of the buffer used for each chunk read.
    ///
    /// This only changes how many reads are needed, not what is read. A size of zero is treated
    /// as one.
    pub fn chunk_size(mut self, value: usize) -> Self {
        self.chunk_size = value.max(1);
        self
    }

    /// Set the initial capacity of the accumulated content buffer.
    pub fn content_capacity(mut self, value: usize) -> Self {
        self.content_capacity = value;
        self
    }
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            content_capacity: DEFAULT_CONTENT_CAPACITY,
        }
    }
}

/// Request to process a single source file.
#[derive(Debug)]
pub struct OperationRequest {
    source: PathBuf,
    destination: Option<PathBuf>,
    transform: Option<Transform>,
    progress: Option<mpsc::UnboundedSender<Progress>>,
}

impl OperationRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            transform: None,
            progress: None,
        }
    }

    /// Write the processed content to a new file at `value`.
    ///
    /// The operation fails rather than overwrite an existing file.
    pub fn destination(mut self, value: impl Into<PathBuf>) -> Self {
        self.destination = Some(value.into());
        self
    }

    /// Apply `value` to the full content once it has been read.
    pub fn transform(mut self, value: Transform) -> Self {
        self.transform = Some(value);
        self
    }

    /// Receive a `Progress` notification for every chunk read.
    pub fn progress(mut self, value: mpsc::UnboundedSender<Progress>) -> Self {
        self.progress = Some(value);
        self
    }

    pub fn source_path(&self) -> &Path {
        &self.source
    }

    pub fn destination_path(&self) -> Option<&Path> {
        self.destination.as_deref()
    }
}

/// Notification of a completed chunk read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Identifier of the operation.
    pub id: Uuid,
    /// Offset the chunk was read from.
    pub offset: u64,
    /// Amount of bytes in the chunk.
    pub bytes: usize,
}

/// Successful outcome of a processing operation.
#[derive(Debug)]
pub struct Processed {
    /// Total amount of bytes read from the source.
    pub bytes_read: u64,
    /// Time from submission until the outcome.
    pub elapsed: Duration,
    /// The processed content, if it wasn't written to a destination.
    pub content: Option<Vec<u8>>,
    /// Path the processed content was written to.
    pub destination: Option<PathBuf>,
}
