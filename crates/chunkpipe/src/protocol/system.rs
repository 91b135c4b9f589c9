//! File system operations interface.
//!
//! The file system opens files, and answers path level questions the processor has before and
//! after reading.

use std::{io, path::PathBuf};

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::protocol::FileSender;

/// Mailbox of a file system actor.
pub type FsSender = mpsc::UnboundedSender<FsMessage>;

/// Message to a file system actor.
pub struct FsMessage {
    pub id: Uuid,
    pub action: FsAction,
}

/// Operation to perform on the file system.
pub enum FsAction {
    /// Open a file for reading, replying with the mailbox of a new file actor.
    Open(FsOpen),
    /// Check if anything exists at a path.
    Exists(FsExists),
    /// Write data to a new file as a single atomic operation.
    ///
    /// Fails with `io::ErrorKind::AlreadyExists` if the path is taken by the time the data is
    /// committed.
    Write(FsWrite),
}

pub struct FsOpen {
    pub path: PathBuf,
    pub on_result: oneshot::Sender<OpenResult>,
}

pub struct FsExists {
    pub path: PathBuf,
    pub on_result: oneshot::Sender<ExistsResult>,
}

pub struct FsWrite {
    pub path: PathBuf,
    pub data: Vec<u8>,
    pub on_result: oneshot::Sender<WriteResult>,
}

/// Result of `FsAction::Open`.
pub struct OpenResult {
    /// Identifier of originating message.
    pub id: Uuid,
    pub result: Result<FileSender, io::Error>,
}

/// Result of `FsAction::Exists`.
pub struct ExistsResult {
    /// Identifier of originating message.
    pub id: Uuid,
    pub result: Result<bool, io::Error>,
}

/// Result of `FsAction::Write`.
pub struct WriteResult {
    /// Identifier of originating message.
    pub id: Uuid,
    /// Amount of bytes written.
    pub result: Result<u64, io::Error>,
}
