//! File operations interface.
//!
//! A "file" is an open channel handle to a readable blob of binary data, not necessarily a system
//! file. Reads lend a buffer to the file, which hands it back together with the result.

use std::io;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Mailbox of a file actor.
///
/// The file stays open for as long as the actor is running. Once every sender is dropped, or a
/// `FileAction::Close` has been processed, the actor releases the file.
pub type FileSender = mpsc::UnboundedSender<FileMessage>;

/// Message to a file actor.
pub struct FileMessage {
    pub id: Uuid,
    pub action: FileAction,
}

/// Operation to perform on a file.
pub enum FileAction {
    /// Read a chunk of data.
    Read(FileRead),
    /// Release the file and stop the actor.
    Close(FileClose),
}

pub struct FileRead {
    pub offset: u64,
    /// Buffer to read into, its length is the maximum amount of bytes read.
    pub buffer: Vec<u8>,
    pub on_result: oneshot::Sender<ReadResult>,
}

pub struct FileClose {
    pub on_result: oneshot::Sender<CloseResult>,
}

/// Result of `FileAction::Read`.
pub struct ReadResult {
    /// Identifier of originating message.
    pub id: Uuid,
    /// Offset the read started at.
    pub offset: u64,
    /// The lent buffer, handed back to the reader.
    pub buffer: Vec<u8>,
    /// Amount of bytes read into the start of `buffer`, zero at end of stream.
    pub result: Result<usize, io::Error>,
}

/// Result of `FileAction::Close`.
pub struct CloseResult {
    /// Identifier of originating message.
    pub id: Uuid,
    pub result: Result<(), io::Error>,
}
