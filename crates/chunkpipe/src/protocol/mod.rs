//! Protocol interface types.

mod file;
mod system;

pub use self::{
    file::{
        CloseResult, FileAction, FileClose, FileMessage, FileRead, FileSender, ReadResult,
    },
    system::{
        ExistsResult, FsAction, FsExists, FsMessage, FsOpen, FsSender, FsWrite, OpenResult,
        WriteResult,
    },
};
