//! Asynchronous chunked file processing.
//!
//! A `ChunkedFileProcessor` reads a source file one chunk at a time, optionally transforms the
//! full content, and optionally writes it to a new destination file. Every operation reports
//! exactly one outcome, either `Processed` or a `ProcessError`.
//!
//! # Files and file systems
//!
//! The processor doesn't touch the disk itself. It talks to a "file system" actor, which opens
//! "file" actors that serve chunk reads. The message types are in `protocol`, and an in-memory
//! file is available through `open_buffer_file`. Native implementations live in
//! `chunkpipe-native`.

pub mod actor;
mod buffer;
mod cursor;
mod error;
mod processor;
pub mod protocol;
#[cfg(test)]
mod testing;
mod transform;

pub use self::{
    buffer::open_buffer_file,
    cursor::ReadCursor,
    error::{BoxError, FailureKind, ProcessError},
    processor::{
        ChunkedFileProcessor, OperationHandle, OperationOutcome, OperationRequest, Processed,
        ProcessorOptions, Progress, DEFAULT_CHUNK_SIZE, DEFAULT_CONTENT_CAPACITY,
    },
    transform::Transform,
};
