use std::mem;

use tokio::sync::oneshot;
use tracing::{event, Level};
use uuid::Uuid;

use crate::{
    error::disconnected,
    protocol::{CloseResult, FileAction, FileClose, FileMessage, FileRead, FileSender},
    ProcessError,
};

/// Sequential chunk reader over an open file.
///
/// The cursor is the only owner of the file handle and its buffers. At most one read is in
/// flight at a time: `read_chunk` takes `&mut self`, and the chunk buffer itself is moved into
/// the read request and handed back with the result.
///
/// Dropping a cursor that hasn't been closed drops the file handle, which stops the file actor
/// and releases the file.
pub struct ReadCursor {
    file: Option<FileSender>,
    offset: u64,
    accumulated: Vec<u8>,
    chunk: Vec<u8>,
    chunk_size: usize,
}

impl ReadCursor {
    pub fn new(file: FileSender, chunk_size: usize, content_capacity: usize) -> Self {
        let chunk_size = chunk_size.max(1);

        Self {
            file: Some(file),
            offset: 0,
            accumulated: Vec::with_capacity(content_capacity),
            chunk: vec![0u8; chunk_size],
            chunk_size,
        }
    }

    /// Offset of the next read, equal to the total amount of bytes read so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn accumulated(&self) -> &[u8] {
        &self.accumulated
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Read the next chunk, appending it to the accumulated content.
    ///
    /// Returns the amount of bytes read, zero at end of stream.
    pub async fn read_chunk(&mut self) -> Result<usize, ProcessError> {
        let offset = self.offset;
        let file = self.file.as_ref().ok_or_else(|| ProcessError::Read {
            offset,
            source: std::io::Error::new(std::io::ErrorKind::Other, "file handle is closed"),
        })?;

        // A buffer lost together with a failed request gets replaced
        if self.chunk.len() != self.chunk_size {
            self.chunk = vec![0u8; self.chunk_size];
        }

        // Lend the chunk buffer to the file until the read completes
        let (sender, receiver) = oneshot::channel();
        let message = FileMessage {
            id: Uuid::new_v4(),
            action: FileAction::Read(FileRead {
                offset,
                buffer: mem::take(&mut self.chunk),
                on_result: sender,
            }),
        };
        if let Err(error) = file.send(message) {
            if let FileAction::Read(action) = error.0.action {
                self.chunk = action.buffer;
            }
            return Err(ProcessError::Read {
                offset,
                source: disconnected(),
            });
        }

        let result = receiver.await.map_err(|_| ProcessError::Read {
            offset,
            source: disconnected(),
        })?;
        self.chunk = result.buffer;
        let count = result
            .result
            .map_err(|source| ProcessError::Read { offset, source })?;

        let count = count.min(self.chunk.len());
        self.accumulated.extend_from_slice(&self.chunk[..count]);
        self.offset += count as u64;

        Ok(count)
    }

    /// Close the file handle, waiting for the file to confirm.
    ///
    /// Only the first call releases the handle, returning `true`. Failures to close are logged,
    /// the handle is considered released regardless.
    pub async fn close(&mut self) -> bool {
        let Some(file) = self.file.take() else {
            return false;
        };

        let Some(receiver) = send_close(&file) else {
            event!(Level::DEBUG, "file already stopped");
            return true;
        };

        match receiver.await {
            Ok(result) => {
                if let Err(error) = result.result {
                    event!(Level::WARN, ?error, "failed to close file");
                }
            }
            Err(_) => event!(Level::DEBUG, "file stopped before confirming close"),
        }

        true
    }

    /// Close the file handle without waiting for the file to confirm.
    ///
    /// A file stuck in an abandoned read can't confirm, the close is processed once that read
    /// completes. Like `close`, only the first call releases the handle.
    pub fn release(&mut self) -> bool {
        let Some(file) = self.file.take() else {
            return false;
        };

        if send_close(&file).is_none() {
            event!(Level::DEBUG, "file already stopped");
        }

        true
    }

    /// Close the file handle if still open, and take the accumulated content.
    pub async fn finish(mut self) -> Vec<u8> {
        self.close().await;
        mem::take(&mut self.accumulated)
    }
}

fn send_close(file: &FileSender) -> Option<oneshot::Receiver<CloseResult>> {
    let (sender, receiver) = oneshot::channel();
    let message = FileMessage {
        id: Uuid::new_v4(),
        action: FileAction::Close(FileClose { on_result: sender }),
    };

    file.send(message).ok().map(|_| receiver)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::sync::Notify;

    use super::*;
    use crate::{
        open_buffer_file,
        testing::{open_failing_file, open_stalled_file},
        FailureKind,
    };

    fn content(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn reads_in_fixed_size_chunks_until_end_of_stream() {
        let data = content(2500);
        let mut cursor = ReadCursor::new(open_buffer_file(data.clone()), 1024, 8192);

        let mut counts = Vec::new();
        loop {
            let count = cursor.read_chunk().await.unwrap();
            counts.push(count);
            if count == 0 {
                break;
            }
        }

        assert_eq!(counts, vec![1024, 1024, 452, 0]);
        assert_eq!(cursor.offset(), 2500);
        assert_eq!(cursor.finish().await, data);
    }

    #[tokio::test]
    async fn empty_file_ends_on_first_read() {
        let mut cursor = ReadCursor::new(open_buffer_file(Vec::new()), 16, 0);

        assert_eq!(cursor.read_chunk().await.unwrap(), 0);
        assert_eq!(cursor.offset(), 0);
        assert!(cursor.finish().await.is_empty());
    }

    #[tokio::test]
    async fn zero_chunk_size_still_makes_progress() {
        let mut cursor = ReadCursor::new(open_buffer_file(b"abc".to_vec()), 0, 0);

        assert_eq!(cursor.read_chunk().await.unwrap(), 1);
        assert_eq!(cursor.accumulated(), b"a");
    }

    #[tokio::test]
    async fn close_releases_handle_exactly_once() {
        let file = open_buffer_file(content(10));
        let probe = file.clone();
        let mut cursor = ReadCursor::new(file, 4, 0);

        assert!(cursor.close().await);
        assert!(!cursor.close().await);
        assert!(cursor.is_closed());

        // The actor stopped, dropping its mailbox
        probe.closed().await;
    }

    #[tokio::test]
    async fn read_after_close_fails() {
        let mut cursor = ReadCursor::new(open_buffer_file(content(10)), 4, 0);
        cursor.close().await;

        let error = cursor.read_chunk().await.unwrap_err();
        assert_eq!(error.kind(), FailureKind::Read);
    }

    #[tokio::test]
    async fn read_error_is_reported_with_offset() {
        let file = open_failing_file(1);
        let mut cursor = ReadCursor::new(file, 4, 0);

        assert_eq!(cursor.read_chunk().await.unwrap(), 4);
        let error = cursor.read_chunk().await.unwrap_err();

        assert!(matches!(error, ProcessError::Read { offset: 4, .. }));
        assert_eq!(cursor.accumulated().len(), 4);
    }

    #[tokio::test]
    async fn stopped_file_is_a_read_error() {
        let file = open_buffer_file(content(10));
        let mut cursor = ReadCursor::new(file.clone(), 4, 0);

        // Stop the actor behind the cursor's back
        let (sender, receiver) = oneshot::channel();
        let message = FileMessage {
            id: Uuid::new_v4(),
            action: FileAction::Close(FileClose { on_result: sender }),
        };
        file.send(message).unwrap();
        receiver.await.unwrap();
        file.closed().await;

        let error = cursor.read_chunk().await.unwrap_err();
        assert_eq!(error.kind(), FailureKind::Read);

        // The buffer survived the failed send, the next attempt fails the same way
        let error = cursor.read_chunk().await.unwrap_err();
        assert_eq!(error.kind(), FailureKind::Read);
    }

    #[tokio::test]
    async fn release_does_not_wait_for_stalled_read() {
        let reading = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let file = open_stalled_file(reading.clone(), release.clone());
        let probe = file.clone();
        let mut cursor = ReadCursor::new(file, 4, 0);

        // Abandon a read the file never finishes
        let read = tokio::time::timeout(Duration::from_millis(50), cursor.read_chunk());
        let (abandoned, _) = tokio::join!(read, reading.notified());
        assert!(abandoned.is_err());

        assert!(cursor.release());
        assert!(!cursor.release());
        assert!(cursor.is_closed());

        // Once unstuck, the file processes the queued close and stops
        release.notify_one();
        probe.closed().await;
    }
}
