//! Misbehaving file actors for tests.

use std::{io, sync::Arc};

use anyhow::Error;
use tokio::sync::Notify;

use crate::{
    actor::{self, Actor, After},
    protocol::{CloseResult, FileAction, FileMessage, FileSender, ReadResult},
};

/// Open a file that fails every read after `good_reads` successful ones.
pub fn open_failing_file(good_reads: usize) -> FileSender {
    actor::start("failing-file", FailingFile { good_reads })
}

/// Open a file whose first read hangs until `release` is notified.
///
/// `reading` is notified once the read has started.
pub fn open_stalled_file(reading: Arc<Notify>, release: Arc<Notify>) -> FileSender {
    actor::start(
        "stalled-file",
        StalledFile {
            reading,
            release: Some(release),
        },
    )
}

struct FailingFile {
    good_reads: usize,
}

impl Actor for FailingFile {
    type Message = FileMessage;

    async fn process(&mut self, message: FileMessage) -> Result<After, Error> {
        match message.action {
            FileAction::Read(action) => {
                let result = if self.good_reads > 0 {
                    self.good_reads -= 1;
                    Ok(action.buffer.len())
                } else {
                    Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
                };

                let _ = action.on_result.send(ReadResult {
                    id: message.id,
                    offset: action.offset,
                    buffer: action.buffer,
                    result,
                });
                Ok(After::Continue)
            }
            FileAction::Close(action) => {
                confirm_close(message.id, action.on_result);
                Ok(After::Stop)
            }
        }
    }
}

struct StalledFile {
    reading: Arc<Notify>,
    release: Option<Arc<Notify>>,
}

impl Actor for StalledFile {
    type Message = FileMessage;

    async fn process(&mut self, message: FileMessage) -> Result<After, Error> {
        match message.action {
            FileAction::Read(action) => {
                if let Some(release) = self.release.take() {
                    self.reading.notify_one();
                    release.notified().await;
                }

                let _ = action.on_result.send(ReadResult {
                    id: message.id,
                    offset: action.offset,
                    buffer: action.buffer,
                    result: Ok(0),
                });
                Ok(After::Continue)
            }
            FileAction::Close(action) => {
                confirm_close(message.id, action.on_result);
                Ok(After::Stop)
            }
        }
    }
}

fn confirm_close(id: uuid::Uuid, on_result: tokio::sync::oneshot::Sender<CloseResult>) {
    let _ = on_result.send(CloseResult { id, result: Ok(()) });
}
