use std::{io, path::Path, time::Instant};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{event, info_span, instrument, Instrument, Level};
use uuid::Uuid;

use crate::{
    error::disconnected,
    protocol::{FileSender, FsAction, FsExists, FsMessage, FsOpen, FsSender, FsWrite},
    OperationHandle, OperationOutcome, OperationRequest, ProcessError, Processed,
    ProcessorOptions, Progress, ReadCursor,
};

/// Processes files read in chunks from a file system actor.
///
/// Every call to `process` starts an independent operation on its own task. Operations share no
/// state besides the file system they talk to.
#[derive(Debug, Clone)]
pub struct ChunkedFileProcessor {
    fs: FsSender,
    options: ProcessorOptions,
}

impl ChunkedFileProcessor {
    pub fn new(fs: FsSender, options: ProcessorOptions) -> Self {
        Self { fs, options }
    }

    /// Start processing a file, returning a handle that yields the outcome.
    ///
    /// The operation checks that the destination is free, reads the source in chunks, applies
    /// the transform, and writes the destination. Any failing step ends the operation. Exactly
    /// one outcome is delivered to the handle.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument("ChunkedFileProcessor::process", skip_all)]
    pub fn process(&self, request: OperationRequest) -> OperationHandle {
        let started = Instant::now();
        let id = Uuid::new_v4();

        event!(
            Level::INFO,
            %id,
            source = %request.source_path().display(),
            destination = ?request.destination_path(),
            "processing file"
        );

        let cancel = CancellationToken::new();
        let (sender, receiver) = oneshot::channel();

        let operation = Operation {
            id,
            fs: self.fs.clone(),
            options: self.options.clone(),
            cancel: cancel.clone(),
        };
        let task = async move {
            let outcome = operation.run(request, started).await;
            report(&outcome);

            // The caller may have stopped listening, which is fine
            let _ = sender.send(outcome);
        };
        tokio::spawn(task.instrument(info_span!("operation", %id)));

        OperationHandle::new(id, cancel, receiver)
    }
}

struct Operation {
    id: Uuid,
    fs: FsSender,
    options: ProcessorOptions,
    cancel: CancellationToken,
}

impl Operation {
    async fn run(self, request: OperationRequest, started: Instant) -> OperationOutcome {
        let OperationRequest {
            source,
            destination,
            transform,
            progress,
        } = request;

        self.check_cancelled()?;
        if let Some(destination) = &destination {
            self.check_destination(destination).await?;
        }

        self.check_cancelled()?;
        let file = self.open(&source).await?;

        // Read everything, the handle is released on every path before continuing
        let mut cursor = ReadCursor::new(
            file,
            self.options.chunk_size,
            self.options.content_capacity,
        );
        if let Err(error) = self.read_all(&mut cursor, progress.as_ref()).await {
            // The file may still be busy with an abandoned read, don't wait for it
            cursor.release();
            return Err(error);
        }
        let bytes_read = cursor.offset();
        let content = cursor.finish().await;

        let content = match &transform {
            Some(transform) => transform.apply_blocking(content).await?,
            None => content,
        };

        let (content, destination) = match destination {
            Some(destination) => {
                self.check_cancelled()?;
                self.write(&destination, content).await?;
                (None, Some(destination))
            }
            None => (Some(content), None),
        };

        Ok(Processed {
            bytes_read,
            elapsed: started.elapsed(),
            content,
            destination,
        })
    }

    fn check_cancelled(&self) -> Result<(), ProcessError> {
        if self.cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }

        Ok(())
    }

    async fn check_destination(&self, path: &Path) -> Result<(), ProcessError> {
        let exists = call(&self.fs, |on_result| {
            FsAction::Exists(FsExists {
                path: path.to_owned(),
                on_result,
            })
        })
        .await
        .and_then(|result| result.result)
        .map_err(|source| ProcessError::Write {
            path: path.to_owned(),
            source,
        })?;

        if exists {
            return Err(ProcessError::DestinationExists {
                path: path.to_owned(),
            });
        }

        Ok(())
    }

    async fn open(&self, path: &Path) -> Result<FileSender, ProcessError> {
        call(&self.fs, |on_result| {
            FsAction::Open(FsOpen {
                path: path.to_owned(),
                on_result,
            })
        })
        .await
        .and_then(|result| result.result)
        .map_err(|source| ProcessError::Open {
            path: path.to_owned(),
            source,
        })
    }

    async fn read_all(
        &self,
        cursor: &mut ReadCursor,
        progress: Option<&mpsc::UnboundedSender<Progress>>,
    ) -> Result<(), ProcessError> {
        loop {
            let offset = cursor.offset();

            // Biased, so cancellation is seen before the next read is issued
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = cursor.read_chunk() => Some(result),
            };
            let count = match read {
                Some(result) => result?,
                None => {
                    event!(Level::DEBUG, offset, "cancelled while reading");
                    return Err(ProcessError::Cancelled);
                }
            };

            if count == 0 {
                event!(Level::DEBUG, bytes = offset, "end of stream");
                return Ok(());
            }

            event!(Level::TRACE, offset, bytes = count, "read chunk");
            if let Some(progress) = progress {
                let _ = progress.send(Progress {
                    id: self.id,
                    offset,
                    bytes: count,
                });
            }
        }
    }

    async fn write(&self, path: &Path, data: Vec<u8>) -> Result<u64, ProcessError> {
        let result = call(&self.fs, |on_result| {
            FsAction::Write(FsWrite {
                path: path.to_owned(),
                data,
                on_result,
            })
        })
        .await
        .and_then(|result| result.result);

        match result {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                Err(ProcessError::DestinationExists {
                    path: path.to_owned(),
                })
            }
            Err(source) => Err(ProcessError::Write {
                path: path.to_owned(),
                source,
            }),
        }
    }
}

/// Send a request to the file system and wait for the reply.
async fn call<T>(
    fs: &FsSender,
    action: impl FnOnce(oneshot::Sender<T>) -> FsAction,
) -> Result<T, io::Error> {
    let (sender, receiver) = oneshot::channel();
    let message = FsMessage {
        id: Uuid::new_v4(),
        action: action(sender),
    };
    fs.send(message).map_err(|_| disconnected())?;

    receiver.await.map_err(|_| disconnected())
}

fn report(outcome: &OperationOutcome) {
    match outcome {
        Ok(processed) => {
            let destination = processed
                .destination
                .as_deref()
                .map(|path| path.display().to_string());
            event!(
                Level::INFO,
                bytes = processed.bytes_read,
                elapsed_ms = processed.elapsed.as_millis() as u64,
                ?destination,
                "processed file"
            );
        }
        Err(error) => {
            event!(Level::WARN, kind = ?error.kind(), "processing failed: {}", error);
        }
    }
}
