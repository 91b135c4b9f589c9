use anyhow::Error;
use tracing::{event, instrument, Level};

use crate::{
    actor::{self, Actor, After},
    protocol::{CloseResult, FileAction, FileMessage, FileSender, ReadResult},
};

/// Open an in-memory file, serving reads from `data`.
///
/// Must be called from within a tokio runtime.
#[instrument("open_buffer_file", skip_all)]
pub fn open_buffer_file(data: Vec<u8>) -> FileSender {
    event!(Level::DEBUG, bytes = data.len(), "opening");

    actor::start("buffer-file", BufferFile { data })
}

struct BufferFile {
    data: Vec<u8>,
}

impl Actor for BufferFile {
    type Message = FileMessage;

    async fn process(&mut self, message: FileMessage) -> Result<After, Error> {
        match message.action {
            FileAction::Read(action) => {
                let mut buffer = action.buffer;

                // Reads past the end of the data are at end of stream
                let start = usize::try_from(action.offset)
                    .unwrap_or(usize::MAX)
                    .min(self.data.len());
                let available = self.data.len() - start;
                let count = usize::min(buffer.len(), available);

                buffer[..count].copy_from_slice(&self.data[start..start + count]);

                // Reply result
                let result = ReadResult {
                    id: message.id,
                    offset: action.offset,
                    buffer,
                    result: Ok(count),
                };
                let _ = action.on_result.send(result);

                Ok(After::Continue)
            }
            FileAction::Close(action) => {
                event!(Level::DEBUG, "closing");

                let result = CloseResult {
                    id: message.id,
                    result: Ok(()),
                };
                let _ = action.on_result.send(result);

                Ok(After::Stop)
            }
        }
    }
}
