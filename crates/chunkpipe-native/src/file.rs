use std::{
    io::{ErrorKind, SeekFrom},
    path::Path,
};

use anyhow::Error;
use chunkpipe::{
    actor::{self, Actor, After},
    protocol::{CloseResult, FileAction, FileMessage, FileSender, ReadResult},
};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
};
use tracing::{event, instrument, Level};

/// Open a system file for reading, returning the mailbox of the file actor owning it.
#[instrument("open_system_file", skip_all)]
pub async fn open_system_file(path: &Path) -> Result<FileSender, std::io::Error> {
    event!(Level::DEBUG, path = %path.display(), "opening");

    let file = File::open(path).await?;

    let actor = SystemFile {
        file: Some(file),
        position: 0,
    };
    Ok(actor::start("system-file", actor))
}

struct SystemFile {
    file: Option<File>,
    /// Position of the file cursor, to skip seeks for sequential reads.
    position: u64,
}

impl Actor for SystemFile {
    type Message = FileMessage;

    async fn process(&mut self, message: FileMessage) -> Result<After, Error> {
        match message.action {
            FileAction::Read(action) => {
                let mut buffer = action.buffer;
                let result = self.read_at(action.offset, &mut buffer).await;

                // Reply result
                let result = ReadResult {
                    id: message.id,
                    offset: action.offset,
                    buffer,
                    result,
                };
                let _ = action.on_result.send(result);

                Ok(After::Continue)
            }
            FileAction::Close(action) => {
                event!(Level::DEBUG, "closing");

                // Release the file before confirming, nothing is buffered for writing
                self.file = None;

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

impl SystemFile {
    async fn read_at(&mut self, offset: u64, buffer: &mut [u8]) -> Result<usize, std::io::Error> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| std::io::Error::new(ErrorKind::Other, "file is closed"))?;

        if self.position != offset {
            self.position = file.seek(SeekFrom::Start(offset)).await?;
        }

        let count = read_eof(file, buffer).await?;
        self.position += count as u64;

        Ok(count)
    }
}

/// Read once, retrying interrupted reads.
async fn read_eof(file: &mut File, buffer: &mut [u8]) -> Result<usize, std::io::Error> {
    loop {
        match file.read(buffer).await {
            Ok(count) => return Ok(count),
            Err(error) => match error.kind() {
                ErrorKind::Interrupted => {}
                ErrorKind::UnexpectedEof => return Ok(0),
                _ => return Err(error),
            },
        }
    }
}
