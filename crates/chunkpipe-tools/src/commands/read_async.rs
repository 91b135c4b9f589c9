use std::{io::Write, path::PathBuf};

use anyhow::Error;
use chunkpipe::{ChunkedFileProcessor, OperationRequest};
use clap::Args;
use tokio::sync::mpsc;
use tracing::{event, instrument, Level};

use super::print_content;

/// Read a file in chunks without blocking, and print it.
#[derive(Args, Debug)]
pub struct ReadAsyncCommand {
    /// Path of the file to read.
    #[arg(short, long, value_name = "PATH")]
    pub(crate) path: PathBuf,
}

#[instrument("read-async", skip_all)]
pub async fn run(processor: &ChunkedFileProcessor, command: ReadAsyncCommand) -> Result<(), Error> {
    event!(Level::INFO, path = %command.path.display(), "reading file");

    let (progress, mut chunks) = mpsc::unbounded_channel();
    let request = OperationRequest::new(&command.path).progress(progress);
    let handle = processor.process(request);
    event!(Level::INFO, id = %handle.id(), "read in progress");

    // One dot per chunk, until the operation drops its end of the channel
    let mut stdout = std::io::stdout();
    while chunks.recv().await.is_some() {
        write!(stdout, ".")?;
        stdout.flush()?;
    }

    let processed = handle.await?;
    let content = processed.content.unwrap_or_default();
    print_content(&content, processed.elapsed)
}
