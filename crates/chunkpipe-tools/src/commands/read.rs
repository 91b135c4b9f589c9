use std::{path::PathBuf, time::Instant};

use anyhow::{Context as _, Error};
use clap::Args;
use tracing::{event, instrument, Level};

use super::print_content;

/// Read a file in a single blocking call and print it.
#[derive(Args, Debug)]
pub struct ReadCommand {
    /// Path of the file to read.
    #[arg(short, long, value_name = "PATH")]
    pub(crate) path: PathBuf,
}

#[instrument("read", skip_all)]
pub fn run(command: ReadCommand) -> Result<(), Error> {
    event!(Level::INFO, path = %command.path.display(), "reading file");

    let started = Instant::now();
    let content = std::fs::read(&command.path)
        .with_context(|| format!("failed to read {}", command.path.display()))?;
    let elapsed = started.elapsed();

    print_content(&content, elapsed)
}
