mod commands;

use anyhow::{Context as _, Error};
use chunkpipe::{ChunkedFileProcessor, ProcessorOptions, DEFAULT_CHUNK_SIZE};
use chunkpipe_native::start_system_fs;
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::{event, Level};
use tracing_subscriber::{prelude::*, EnvFilter, FmtSubscriber};

use crate::commands::{process, read, read_async};

fn main() {
    let args = CliArgs::parse();

    if let Err(error) = init_tracing(&args.log) {
        eprintln!("failed to set up logging:\n{:?}", error);
        std::process::exit(1);
    }

    // Run main
    let result = try_main(args);

    // Report any otherwise unhandled errors
    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            event!(Level::ERROR, "failed:\n{:?}", error);
            std::process::exit(1);
        }
    }
}

fn init_tracing(directives: &str) -> Result<(), Error> {
    let filter = EnvFilter::builder()
        .parse(directives)
        .context("invalid log filter")?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish()
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Returns if the command succeeded.
fn try_main(args: CliArgs) -> Result<bool, Error> {
    let chunk_size = args.chunk_size;

    match args.command {
        // The blocking reader runs without any runtime
        Command::Read(command) => {
            read::run(command)?;
            Ok(true)
        }
        Command::ReadAsync(command) => runtime()?.block_on(async move {
            let processor = start_processor(chunk_size);
            read_async::run(&processor, command).await?;
            Ok::<_, Error>(true)
        }),
        Command::Process(command) => runtime()?.block_on(async move {
            let processor = start_processor(chunk_size);
            process::run(&processor, command).await
        }),
    }
}

fn runtime() -> Result<Runtime, Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    Ok(runtime)
}

/// Start a processor on the native file system, must run inside the runtime.
fn start_processor(chunk_size: usize) -> ChunkedFileProcessor {
    let options = ProcessorOptions::default().chunk_size(chunk_size);
    ChunkedFileProcessor::new(start_system_fs(), options)
}

/// Chunked file reading and processing toolkit.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Size in bytes of every chunk read.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE, global = true)]
    chunk_size: usize,

    /// Log filter directives, for example "info" or "chunkpipe=trace".
    #[arg(long, value_name = "FILTER", default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Read(read::ReadCommand),
    ReadAsync(read_async::ReadAsyncCommand),
    Process(process::ProcessCommand),
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn parses_global_options_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "chunkpipe",
            "process",
            "--path",
            "input.txt",
            "--chunk-size",
            "4096",
        ])
        .unwrap();

        assert_eq!(args.chunk_size, 4096);
        assert_eq!(args.log, "info");
        match args.command {
            Command::Process(command) => assert_eq!(command.path, PathBuf::from("input.txt")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn read_requires_path() {
        assert!(CliArgs::try_parse_from(["chunkpipe", "read"]).is_err());
    }
}
