use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Error;
use chunkpipe::{ChunkedFileProcessor, OperationRequest, ProcessError, Transform};
use clap::Args;
use serde::Serialize;
use tracing::{event, instrument, Level};

/// Base64 encode a file into a new output file, failing if the output already exists.
#[derive(Args, Debug)]
pub struct ProcessCommand {
    /// Path of the input file to read.
    #[arg(short, long, value_name = "PATH")]
    pub(crate) path: PathBuf,

    /// Path of the output file to write, defaults to the input path with ".processed" appended.
    #[arg(short, long, value_name = "PATH")]
    pub(crate) output: Option<PathBuf>,

    /// Cancel processing if it hasn't finished after this many milliseconds.
    #[arg(long, value_name = "MS")]
    pub(crate) timeout_ms: Option<u64>,
}

/// Status report printed once processing has finished.
#[derive(Serialize, Debug, PartialEq, Eq)]
struct Response {
    result: bool,
    message: String,
}

impl Response {
    fn new(output: &Path, outcome: Result<(), ProcessError>) -> Self {
        match outcome {
            Ok(()) => Self {
                result: true,
                message: format!("Generated {}", output.display()),
            },
            Err(error) => Self {
                result: false,
                message: format!("{:#}", Error::from(error)),
            },
        }
    }
}

/// Returns if the file was processed.
#[instrument("process", skip_all)]
pub async fn run(processor: &ChunkedFileProcessor, command: ProcessCommand) -> Result<bool, Error> {
    event!(Level::INFO, path = %command.path.display(), "processing file");

    let output = command
        .output
        .clone()
        .unwrap_or_else(|| processed_path(&command.path));
    let request = OperationRequest::new(&command.path)
        .destination(&output)
        .transform(Transform::base64());
    let handle = processor.process(request);

    // A deadline is a timer cancelling the operation from the outside
    let timer = command.timeout_ms.map(|timeout| {
        let token = handle.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(timeout)).await;
            event!(Level::WARN, timeout_ms = timeout, "deadline expired, cancelling");
            token.cancel();
        })
    });

    let outcome = handle.await;
    if let Some(timer) = timer {
        timer.abort();
    }

    let response = Response::new(&output, outcome.map(|_| ()));
    let text = serde_json::to_string_pretty(&response)?;
    event!(Level::INFO, "sending response");
    println!("{}", text);

    Ok(response.result)
}

/// Default output path, the input path with ".processed" appended.
fn processed_path(path: &Path) -> PathBuf {
    let mut value = path.as_os_str().to_owned();
    value.push(".processed");
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn appends_processed_extension() {
        assert_eq!(
            processed_path(Path::new("data/input.txt")),
            PathBuf::from("data/input.txt.processed")
        );
    }

    #[test]
    fn success_response_names_output() {
        let response = Response::new(Path::new("out.processed"), Ok(()));

        let text = serde_json::to_string(&response).unwrap();
        assert_eq!(text, r#"{"result":true,"message":"Generated out.processed"}"#);
    }

    #[test]
    fn failure_response_includes_cause() {
        let error = ProcessError::Open {
            path: PathBuf::from("in.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        let response = Response::new(Path::new("out"), Err(error));

        assert!(!response.result);
        assert_eq!(
            response.message,
            "failed to open source file in.txt: no such file"
        );
    }

    #[tokio::test]
    async fn processes_into_default_output() {
        let dir = tempdir::TempDir::new("chunkpipe-tools").unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, b"hello").unwrap();

        let processor = crate::start_processor(2);
        let command = ProcessCommand {
            path: path.clone(),
            output: None,
            timeout_ms: None,
        };
        assert!(run(&processor, command).await.unwrap());

        let output = std::fs::read(processed_path(&path)).unwrap();
        assert_eq!(output, b"aGVsbG8=");

        // Running again must not overwrite the output
        let command = ProcessCommand {
            path: path.clone(),
            output: None,
            timeout_ms: None,
        };
        assert!(!run(&processor, command).await.unwrap());
    }
}
