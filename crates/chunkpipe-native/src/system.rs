use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Error;
use chunkpipe::{
    actor::{self, Actor, After},
    protocol::{ExistsResult, FsAction, FsMessage, FsSender, OpenResult, WriteResult},
};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::{event, instrument, Instrument, Level};
use uuid::Uuid;

use crate::open_system_file;

/// Start the native file system actor.
///
/// Must be called from within a tokio runtime.
#[instrument("start_system_fs", skip_all)]
pub fn start_system_fs() -> FsSender {
    event!(Level::DEBUG, "starting");

    actor::start("system-fs", SystemFs)
}

struct SystemFs;

impl Actor for SystemFs {
    type Message = FsMessage;

    async fn process(&mut self, message: FsMessage) -> Result<After, Error> {
        // Every request gets its own task, so a large write doesn't hold up other operations
        let task = async move {
            match message.action {
                FsAction::Open(action) => {
                    let result = open_system_file(&action.path).await;
                    let _ = action.on_result.send(OpenResult {
                        id: message.id,
                        result,
                    });
                }
                FsAction::Exists(action) => {
                    let result = tokio::fs::try_exists(&action.path).await;
                    let _ = action.on_result.send(ExistsResult {
                        id: message.id,
                        result,
                    });
                }
                FsAction::Write(action) => {
                    event!(
                        Level::DEBUG,
                        path = %action.path.display(),
                        bytes = action.data.len(),
                        "writing"
                    );

                    let result = write_new(&action.path, &action.data).await;
                    let _ = action.on_result.send(WriteResult {
                        id: message.id,
                        result,
                    });
                }
            }
        };
        tokio::spawn(task.in_current_span());

        Ok(After::Continue)
    }
}

/// Write `data` to a new file at `path` as a single atomic operation.
///
/// The data is written and synced to a temporary file next to `path`, then hard linked into
/// place. Linking fails with `ErrorKind::AlreadyExists` if `path` is taken, so an existing file
/// is never replaced and readers never see a partial file.
async fn write_new(path: &Path, data: &[u8]) -> Result<u64, std::io::Error> {
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(ErrorKind::InvalidInput, "destination has no file name")
    })?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
        _ => PathBuf::from("."),
    };
    let temp_path = directory.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    let result = write_and_link(&temp_path, path, data).await;

    // The temporary name was only for staging, remove it whatever happened
    if let Err(error) = tokio::fs::remove_file(&temp_path).await {
        if error.kind() != ErrorKind::NotFound {
            event!(Level::WARN, ?error, "failed to remove temporary file");
        }
    }

    result.map(|_| data.len() as u64)
}

async fn write_and_link(temp_path: &Path, path: &Path, data: &[u8]) -> Result<(), std::io::Error> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .await?;

    file.write_all(data).await?;
    file.flush().await?;
    file.sync_data().await?;
    drop(file);

    tokio::fs::hard_link(temp_path, path).await
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn write_new_creates_file_without_leftovers() {
        let dir = TempDir::new("chunkpipe").unwrap();
        let path = dir.path().join("out.txt");

        let written = write_new(&path, b"some data").await.unwrap();

        assert_eq!(written, 9);
        assert_eq!(std::fs::read(&path).unwrap(), b"some data");
        assert_eq!(dir_entries(dir.path()), vec!["out.txt".to_string()]);
    }

    #[tokio::test]
    async fn write_new_refuses_existing_file() {
        let dir = TempDir::new("chunkpipe").unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, b"original").unwrap();

        let error = write_new(&path, b"replacement").await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
        assert_eq!(dir_entries(dir.path()), vec!["out.txt".to_string()]);
    }

    #[tokio::test]
    async fn write_new_fails_in_missing_directory() {
        let dir = TempDir::new("chunkpipe").unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let error = write_new(&path, b"data").await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NotFound);
    }
}
