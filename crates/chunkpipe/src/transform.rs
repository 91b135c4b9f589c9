use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::task;

use crate::{BoxError, ProcessError};

type TransformFn = dyn Fn(Vec<u8>) -> Result<Vec<u8>, BoxError> + Send + Sync;

/// Function applied once to the full content of a source file.
#[derive(Clone)]
pub struct Transform {
    inner: Arc<TransformFn>,
}

impl Transform {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Vec<u8>) -> Result<Vec<u8>, BoxError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Encode the content as standard padded base64 text.
    pub fn base64() -> Self {
        Self::new(|data| Ok(STANDARD.encode(data).into_bytes()))
    }

    /// Apply the transform, a panic inside the function is reported like a returned error.
    pub fn apply(&self, data: Vec<u8>) -> Result<Vec<u8>, ProcessError> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.inner)(data))) {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(source)) => Err(ProcessError::Transform { source }),
            Err(payload) => Err(ProcessError::Transform {
                source: panic_message(payload).into(),
            }),
        }
    }

    /// Apply the transform on the blocking thread pool, so a slow transform doesn't hold up
    /// other tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn apply_blocking(&self, data: Vec<u8>) -> Result<Vec<u8>, ProcessError> {
        let transform = self.clone();

        match task::spawn_blocking(move || transform.apply(data)).await {
            Ok(result) => result,
            Err(error) => {
                let source = match error.try_into_panic() {
                    Ok(payload) => panic_message(payload).into(),
                    Err(error) => error.into(),
                };
                Err(ProcessError::Transform { source })
            }
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform").finish_non_exhaustive()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    };

    format!("transform panicked: {}", detail)
}
