use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{OperationOutcome, ProcessError};

/// Handle to an in-flight processing operation.
///
/// Await the handle to get the outcome, or hand it a sink with `on_complete`. Dropping the handle
/// does not stop the operation, use `cancel` for that.
#[derive(Debug)]
pub struct OperationHandle {
    id: Uuid,
    cancel: CancellationToken,
    receiver: oneshot::Receiver<OperationOutcome>,
}

impl OperationHandle {
    pub(crate) fn new(
        id: Uuid,
        cancel: CancellationToken,
        receiver: oneshot::Receiver<OperationOutcome>,
    ) -> Self {
        Self {
            id,
            cancel,
            receiver,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request cancellation.
    ///
    /// The operation stops before its next read or before writing, and reports
    /// `ProcessError::Cancelled`. Has no effect once the operation has completed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token cancelling this operation, for example for a deadline timer.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Deliver the outcome to `sink` once available.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_complete<F>(self, sink: F)
    where
        F: FnOnce(OperationOutcome) + Send + 'static,
    {
        tokio::spawn(async move {
            let outcome = self.await;
            sink(outcome);
        });
    }
}

impl Future for OperationHandle {
    type Output = OperationOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // The task only goes away without replying if the runtime is shutting down
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(ProcessError::Cancelled)))
    }
}
