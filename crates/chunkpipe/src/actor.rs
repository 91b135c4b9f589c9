//! Minimal actor runtime on top of tokio tasks.
//!
//! An actor owns its state exclusively, and processes the messages in its mailbox one at a time.
//! Replies are sent back through one-shot senders carried in the messages.

use std::future::Future;

use anyhow::Error;
use tokio::sync::mpsc;
use tracing::{event, info_span, Instrument, Level};

/// What an actor does after processing a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum After {
    Continue,
    Stop,
}

pub trait Actor: Send + 'static {
    type Message: Send + 'static;

    fn process(
        &mut self,
        message: Self::Message,
    ) -> impl Future<Output = Result<After, Error>> + Send;
}

/// Start an actor on its own task, returning its mailbox.
///
/// The actor stops when it asks to, when processing fails, or when every sender has been dropped.
/// Its state is dropped when it stops.
///
/// Must be called from within a tokio runtime.
pub fn start<A: Actor>(name: &'static str, actor: A) -> mpsc::UnboundedSender<A::Message> {
    let (sender, receiver) = mpsc::unbounded_channel();
    tokio::spawn(run(actor, receiver).instrument(info_span!("actor", name)));
    sender
}

async fn run<A: Actor>(mut actor: A, mut receiver: mpsc::UnboundedReceiver<A::Message>) {
    while let Some(message) = receiver.recv().await {
        match actor.process(message).await {
            Ok(After::Continue) => {}
            Ok(After::Stop) => break,
            Err(error) => {
                event!(Level::ERROR, "actor failed:\n{:?}", error);
                break;
            }
        }
    }

    event!(Level::DEBUG, "stopped");
}
