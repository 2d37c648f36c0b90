//! # Actor Mailbox
//!
//! The shared message loop that drives any actor implementing [`Handler<M>`]
//! and [`Lifecycle`]. Messages are handled strictly one at a time in arrival
//! order.
//!
//! ## Failure Semantics
//!
//! A handler error is fatal. The loop logs it, shuts the actor down, answers a
//! pending `ask` with the error and exits with that error in its join handle.
//! Messages still queued behind the failing one are dropped with the channel.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::traits::{Handler, Lifecycle, Message};
use crate::error::{CreError, CreResult};

enum Envelope<M: Message> {
    Tell(M),
    Ask(M, oneshot::Sender<CreResult<M::Response>>),
    Shutdown,
}

/// Sending half of an actor's mailbox
pub struct Mailbox<M: Message> {
    actor_name: &'static str,
    sender: mpsc::Sender<Envelope<M>>,
}

impl<M: Message> Clone for Mailbox<M> {
    fn clone(&self) -> Self {
        Self {
            actor_name: self.actor_name,
            sender: self.sender.clone(),
        }
    }
}

impl<M: Message> fmt::Debug for Mailbox<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("actor_name", &self.actor_name)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl<M: Message> Mailbox<M> {
    fn closed(&self) -> CreError {
        CreError::MailboxClosed(format!("{} is no longer processing messages", self.actor_name))
    }

    /// Enqueue a message without waiting for it to be handled
    pub async fn tell(&self, msg: M) -> CreResult<()> {
        self.sender
            .send(Envelope::Tell(msg))
            .await
            .map_err(|_| self.closed())
    }

    /// Enqueue a message and wait for the handler's response
    pub async fn ask(&self, msg: M) -> CreResult<M::Response> {
        let (reply_sender, reply_receiver) = oneshot::channel();
        self.sender
            .send(Envelope::Ask(msg, reply_sender))
            .await
            .map_err(|_| self.closed())?;
        reply_receiver.await.map_err(|_| self.closed())?
    }

    /// Ask the loop to shut the actor down after earlier messages
    ///
    /// A no-op if the loop has already stopped.
    pub async fn shutdown(&self) {
        if self.sender.send(Envelope::Shutdown).await.is_err() {
            debug!(actor = self.actor_name, "Mailbox already closed at shutdown");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Maximum number of messages buffered ahead of the actor
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

/// Start the message loop for `actor` on the current tokio runtime
pub fn spawn_mailbox<A, M>(actor: Arc<A>, capacity: usize) -> (Mailbox<M>, JoinHandle<CreResult<()>>)
where
    A: Handler<M> + Lifecycle,
    M: Message,
{
    let (sender, receiver) = mpsc::channel(capacity);
    let mailbox = Mailbox {
        actor_name: actor.name(),
        sender,
    };
    let handle = tokio::spawn(run_mailbox(actor, receiver));
    (mailbox, handle)
}

async fn run_mailbox<A, M>(actor: Arc<A>, mut receiver: mpsc::Receiver<Envelope<M>>) -> CreResult<()>
where
    A: Handler<M> + Lifecycle,
    M: Message,
{
    info!(actor = actor.name(), actor_id = %actor.actor_id(), "Mailbox started");

    while let Some(envelope) = receiver.recv().await {
        match envelope {
            Envelope::Tell(msg) => {
                if let Err(e) = actor.handle(msg).await {
                    return Err(fail(actor.as_ref(), e));
                }
            }
            Envelope::Ask(msg, reply) => match actor.handle(msg).await {
                Ok(response) => {
                    let _ = reply.send(Ok(response));
                }
                Err(e) => {
                    let e = fail(actor.as_ref(), e);
                    let _ = reply.send(Err(e.clone()));
                    return Err(e);
                }
            },
            Envelope::Shutdown => {
                info!(actor = actor.name(), "Mailbox received shutdown");
                actor.shutdown();
                return Ok(());
            }
        }
    }

    info!(actor = actor.name(), "Mailbox stopped - all senders dropped");
    actor.shutdown();
    Ok(())
}

fn fail<A: Lifecycle>(actor: &A, error: CreError) -> CreError {
    error!(
        actor = actor.name(),
        actor_id = %actor.actor_id(),
        error = %error,
        protocol_violation = error.is_protocol_violation(),
        "Fatal error while handling message - stopping actor"
    );
    actor.shutdown();
    error
}
