//! # Actor Messages
//!
//! Message types consumed by compute resource environments. Each message type
//! implements [`Message`] with an associated response type.

use std::fmt;
use std::sync::Arc;

use super::traits::{ActorId, Message};
use super::ticket_source::TicketSource;
use crate::models::Ticket;

/// Reference to the actor that sent a message
///
/// Ticket sources are carried as a typed capability, so a handler never has to
/// inspect the sender's concrete type. Relays that forward messages on behalf of
/// other actors use [`SenderRef::Actor`].
#[derive(Clone)]
pub enum SenderRef {
    TicketSource(Arc<dyn TicketSource>),
    Actor { name: String, actor_id: ActorId },
}

impl SenderRef {
    /// The ticket source capability, if this sender has it
    pub fn as_ticket_source(&self) -> Option<&Arc<dyn TicketSource>> {
        match self {
            Self::TicketSource(source) => Some(source),
            Self::Actor { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::TicketSource(source) => format!("ticket_source:{}", source.source_id()),
            Self::Actor { name, actor_id } => format!("actor:{name}:{actor_id}"),
        }
    }
}

impl fmt::Debug for SenderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SenderRef").field(&self.describe()).finish()
    }
}

/// A ticket certified as ready, to be evaluated by the receiving environment
#[derive(Debug, Clone)]
pub struct TicketReadyMessage {
    pub sender: SenderRef,
    pub ticket: Arc<Ticket>,
}

impl TicketReadyMessage {
    pub fn new(source: Arc<dyn TicketSource>, ticket: Arc<Ticket>) -> Self {
        Self {
            sender: SenderRef::TicketSource(source),
            ticket,
        }
    }

    pub fn with_sender(sender: SenderRef, ticket: Arc<Ticket>) -> Self {
        Self { sender, ticket }
    }
}

impl Message for TicketReadyMessage {
    type Response = ();
}
