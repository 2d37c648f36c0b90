//! # Ticket Source
//!
//! The upstream component that certifies tickets as ready and receives their
//! execution results. Compute resource environments only see it through the
//! [`TicketSource`] capability.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::execution::TicketExecutionResult;

/// Capability of an actor that emits ready tickets and consumes their results
#[async_trait]
pub trait TicketSource: Send + Sync + 'static {
    /// Identifier used in logs
    fn source_id(&self) -> &str;

    /// Receive the outcome of a dispatched ticket
    ///
    /// Called from worker tasks, possibly concurrently and in any order.
    async fn ticket_finished(&self, result: TicketExecutionResult);
}

/// Ticket source that forwards results into a bounded channel
///
/// Useful for schedulers that run their own event loop and for tests.
pub struct ChannelTicketSource {
    source_id: String,
    sender: mpsc::Sender<TicketExecutionResult>,
}

impl fmt::Debug for ChannelTicketSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelTicketSource")
            .field("source_id", &self.source_id)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl ChannelTicketSource {
    pub fn new(source_id: impl Into<String>, sender: mpsc::Sender<TicketExecutionResult>) -> Self {
        Self {
            source_id: source_id.into(),
            sender,
        }
    }

    /// Create a source together with the receiving end of its result channel
    pub fn channel(
        source_id: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<TicketExecutionResult>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(source_id, sender), receiver)
    }
}

#[async_trait]
impl TicketSource for ChannelTicketSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn ticket_finished(&self, result: TicketExecutionResult) {
        let ticket_id = result.ticket_id;
        let status = result.status;
        match self.sender.send(result).await {
            Ok(()) => debug!(
                source_id = %self.source_id,
                ticket_id = %ticket_id,
                status = %status,
                "Ticket result delivered"
            ),
            Err(_) => warn!(
                source_id = %self.source_id,
                ticket_id = %ticket_id,
                status = %status,
                "Ticket result dropped - result channel closed"
            ),
        }
    }
}
