//! # Core Actor Traits
//!
//! Foundational traits for the lightweight actor pattern used by compute resource
//! environments. Actors are plain structs; a shared mailbox loop
//! (see [`super::mailbox`]) drives them by composition.
//!
//! ## Architecture
//!
//! ```text
//! TicketSource ──→ Mailbox<M> ──→ Handler<M>::handle ──→ WorkerPool
//!                      │
//!                      └──→ Lifecycle::shutdown
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::messages::TicketReadyMessage;
use crate::error::CreResult;

/// Stable identity of an actor instance
///
/// Execution tasks carry the identity of the environment that dispatched them so
/// results can be attributed when several environments share one ticket source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Base trait for all actors
///
/// ## Lifecycle
///
/// - `started()`: called once the actor is fully constructed (default: no-op)
/// - `stopped()`: called when the owner tears the actor down (default: no-op)
pub trait CreActor: Send + Sync + 'static {
    /// Actor name for logging
    fn name(&self) -> &'static str;

    /// Identity of this actor instance
    fn actor_id(&self) -> ActorId;

    /// Called when the actor is started (optional)
    ///
    /// # Errors
    ///
    /// Return an error if startup fails; the owner must not use the actor.
    fn started(&mut self) -> CreResult<()> {
        Ok(())
    }

    /// Called when the actor is being stopped (optional)
    ///
    /// # Errors
    ///
    /// Errors are logged by the owner but do not prevent teardown.
    fn stopped(&mut self) -> CreResult<()> {
        Ok(())
    }
}

/// Marker trait for messages
///
/// Defines the response type produced by the handler and ensures messages can
/// cross task boundaries.
pub trait Message: Send + 'static {
    /// The response type for this message
    type Response: Send + 'static;
}

/// Message handler trait for specific message types
///
/// Any error returned here is fatal for the actor: the mailbox stops the actor
/// rather than dropping or retrying the message.
#[async_trait]
pub trait Handler<M: Message>: CreActor {
    async fn handle(&self, msg: M) -> CreResult<M::Response>;
}

/// Shutdown control for actors that own resources
pub trait Lifecycle: CreActor {
    /// Request immediate, best-effort termination
    ///
    /// Must be idempotent and must not block on in-flight work.
    fn shutdown(&self);

    /// Whether `shutdown` has been requested
    fn is_shut_down(&self) -> bool;
}

/// Capability of a compute resource environment: accept ready tickets, shut down
///
/// Implemented by every dispatch variant; any type providing both halves gets it
/// automatically.
pub trait ComputeResourceEnvironment: Handler<TicketReadyMessage> + Lifecycle {}

impl<T> ComputeResourceEnvironment for T where T: Handler<TicketReadyMessage> + Lifecycle {}
