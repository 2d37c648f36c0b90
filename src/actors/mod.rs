//! # Actors
//!
//! Message-driven compute resource environments and the ticket sources that
//! feed them.
//!
//! [`LocalCreActor`] is the local implementation: it accepts
//! [`TicketReadyMessage`]s from a [`TicketSource`], dispatches each ready
//! ticket to a bounded worker pool and reports every outcome back to the
//! source. [`spawn_mailbox`] drives any actor through a sequential message loop.

pub mod local_cre_actor;
pub mod mailbox;
pub mod messages;
pub mod ticket_source;
pub mod traits;

pub use local_cre_actor::{CreState, LocalCreActor};
pub use mailbox::{spawn_mailbox, Mailbox};
pub use messages::{SenderRef, TicketReadyMessage};
pub use ticket_source::{ChannelTicketSource, TicketSource};
pub use traits::{ActorId, ComputeResourceEnvironment, CreActor, Handler, Lifecycle, Message};
