#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # CRE Core
//!
//! Local compute resource environment for workflow tickets.
//!
//! ## Overview
//!
//! A workflow scheduler decides *which* tickets are ready; a compute resource
//! environment (CRE) decides *where and how* they run. This crate provides the
//! local CRE: an actor that receives ready tickets from a ticket source and
//! evaluates them concurrently on a fixed-size worker pool, never occupying more
//! than the configured number of workers at once.
//!
//! ## Architecture
//!
//! ```text
//! TicketSource ──TicketReadyMessage──→ LocalCreActor ──submit──→ WorkerPool
//!      ↑                                (validate)                  │
//!      └──────────── TicketExecutionResult ←── ExecutionTask ←──────┘
//! ```
//!
//! The actor itself never blocks on a ticket. It validates the sender and the
//! ticket, wraps them in an [`execution::ExecutionTask`] together with the build
//! directory, the central repository and the working directory, and hands the
//! task to the pool. The task reports its outcome straight back to the source.
//!
//! ## Module Organization
//!
//! - [`actors`] - Actor traits, messages, mailbox loop and the local CRE
//! - [`execution`] - Worker pool, execution tasks and results
//! - [`models`] - Tickets and their readiness state
//! - [`config`] - Configuration loading from files and `CRE_*` variables
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cre_core::actors::{ChannelTicketSource, Handler, LocalCreActor, TicketReadyMessage};
//! use cre_core::execution::{ExecutionContext, TicketExecutor};
//! use cre_core::models::Ticket;
//! use cre_core::CreResult;
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl TicketExecutor for Echo {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     async fn execute(&self, ctx: &ExecutionContext) -> CreResult<serde_json::Value> {
//!         Ok(ctx.ticket.payload().clone())
//!     }
//! }
//!
//! # async fn example() -> CreResult<()> {
//! let actor = LocalCreActor::with_thread_count("/tmp/build", "/tmp/work", 4, Arc::new(Echo))?;
//! let (source, mut results) = ChannelTicketSource::channel("scheduler", 16);
//!
//! let ticket = Arc::new(Ticket::new("align", serde_json::json!({"sample": 1})));
//! actor.handle(TicketReadyMessage::new(Arc::new(source), ticket)).await?;
//!
//! let result = results.recv().await;
//! println!("{result:?}");
//! # Ok(())
//! # }
//! ```

pub mod actors;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod logging;
pub mod models;

pub use actors::{
    ActorId, ChannelTicketSource, ComputeResourceEnvironment, CreActor, CreState, Handler,
    Lifecycle, LocalCreActor, TicketReadyMessage, TicketSource,
};
pub use config::CreConfig;
pub use error::{CreError, CreResult, DirectoryRole};
pub use execution::{ExecutionStatus, TicketExecutionResult, TicketExecutor};
pub use models::{Ticket, TicketState};
