//! # Execution
//!
//! Worker pool, execution tasks and the filesystem layout they operate on.

pub(crate) mod layout;
pub mod result;
pub mod task;
pub mod worker_pool;

pub use result::{ExecutionStatus, TicketError, TicketExecutionResult};
pub use task::{ExecutionContext, ExecutionTask, TaskSettings, TicketExecutor};
pub use worker_pool::{PoolJob, ShutdownSignal, WorkerPool};
