//! # Execution Task
//!
//! The per-ticket unit of work submitted to the worker pool. A task is bound to
//! the ticket source that certified the ticket, the identity of the dispatching
//! environment, the ticket itself and the three directories of the layout.
//!
//! The work itself is delegated to a [`TicketExecutor`]. The task turns every
//! outcome into a [`TicketExecutionResult`] for the ticket source:
//!
//! | Outcome | Status | error_type |
//! |---------|--------|------------|
//! | executor returned output | Completed | - |
//! | executor returned an error | Failed | `executor_error` |
//! | executor panicked | Failed | `executor_panic` |
//! | task timeout elapsed | Failed | `executor_timeout` |
//! | shutdown + grace period elapsed | Cancelled | `cancelled` |
//! | shut down before start | Cancelled | `discarded` |

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, error, warn};

use super::layout;
use super::result::TicketExecutionResult;
use super::worker_pool::{PoolJob, ShutdownSignal};
use crate::actors::{ActorId, TicketSource};
use crate::constants::error_types;
use crate::error::CreResult;
use crate::logging::log_ticket_operation;
use crate::models::Ticket;

/// The execution logic run for each ticket
///
/// Implementations run on the tokio runtime; blocking work belongs in
/// `tokio::task::spawn_blocking`. Long-running executors should watch
/// [`ExecutionContext::signal`] and return early once it is triggered.
#[async_trait]
pub trait TicketExecutor: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn execute(&self, ctx: &ExecutionContext) -> CreResult<serde_json::Value>;
}

/// Everything an executor may touch while evaluating one ticket
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub ticket: Arc<Ticket>,
    pub cre_id: ActorId,
    pub build_dir: PathBuf,
    /// Shared across all concurrently running tickets, without locking
    pub central_repo: PathBuf,
    pub work_dir: PathBuf,
    /// Scratch directory owned by this ticket
    pub ticket_dir: PathBuf,
    pub signal: ShutdownSignal,
}

/// Execution parameters shared by all tasks of one environment
#[derive(Clone)]
pub struct TaskSettings {
    pub executor: Arc<dyn TicketExecutor>,
    pub timeout: Option<Duration>,
    pub shutdown_grace_period: Duration,
}

impl fmt::Debug for TaskSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSettings")
            .field("executor", &self.executor.name())
            .field("timeout", &self.timeout)
            .field("shutdown_grace_period", &self.shutdown_grace_period)
            .finish()
    }
}

pub struct ExecutionTask {
    ticket_source: Arc<dyn TicketSource>,
    cre_id: ActorId,
    ticket: Arc<Ticket>,
    build_dir: PathBuf,
    central_repo: PathBuf,
    work_dir: PathBuf,
    settings: TaskSettings,
}

impl fmt::Debug for ExecutionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionTask")
            .field("ticket_source", &self.ticket_source.source_id())
            .field("cre_id", &self.cre_id)
            .field("ticket_id", &self.ticket.ticket_id())
            .field("build_dir", &self.build_dir)
            .field("central_repo", &self.central_repo)
            .field("work_dir", &self.work_dir)
            .field("settings", &self.settings)
            .finish()
    }
}

impl ExecutionTask {
    pub fn new(
        ticket_source: Arc<dyn TicketSource>,
        cre_id: ActorId,
        ticket: Arc<Ticket>,
        build_dir: &Path,
        central_repo: &Path,
        work_dir: &Path,
        settings: TaskSettings,
    ) -> Self {
        Self {
            ticket_source,
            cre_id,
            ticket,
            build_dir: build_dir.to_path_buf(),
            central_repo: central_repo.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            settings,
        }
    }

    pub fn ticket(&self) -> &Arc<Ticket> {
        &self.ticket
    }

    pub fn cre_id(&self) -> ActorId {
        self.cre_id
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn central_repo(&self) -> &Path {
        &self.central_repo
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Run the executor and convert its outcome into a result
    pub async fn execute(&self, signal: ShutdownSignal) -> TicketExecutionResult {
        let start = Instant::now();
        let ticket_id = self.ticket.ticket_id();
        let elapsed_ms = |start: Instant| start.elapsed().as_millis() as i64;

        let ticket_dir = layout::ticket_dir(&self.build_dir, ticket_id);
        if let Err(e) = tokio::fs::create_dir_all(&ticket_dir).await {
            error!(
                ticket_id = %ticket_id,
                path = %ticket_dir.display(),
                error = %e,
                "Failed to create ticket directory"
            );
            return TicketExecutionResult::failure(
                ticket_id,
                self.cre_id,
                format!("Failed to create ticket directory {}: {e}", ticket_dir.display()),
                error_types::SCRATCH_DIR_FAILED,
                elapsed_ms(start),
            );
        }

        let ctx = ExecutionContext {
            ticket: self.ticket.clone(),
            cre_id: self.cre_id,
            build_dir: self.build_dir().to_path_buf(),
            central_repo: self.central_repo().to_path_buf(),
            work_dir: self.work_dir().to_path_buf(),
            ticket_dir,
            signal: signal.clone(),
        };

        let executor = self.settings.executor.clone();
        let executor_name = executor.name().to_string();
        let timeout = self.settings.timeout;
        let grace = self.settings.shutdown_grace_period;

        debug!(
            ticket_id = %ticket_id,
            executor = %executor_name,
            "Invoking ticket executor"
        );

        let execution = AssertUnwindSafe(executor.execute(&ctx)).catch_unwind();
        let bounded = async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, execution).await,
                None => Ok(execution.await),
            }
        };
        let interrupted = async {
            signal.triggered().await;
            tokio::time::sleep(grace).await;
        };

        let outcome = tokio::select! {
            outcome = bounded => Some(outcome),
            _ = interrupted => None,
        };

        match outcome {
            Some(Ok(Ok(Ok(output)))) => {
                self.ticket.mark_evaluated();
                TicketExecutionResult::success(ticket_id, self.cre_id, output, elapsed_ms(start))
            }
            Some(Ok(Ok(Err(_)))) | None if signal.is_triggered() => {
                warn!(
                    ticket_id = %ticket_id,
                    executor = %executor_name,
                    "Ticket execution interrupted by shutdown"
                );
                TicketExecutionResult::cancelled(
                    ticket_id,
                    self.cre_id,
                    "Ticket execution interrupted by shutdown",
                    error_types::CANCELLED,
                    elapsed_ms(start),
                )
            }
            Some(Ok(Ok(Err(executor_error)))) => {
                error!(
                    ticket_id = %ticket_id,
                    executor = %executor_name,
                    error = %executor_error,
                    "Executor returned error"
                );
                TicketExecutionResult::failure(
                    ticket_id,
                    self.cre_id,
                    executor_error.to_string(),
                    error_types::EXECUTOR_ERROR,
                    elapsed_ms(start),
                )
            }
            Some(Ok(Err(panic_error))) => {
                let panic_msg = if let Some(s) = panic_error.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_error.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!(
                    ticket_id = %ticket_id,
                    executor = %executor_name,
                    panic_msg = %panic_msg,
                    "Executor panicked"
                );
                TicketExecutionResult::failure(
                    ticket_id,
                    self.cre_id,
                    format!("Executor panicked: {panic_msg}"),
                    error_types::EXECUTOR_PANIC,
                    elapsed_ms(start),
                )
            }
            Some(Err(_elapsed)) => {
                let limit_ms = timeout.map(|t| t.as_millis()).unwrap_or_default();
                error!(
                    ticket_id = %ticket_id,
                    executor = %executor_name,
                    timeout_ms = limit_ms as u64,
                    "Executor timed out"
                );
                TicketExecutionResult::failure(
                    ticket_id,
                    self.cre_id,
                    format!("Executor timed out after {limit_ms}ms"),
                    error_types::EXECUTOR_TIMEOUT,
                    elapsed_ms(start),
                )
            }
            None => TicketExecutionResult::cancelled(
                ticket_id,
                self.cre_id,
                "Ticket execution abandoned after shutdown grace period",
                error_types::CANCELLED,
                elapsed_ms(start),
            ),
        }
    }

    async fn report(&self, result: TicketExecutionResult) {
        log_ticket_operation(
            "finish",
            self.ticket_source.source_id(),
            self.ticket.ticket_id(),
            self.ticket.name(),
            &result.status.to_string(),
            result.error.as_ref().map(|e| e.message.as_str()),
        );
        self.ticket_source.ticket_finished(result).await;
    }
}

#[async_trait]
impl PoolJob for ExecutionTask {
    fn describe(&self) -> String {
        format!("ticket:{}:{}", self.ticket.name(), self.ticket.ticket_id())
    }

    async fn run(self: Box<Self>, signal: ShutdownSignal) {
        let result = self.execute(signal).await;
        self.report(result).await;
    }

    async fn discarded(self: Box<Self>) {
        let result = TicketExecutionResult::cancelled(
            self.ticket.ticket_id(),
            self.cre_id,
            "Ticket discarded before execution started",
            error_types::DISCARDED,
            0,
        );
        self.report(result).await;
    }
}
