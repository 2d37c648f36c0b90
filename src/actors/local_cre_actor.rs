//! # Local CRE Actor
//!
//! Compute resource environment that evaluates tickets on local hardware.
//!
//! The actor validates its directories at construction, owns a fixed-size
//! [`WorkerPool`], and turns every valid [`TicketReadyMessage`] into an
//! [`ExecutionTask`] submitted to that pool. Message handling never waits for a
//! ticket to finish; results flow back to the ticket source from the worker.
//!
//! ## Lifecycle
//!
//! ```text
//! Constructing ──→ Ready ──→ ShuttingDown ──→ Stopped
//!  (validation)     │ shutdown()    │ pool drained
//!                   └─ handle()     └─ handle() rejected
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::mailbox::{spawn_mailbox, Mailbox};
use super::messages::TicketReadyMessage;
use super::traits::{ActorId, CreActor, Handler, Lifecycle, Message};
use crate::config::{default_thread_count, CreConfig};
use crate::constants::DEFAULT_SHUTDOWN_GRACE_PERIOD_MS;
use crate::error::{CreError, CreResult};
use crate::execution::layout::DirectoryLayout;
use crate::execution::{ExecutionTask, TaskSettings, TicketExecutor, WorkerPool};
use crate::logging::log_ticket_operation;

/// Lifecycle state of a compute resource environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreState {
    Constructing,
    Ready,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for CreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructing => write!(f, "constructing"),
            Self::Ready => write!(f, "ready"),
            Self::ShuttingDown => write!(f, "shutting_down"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

pub struct LocalCreActor {
    actor_id: ActorId,
    layout: DirectoryLayout,
    worker_pool: WorkerPool,
    settings: TaskSettings,
    state: RwLock<CreState>,
}

impl fmt::Debug for LocalCreActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCreActor")
            .field("actor_id", &self.actor_id)
            .field("layout", &self.layout)
            .field("worker_pool", &self.worker_pool)
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish()
    }
}

impl LocalCreActor {
    /// Create an actor with one worker per available hardware thread
    pub fn new(
        build_dir: impl AsRef<Path>,
        work_dir: impl AsRef<Path>,
        executor: Arc<dyn TicketExecutor>,
    ) -> CreResult<Self> {
        Self::with_thread_count(build_dir, work_dir, default_thread_count(), executor)
    }

    /// Create an actor with an explicit worker pool size
    pub fn with_thread_count(
        build_dir: impl AsRef<Path>,
        work_dir: impl AsRef<Path>,
        thread_count: usize,
        executor: Arc<dyn TicketExecutor>,
    ) -> CreResult<Self> {
        let settings = TaskSettings {
            executor,
            timeout: None,
            shutdown_grace_period: Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_PERIOD_MS),
        };
        Self::build(build_dir.as_ref(), work_dir.as_ref(), thread_count, settings)
    }

    /// Create an actor from loaded configuration
    ///
    /// Directories are checked before the thread count, as for
    /// [`LocalCreActor::with_thread_count`].
    pub fn from_config(config: &CreConfig, executor: Arc<dyn TicketExecutor>) -> CreResult<Self> {
        let settings = TaskSettings {
            executor,
            timeout: config.task_timeout(),
            shutdown_grace_period: config.shutdown_grace_period(),
        };
        Self::build(
            &config.build_dir,
            &config.work_dir,
            config.effective_thread_count(),
            settings,
        )
    }

    /// Create an actor from configuration and start its mailbox loop
    ///
    /// The mailbox buffers at most `config.mailbox_capacity` messages. Must be
    /// called from within a tokio runtime.
    pub fn spawn_from_config(
        config: &CreConfig,
        executor: Arc<dyn TicketExecutor>,
    ) -> CreResult<(
        Arc<Self>,
        Mailbox<TicketReadyMessage>,
        JoinHandle<CreResult<()>>,
    )> {
        if config.mailbox_capacity == 0 {
            return Err(CreError::ConfigurationError(
                "mailbox_capacity must be greater than 0".to_string(),
            ));
        }

        let mut actor = Self::from_config(config, executor)?;
        actor.started()?;
        let actor = Arc::new(actor);
        let (mailbox, handle) =
            spawn_mailbox::<_, TicketReadyMessage>(actor.clone(), config.mailbox_capacity);
        Ok((actor, mailbox, handle))
    }

    fn build(
        build_dir: &Path,
        work_dir: &Path,
        thread_count: usize,
        settings: TaskSettings,
    ) -> CreResult<Self> {
        let state = RwLock::new(CreState::Constructing);

        let layout = DirectoryLayout::validate(build_dir, work_dir)?;
        if thread_count < 1 {
            return Err(CreError::InvalidThreadCount(thread_count));
        }
        layout.ensure_central_repo()?;

        let actor_id = ActorId::new();
        let worker_pool = WorkerPool::new(format!("local-cre-{actor_id}"), thread_count)?;
        *state.write() = CreState::Ready;

        debug!(
            actor_id = %actor_id,
            threads = thread_count,
            build_dir = %layout.build_dir().display(),
            work_dir = %layout.work_dir().display(),
            "Local CRE actor created"
        );

        Ok(Self {
            actor_id,
            layout,
            worker_pool,
            settings,
            state,
        })
    }

    pub fn build_dir(&self) -> &Path {
        self.layout.build_dir()
    }

    pub fn work_dir(&self) -> &Path {
        self.layout.work_dir()
    }

    pub fn central_repo(&self) -> &Path {
        self.layout.central_repo()
    }

    pub fn thread_count(&self) -> usize {
        self.worker_pool.size()
    }

    pub fn active_tasks(&self) -> usize {
        self.worker_pool.active_tasks()
    }

    pub fn queued_tasks(&self) -> usize {
        self.worker_pool.queued_tasks()
    }

    /// Current lifecycle state
    ///
    /// A shutting-down actor reports Stopped once its pool has drained.
    pub fn state(&self) -> CreState {
        let current = *self.state.read();
        if current == CreState::ShuttingDown && self.worker_pool.outstanding_tasks() == 0 {
            *self.state.write() = CreState::Stopped;
            return CreState::Stopped;
        }
        current
    }

    /// Wait for dispatched tasks to finish after shutdown
    ///
    /// Tasks still running when `timeout` elapses are aborted and never report
    /// a result. Returns true if the pool drained in time.
    pub async fn await_termination(&self, timeout: Duration) -> bool {
        let drained = self.worker_pool.await_termination(timeout).await;
        if self.is_shut_down() {
            let _ = self.state();
        }
        drained
    }

    fn ensure_accepting(&self) -> CreResult<()> {
        if self.is_shut_down() {
            return Err(CreError::ActorShutDown {
                actor: format!("{}:{}", self.name(), self.actor_id),
            });
        }
        Ok(())
    }
}

impl CreActor for LocalCreActor {
    fn name(&self) -> &'static str {
        "LocalCreActor"
    }

    fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    fn started(&mut self) -> CreResult<()> {
        info!(
            actor = self.name(),
            actor_id = %self.actor_id,
            threads = self.thread_count(),
            "LocalCreActor started"
        );
        Ok(())
    }

    fn stopped(&mut self) -> CreResult<()> {
        self.shutdown();
        info!(actor = self.name(), actor_id = %self.actor_id, "LocalCreActor stopped");
        Ok(())
    }
}

#[async_trait]
impl Handler<TicketReadyMessage> for LocalCreActor {
    async fn handle(
        &self,
        msg: TicketReadyMessage,
    ) -> CreResult<<TicketReadyMessage as Message>::Response> {
        self.ensure_accepting()?;

        let ticket_source = msg
            .sender
            .as_ticket_source()
            .cloned()
            .ok_or_else(|| {
                CreError::ProtocolViolation(format!(
                    "Ticket source actor expected, got {}",
                    msg.sender.describe()
                ))
            })?;

        let ticket = msg.ticket;
        let ticket_id = ticket.ticket_id();

        if !ticket.is_ready() {
            return Err(CreError::TicketNotReady {
                ticket_id,
                state: ticket.state(),
            });
        }

        if ticket.is_evaluated() {
            return Err(CreError::TicketAlreadyEvaluated { ticket_id });
        }

        debug!(
            actor = self.name(),
            ticket_id = %ticket_id,
            source = %ticket_source.source_id(),
            "Handling TicketReadyMessage"
        );

        let ticket_name = ticket.name().to_string();
        let task = ExecutionTask::new(
            ticket_source,
            self.actor_id,
            ticket,
            self.layout.build_dir(),
            self.layout.central_repo(),
            self.layout.work_dir(),
            self.settings.clone(),
        );
        self.worker_pool.submit(Box::new(task))?;

        log_ticket_operation(
            "dispatch",
            self.name(),
            ticket_id,
            &ticket_name,
            "submitted",
            None,
        );

        Ok(())
    }
}

impl Lifecycle for LocalCreActor {
    fn shutdown(&self) {
        {
            let mut state = self.state.write();
            if matches!(*state, CreState::ShuttingDown | CreState::Stopped) {
                return;
            }
            *state = CreState::ShuttingDown;
        }

        info!(
            actor = self.name(),
            actor_id = %self.actor_id,
            active = self.active_tasks(),
            queued = self.queued_tasks(),
            "LocalCreActor shutting down"
        );
        self.worker_pool.shutdown();
    }

    fn is_shut_down(&self) -> bool {
        self.worker_pool.is_shut_down()
    }
}
