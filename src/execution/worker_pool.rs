//! # Worker Pool
//!
//! Bounded parallelism for ticket execution.
//!
//! Submissions enter a single FIFO queue drained by one dispatcher task. The
//! dispatcher waits for one of `size` semaphore permits before spawning the
//! next job with that permit, so jobs start in submission order and at most
//! `size` run at any instant.
//!
//! ## Shutdown
//!
//! ```text
//! shutdown() ──→ semaphore closed + queue closed ──→ queued jobs: PoolJob::discarded()
//!            └─→ ShutdownSignal raised ──→ running jobs observe it cooperatively
//! await_termination(timeout) ──→ abort whatever is still running at the deadline
//! ```
//!
//! Dropping the pool shuts it down the same way; spawned jobs are detached and
//! still report.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Notify, Semaphore};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::error::{CreError, CreResult};

/// Cooperative interruption flag handed to running jobs
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown has been requested
    ///
    /// Also resolves if the owning pool is dropped.
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

/// A unit of work accepted by the pool
#[async_trait]
pub trait PoolJob: Send + 'static {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Execute the job once a permit is available
    async fn run(self: Box<Self>, signal: ShutdownSignal);

    /// Called instead of `run` when the pool shut down before the job started
    async fn discarded(self: Box<Self>);
}

#[derive(Debug, Default)]
struct PoolCounters {
    queued: AtomicUsize,
    active: AtomicUsize,
    idle: Notify,
}

impl PoolCounters {
    fn outstanding(&self) -> usize {
        self.queued.load(Ordering::SeqCst) + self.active.load(Ordering::SeqCst)
    }
}

/// Tracks one job's slot in the counters; released on drop, including abort
struct SlotGuard {
    counters: Arc<PoolCounters>,
    started: bool,
}

impl SlotGuard {
    fn queued(counters: Arc<PoolCounters>) -> Self {
        counters.queued.fetch_add(1, Ordering::SeqCst);
        Self {
            counters,
            started: false,
        }
    }

    fn start(&mut self) {
        self.counters.active.fetch_add(1, Ordering::SeqCst);
        self.counters.queued.fetch_sub(1, Ordering::SeqCst);
        self.started = true;
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.started {
            self.counters.active.fetch_sub(1, Ordering::SeqCst);
        } else {
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
        }
        if self.counters.outstanding() == 0 {
            self.counters.idle.notify_waiters();
        }
    }
}

struct QueuedJob {
    job: Box<dyn PoolJob>,
    slot: SlotGuard,
}

/// Abort handles of every job task the dispatcher has spawned
type TaskHandles = Arc<Mutex<Vec<AbortHandle>>>;

fn spawn_tracked<F>(tasks: &TaskHandles, future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(future);
    let mut tasks = tasks.lock();
    tasks.retain(|task| !task.is_finished());
    tasks.push(handle.abort_handle());
}

/// Drains the submission queue in order, one permit per started job
struct Dispatcher {
    pool_id: String,
    semaphore: Arc<Semaphore>,
    signal: ShutdownSignal,
    tasks: TaskHandles,
    receiver: mpsc::UnboundedReceiver<QueuedJob>,
}

impl Dispatcher {
    async fn run(mut self) {
        debug!(pool_id = %self.pool_id, "Worker pool dispatcher started");

        while let Some(QueuedJob { job, mut slot }) = self.receiver.recv().await {
            match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => {
                    slot.start();
                    debug!(pool_id = %self.pool_id, job = %job.describe(), "Job started");
                    let signal = self.signal.clone();
                    spawn_tracked(&self.tasks, async move {
                        job.run(signal).await;
                        drop(permit);
                        drop(slot);
                    });
                }
                Err(_) => {
                    debug!(pool_id = %self.pool_id, job = %job.describe(), "Job discarded - pool shut down before start");
                    spawn_tracked(&self.tasks, async move {
                        job.discarded().await;
                        drop(slot);
                    });
                }
            }
        }

        debug!(pool_id = %self.pool_id, "Worker pool dispatcher stopped");
    }
}

/// Fixed-size pool of execution slots
///
/// Owned exclusively by one compute resource environment.
pub struct WorkerPool {
    pool_id: String,
    size: usize,
    semaphore: Arc<Semaphore>,
    shutdown_sender: watch::Sender<bool>,
    queue: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
    dispatcher: Mutex<Option<Dispatcher>>,
    tasks: TaskHandles,
    counters: Arc<PoolCounters>,
    shut_down: AtomicBool,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("pool_id", &self.pool_id)
            .field("size", &self.size)
            .field("active", &self.active_tasks())
            .field("queued", &self.queued_tasks())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool with `size` execution slots
    ///
    /// Does not require a running tokio runtime; the dispatcher is spawned on
    /// the runtime current at the first submission.
    pub fn new(pool_id: impl Into<String>, size: usize) -> CreResult<Self> {
        if size == 0 {
            return Err(CreError::InvalidThreadCount(size));
        }
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let (queue, receiver) = mpsc::unbounded_channel();
        let pool_id = pool_id.into();
        let semaphore = Arc::new(Semaphore::new(size));
        let tasks = TaskHandles::default();

        let dispatcher = Dispatcher {
            pool_id: pool_id.clone(),
            semaphore: semaphore.clone(),
            signal: ShutdownSignal {
                receiver: shutdown_receiver,
            },
            tasks: tasks.clone(),
            receiver,
        };

        debug!(pool_id = %pool_id, size = size, "Worker pool created");

        Ok(Self {
            pool_id,
            size,
            semaphore,
            shutdown_sender,
            queue: Mutex::new(Some(queue)),
            dispatcher: Mutex::new(Some(dispatcher)),
            tasks,
            counters: Arc::new(PoolCounters::default()),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn active_tasks(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn queued_tasks(&self) -> usize {
        self.counters.queued.load(Ordering::SeqCst)
    }

    pub fn outstanding_tasks(&self) -> usize {
        self.counters.outstanding()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.shutdown_sender.subscribe(),
        }
    }

    /// Queue a job without waiting for it to start or finish
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, job: Box<dyn PoolJob>) -> CreResult<()> {
        if self.is_shut_down() {
            return Err(self.closed_error());
        }

        if let Some(dispatcher) = self.dispatcher.lock().take() {
            tokio::spawn(dispatcher.run());
        }

        let queued = QueuedJob {
            job,
            slot: SlotGuard::queued(self.counters.clone()),
        };

        // The queue is closed by shutdown(); a job that loses that race is
        // dropped here and its slot released.
        match self.queue.lock().as_ref() {
            Some(queue) => queue.send(queued).map_err(|_| self.closed_error()),
            None => Err(self.closed_error()),
        }
    }

    /// Discard queued jobs and signal running jobs to stop
    ///
    /// Idempotent and non-blocking.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.semaphore.close();
        self.queue.lock().take();
        self.shutdown_sender.send_replace(true);

        info!(
            pool_id = %self.pool_id,
            active = self.active_tasks(),
            queued = self.queued_tasks(),
            "Worker pool shutting down"
        );
    }

    /// Abort every job task the pool has spawned
    pub fn abort_all(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    /// Wait until no job is queued or running
    ///
    /// Returns false if the timeout elapsed first; remaining tasks are then
    /// aborted.
    pub async fn await_termination(&self, timeout: Duration) -> bool {
        let drained = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.counters.idle.notified();
                if self.outstanding_tasks() == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok();

        if !drained {
            warn!(
                pool_id = %self.pool_id,
                outstanding = self.outstanding_tasks(),
                timeout_ms = timeout.as_millis() as u64,
                "Worker pool did not drain in time - aborting remaining tasks"
            );
            self.abort_all();
        }
        drained
    }

    fn closed_error(&self) -> CreError {
        CreError::ActorShutDown {
            actor: self.pool_id.clone(),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
