//! Ticket executors with observable behavior

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cre_core::execution::{ExecutionContext, TicketExecutor};
use cre_core::{CreError, CreResult};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;

/// Sleeps for a fixed time and records how many tickets ran at once
pub struct TrackingExecutor {
    work_time: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
    executed: Mutex<Vec<Uuid>>,
}

impl TrackingExecutor {
    pub fn new(work_time: Duration) -> Self {
        Self {
            work_time,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<Uuid> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl TicketExecutor for TrackingExecutor {
    fn name(&self) -> &str {
        "tracking"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> CreResult<serde_json::Value> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.work_time).await;
        let marker = ctx.ticket_dir.join("done");
        let written = tokio::fs::write(&marker, ctx.ticket.name()).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        written.map_err(|e| CreError::ExecutionError(e.to_string()))?;

        self.executed.lock().push(ctx.ticket.ticket_id());
        Ok(json!({
            "ticket": ctx.ticket.name(),
            "central_repo_exists": ctx.central_repo.is_dir(),
        }))
    }
}

/// Blocks every ticket until the test opens the gate
///
/// Tickets also stop early with an error when the shutdown signal fires.
pub struct GatedExecutor {
    gate: Semaphore,
    started: AtomicUsize,
    started_notify: Notify,
}

impl GatedExecutor {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            started: AtomicUsize::new(0),
            started_notify: Notify::new(),
        }
    }

    pub fn open(&self, tickets: usize) {
        self.gate.add_permits(tickets);
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` tickets have entered the executor
    pub async fn wait_started(&self, count: usize) {
        loop {
            let notified = self.started_notify.notified();
            if self.started() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl TicketExecutor for GatedExecutor {
    fn name(&self) -> &str {
        "gated"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> CreResult<serde_json::Value> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.started_notify.notify_waiters();

        tokio::select! {
            permit = self.gate.acquire() => {
                permit
                    .map_err(|e| CreError::ExecutionError(e.to_string()))?
                    .forget();
                Ok(json!({ "ticket": ctx.ticket.name() }))
            }
            _ = ctx.signal.triggered() => {
                Err(CreError::ExecutionError("interrupted by shutdown".to_string()))
            }
        }
    }
}

/// Fails every ticket whose payload asks for it
pub struct SelectiveFailureExecutor;

#[async_trait]
impl TicketExecutor for SelectiveFailureExecutor {
    fn name(&self) -> &str {
        "selective-failure"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> CreResult<serde_json::Value> {
        match ctx.ticket.payload()["fail"].as_str() {
            Some("error") => Err(CreError::ExecutionError("requested failure".to_string())),
            Some("panic") => panic!("requested panic"),
            _ => Ok(ctx.ticket.payload().clone()),
        }
    }
}

/// Never finishes and ignores the shutdown signal
pub struct StubbornExecutor;

#[async_trait]
impl TicketExecutor for StubbornExecutor {
    fn name(&self) -> &str {
        "stubborn"
    }

    async fn execute(&self, _ctx: &ExecutionContext) -> CreResult<serde_json::Value> {
        std::future::pending::<()>().await;
        Ok(serde_json::Value::Null)
    }
}
