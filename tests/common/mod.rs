//! Shared fixtures for compute resource environment integration tests

#![allow(dead_code)]

pub mod executors;

pub use executors::*;

use std::sync::Arc;
use std::time::Duration;

use cre_core::constants::DEFAULT_RESULT_CHANNEL_CAPACITY;
use cre_core::{ChannelTicketSource, Ticket, TicketExecutionResult};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// A build directory and a working directory that live as long as the test
pub struct TestDirs {
    pub build: TempDir,
    pub work: TempDir,
}

impl TestDirs {
    pub fn new() -> Self {
        cre_core::logging::init_structured_logging();
        Self {
            build: TempDir::new().expect("Failed to create build dir"),
            work: TempDir::new().expect("Failed to create work dir"),
        }
    }
}

pub fn result_channel(
    source_id: &str,
) -> (
    Arc<ChannelTicketSource>,
    mpsc::Receiver<TicketExecutionResult>,
) {
    let (source, receiver) =
        ChannelTicketSource::channel(source_id, DEFAULT_RESULT_CHANNEL_CAPACITY);
    (Arc::new(source), receiver)
}

pub fn ready_ticket(index: usize) -> Arc<Ticket> {
    Arc::new(Ticket::new(format!("ticket-{index}"), json!({ "index": index })))
}

/// Receive exactly `count` results, failing the test if they take too long
pub async fn collect_results(
    receiver: &mut mpsc::Receiver<TicketExecutionResult>,
    count: usize,
) -> Vec<TicketExecutionResult> {
    let mut results = Vec::with_capacity(count);
    while results.len() < count {
        let result = tokio::time::timeout(Duration::from_secs(10), receiver.recv())
            .await
            .expect("Timed out waiting for ticket results")
            .expect("Result channel closed early");
        results.push(result);
    }
    results
}
