//! # Ticket Execution Result
//!
//! The outcome of one execution task, delivered back to the ticket source.
//! Every dispatched ticket produces exactly one result, including tickets that
//! were discarded or interrupted by shutdown.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actors::ActorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketError {
    pub message: String,
    pub error_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketExecutionResult {
    pub ticket_id: Uuid,
    /// Environment that dispatched the ticket
    pub cre_id: ActorId,
    pub status: ExecutionStatus,
    pub output: Option<serde_json::Value>,
    pub error: Option<TicketError>,
    pub execution_time_ms: i64,
    pub finished_at: DateTime<Utc>,
}

impl TicketExecutionResult {
    pub fn success(
        ticket_id: Uuid,
        cre_id: ActorId,
        output: serde_json::Value,
        execution_time_ms: i64,
    ) -> Self {
        Self {
            ticket_id,
            cre_id,
            status: ExecutionStatus::Completed,
            output: Some(output),
            error: None,
            execution_time_ms,
            finished_at: Utc::now(),
        }
    }

    pub fn failure(
        ticket_id: Uuid,
        cre_id: ActorId,
        message: impl Into<String>,
        error_type: &str,
        execution_time_ms: i64,
    ) -> Self {
        Self {
            ticket_id,
            cre_id,
            status: ExecutionStatus::Failed,
            output: None,
            error: Some(TicketError {
                message: message.into(),
                error_type: error_type.to_string(),
            }),
            execution_time_ms,
            finished_at: Utc::now(),
        }
    }

    pub fn cancelled(
        ticket_id: Uuid,
        cre_id: ActorId,
        message: impl Into<String>,
        error_type: &str,
        execution_time_ms: i64,
    ) -> Self {
        Self {
            status: ExecutionStatus::Cancelled,
            ..Self::failure(ticket_id, cre_id, message, error_type, execution_time_ms)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    pub fn error_type(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.error_type.as_str())
    }
}
