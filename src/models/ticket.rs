//! # Ticket
//!
//! A ticket is one schedulable unit of workflow computation. Tickets are created
//! and owned by the upstream ticket source; the compute resource environment only
//! reads their state before dispatch. The evaluated flag is flipped exactly once,
//! by the execution task that ran the ticket.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket lifecycle state as seen by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    /// Dependencies are still unresolved
    Pending,
    /// All dependencies resolved, execution may proceed
    Ready,
    /// Execution has been performed
    Evaluated,
}

impl TicketState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Evaluated => write!(f, "evaluated"),
        }
    }
}

impl std::str::FromStr for TicketState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "evaluated" => Ok(Self::Evaluated),
            _ => Err(format!("Invalid ticket state: {s}")),
        }
    }
}

/// A unit of workflow computation scheduled for evaluation
///
/// Tickets are shared as `Arc<Ticket>` between the ticket source, the dispatch
/// actor and the execution task, so state lives behind interior mutability.
#[derive(Debug)]
pub struct Ticket {
    ticket_id: Uuid,
    name: String,
    payload: serde_json::Value,
    state: RwLock<TicketState>,
    evaluated: AtomicBool,
    created_at: DateTime<Utc>,
}

impl Ticket {
    /// Create a ticket that is ready for evaluation
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::with_state(Uuid::new_v4(), name, payload, TicketState::Ready)
    }

    /// Create a ticket with an explicit id and state
    pub fn with_state(
        ticket_id: Uuid,
        name: impl Into<String>,
        payload: serde_json::Value,
        state: TicketState,
    ) -> Self {
        Self {
            ticket_id,
            name: name.into(),
            payload,
            evaluated: AtomicBool::new(state == TicketState::Evaluated),
            state: RwLock::new(state),
            created_at: Utc::now(),
        }
    }

    /// Override the evaluated flag, e.g. when restoring a ticket from storage
    pub fn with_evaluated(self, evaluated: bool) -> Self {
        self.evaluated.store(evaluated, Ordering::Release);
        self
    }

    pub fn ticket_id(&self) -> Uuid {
        self.ticket_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> TicketState {
        *self.state.read()
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated.load(Ordering::Acquire)
    }

    /// Move a pending ticket to ready once its dependencies resolve
    ///
    /// Returns false if the ticket was not pending.
    pub fn mark_ready(&self) -> bool {
        let mut state = self.state.write();
        if *state != TicketState::Pending {
            return false;
        }
        *state = TicketState::Ready;
        true
    }

    /// Record that the ticket has been evaluated
    ///
    /// The flag is monotonic: only the first call returns true.
    pub fn mark_evaluated(&self) -> bool {
        let mut state = self.state.write();
        let first = self
            .evaluated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        *state = TicketState::Evaluated;
        first
    }

    /// Serializable view of the ticket for logging and diagnostics
    pub fn snapshot(&self) -> TicketSnapshot {
        TicketSnapshot {
            ticket_id: self.ticket_id,
            name: self.name.clone(),
            state: self.state(),
            evaluated: self.is_evaluated(),
            created_at: self.created_at,
        }
    }
}

/// Point-in-time copy of a ticket's identity and state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSnapshot {
    pub ticket_id: Uuid,
    pub name: String,
    pub state: TicketState,
    pub evaluated: bool,
    pub created_at: DateTime<Utc>,
}
