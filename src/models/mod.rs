//! Data types exchanged between the ticket source and the compute resource environment.

pub mod ticket;

pub use ticket::{Ticket, TicketSnapshot, TicketState};
