//! Error types for the break-glass access domain.
//!
//! Domain errors (conflict, not-found, forbidden) are surfaced to callers
//! unmodified so a request layer can map them to precise responses.
//! Collaborator failures (notification delivery, directory lookups inside
//! fan-out, per-ticket sweep persistence) are never surfaced through these
//! types; they are logged and recovered at the point of failure.

use thiserror::Error;
use uuid::Uuid;

use crate::types::{TicketId, TicketStatus};

/// Result type for break-glass domain operations.
pub type Result<T> = std::result::Result<T, TicketError>;

/// Errors surfaced by ticket lifecycle operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// A ticket with the given business key already exists.
    #[error("ticket with id '{0}' already exists")]
    DuplicateTicketId(String),

    /// The ticket is already in a terminal status and cannot be mutated.
    #[error("ticket {id} is already {status} and cannot be modified")]
    AlreadyTerminal {
        /// Internal id of the ticket.
        id: TicketId,
        /// The terminal status it holds.
        status: TicketStatus,
    },

    /// The requested status transition is not permitted by the lifecycle table.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: TicketStatus,
        /// Requested status.
        to: TicketStatus,
    },

    /// No ticket exists for the given internal id or business key.
    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    /// No user exists for the given id.
    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    /// The acting user lacks the admin capability required for this operation.
    #[error("user {0} is not permitted to perform this action")]
    Forbidden(Uuid),

    /// The ticket store failed to complete an operation.
    #[error("store error: {0}")]
    Store(String),
}

impl TicketError {
    /// Whether this error maps to a conflict (409-equivalent) outcome.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTicketId(_)
                | Self::AlreadyTerminal { .. }
                | Self::InvalidTransition { .. }
        )
    }

    /// Whether this error maps to a not-found (404-equivalent) outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TicketNotFound(_) | Self::UserNotFound(_))
    }

    /// Whether this error maps to a forbidden (403-equivalent) outcome.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}
