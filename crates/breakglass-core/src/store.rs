//! Ticket storage collaborator contract.
//!
//! The store is the only component that writes ticket state. Terminal
//! transitions go through [`TicketStore::finalize`], an atomic
//! check-then-write: the first terminal transition wins and every later
//! writer observes [`FinalizeOutcome::AlreadyTerminal`]. This is what lets
//! an admin revocation and a scheduler auto-close race safely on the same
//! ticket.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, TicketError};
use crate::types::{Ticket, TicketId, TicketStatus};

/// Partial update of a ticket's non-lifecycle fields. Only fields present
/// are applied.
#[derive(Debug, Clone, Default)]
pub struct UpdateTicketFields {
    /// New description.
    pub description: Option<String>,
    /// New emergency category.
    pub emergency_type: Option<String>,
    /// New emergency contact.
    pub emergency_contact: Option<String>,
    /// New duration in minutes.
    pub duration_minutes: Option<i64>,
}

impl UpdateTicketFields {
    /// Whether any field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.emergency_type.is_none()
            && self.emergency_contact.is_none()
            && self.duration_minutes.is_none()
    }
}

/// A terminal transition to apply through [`TicketStore::finalize`].
#[derive(Debug, Clone)]
pub struct TerminalTransition {
    /// Target status; must be terminal.
    pub status: TicketStatus,
    /// Completion timestamp to record.
    pub date_completed: DateTime<Utc>,
    /// Revoking admin, for revocations only.
    pub revoked_by: Option<Uuid>,
    /// Revocation reason, for revocations only.
    pub reject_reason: Option<String>,
}

/// Outcome of an atomic terminal transition.
#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    /// The transition was written; the ticket is returned in its new state.
    Applied(Ticket),
    /// Another writer got there first; the ticket is returned unchanged.
    AlreadyTerminal(Ticket),
    /// No ticket exists at the given id.
    NotFound,
}

/// Storage contract for tickets.
#[async_trait::async_trait]
pub trait TicketStore: Send + Sync {
    /// Persist a new ticket. Fails with [`TicketError::DuplicateTicketId`]
    /// when the business key collides, without mutating anything.
    async fn insert(&self, ticket: Ticket) -> Result<Ticket>;

    /// Look up by internal id.
    async fn find_by_id(&self, id: TicketId) -> Result<Option<Ticket>>;

    /// Look up by business key.
    async fn find_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>>;

    /// Merge non-lifecycle fields into an existing ticket.
    async fn update_fields(
        &self,
        id: TicketId,
        fields: UpdateTicketFields,
    ) -> Result<Option<Ticket>>;

    /// Atomically apply a terminal transition; first terminal writer wins.
    async fn finalize(&self, id: TicketId, transition: TerminalTransition)
        -> Result<FinalizeOutcome>;

    /// Flip `five_minute_warning_sent` false to true. Returns whether the
    /// flag actually changed; already-warned and missing tickets return false.
    async fn mark_warning_sent(&self, id: TicketId) -> Result<bool>;

    /// All active tickets carrying a duration, the expiration job's working set.
    async fn find_active_with_duration(&self) -> Result<Vec<Ticket>>;

    /// All tickets in the given status.
    async fn find_by_status(&self, status: TicketStatus) -> Result<Vec<Ticket>>;

    /// All tickets owned by the given user, ordered by creation time.
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Ticket>>;

    /// All tickets created inside `[from, to)`.
    async fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Ticket>>;

    /// Case-insensitive substring search over descriptions.
    async fn search_description(&self, needle: &str) -> Result<Vec<Ticket>>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<TicketId, Ticket>,
    by_key: HashMap<String, TicketId>,
}

/// In-memory ticket store for testing. A single lock over both indexes keeps
/// `insert` and `finalize` atomic.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all tickets.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.by_id.clear();
        inner.by_key.clear();
    }
}

#[async_trait::async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn insert(&self, ticket: Ticket) -> Result<Ticket> {
        let mut inner = self.inner.write().await;
        if inner.by_key.contains_key(&ticket.ticket_id) {
            return Err(TicketError::DuplicateTicketId(ticket.ticket_id));
        }
        inner.by_key.insert(ticket.ticket_id.clone(), ticket.id);
        inner.by_id.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn find_by_id(&self, id: TicketId) -> Result<Option<Ticket>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_key
            .get(ticket_id)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn update_fields(
        &self,
        id: TicketId,
        fields: UpdateTicketFields,
    ) -> Result<Option<Ticket>> {
        let mut inner = self.inner.write().await;
        let Some(ticket) = inner.by_id.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(description) = fields.description {
            ticket.description = description;
        }
        if let Some(emergency_type) = fields.emergency_type {
            ticket.emergency_type = emergency_type;
        }
        if let Some(emergency_contact) = fields.emergency_contact {
            ticket.emergency_contact = emergency_contact;
        }
        if let Some(duration_minutes) = fields.duration_minutes {
            ticket.duration_minutes = Some(duration_minutes);
        }

        Ok(Some(ticket.clone()))
    }

    async fn finalize(
        &self,
        id: TicketId,
        transition: TerminalTransition,
    ) -> Result<FinalizeOutcome> {
        if !transition.status.is_terminal() {
            return Err(TicketError::InvalidTransition {
                from: TicketStatus::Active,
                to: transition.status,
            });
        }

        let mut inner = self.inner.write().await;
        let Some(ticket) = inner.by_id.get_mut(&id) else {
            return Ok(FinalizeOutcome::NotFound);
        };

        if ticket.status.is_terminal() {
            return Ok(FinalizeOutcome::AlreadyTerminal(ticket.clone()));
        }

        ticket.status = transition.status;
        ticket.date_completed = Some(transition.date_completed);
        if transition.revoked_by.is_some() {
            ticket.revoked_by = transition.revoked_by;
        }
        if transition.reject_reason.is_some() {
            ticket.reject_reason = transition.reject_reason;
        }

        Ok(FinalizeOutcome::Applied(ticket.clone()))
    }

    async fn mark_warning_sent(&self, id: TicketId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(ticket) = inner.by_id.get_mut(&id) else {
            return Ok(false);
        };
        if ticket.five_minute_warning_sent {
            return Ok(false);
        }
        ticket.five_minute_warning_sent = true;
        Ok(true)
    }

    async fn find_active_with_duration(&self) -> Result<Vec<Ticket>> {
        Ok(self
            .inner
            .read()
            .await
            .by_id
            .values()
            .filter(|t| t.status == TicketStatus::Active && t.duration_minutes.is_some())
            .cloned()
            .collect())
    }

    async fn find_by_status(&self, status: TicketStatus) -> Result<Vec<Ticket>> {
        Ok(self
            .inner
            .read()
            .await
            .by_id
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .inner
            .read()
            .await
            .by_id
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.date_created);
        Ok(tickets)
    }

    async fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .inner
            .read()
            .await
            .by_id
            .values()
            .filter(|t| t.date_created >= from && t.date_created < to)
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.date_created);
        Ok(tickets)
    }

    async fn search_description(&self, needle: &str) -> Result<Vec<Ticket>> {
        let needle = needle.to_lowercase();
        Ok(self
            .inner
            .read()
            .await
            .by_id
            .values()
            .filter(|t| t.description.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}
