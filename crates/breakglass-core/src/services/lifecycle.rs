//! Ticket lifecycle management: creation, update, revocation, and queries.
//!
//! All terminal transitions funnel through the store's atomic `finalize`
//! so a racing admin revocation and scheduler auto-close cannot both win.
//! Notification and anomaly evaluation after creation are best-effort: a
//! persisted ticket is always returned to the caller.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::directory::{require_admin, UserDirectory};
use crate::error::{Result, TicketError};
use crate::notify::Notifier;
use crate::services::anomaly::AnomalyDetectionEngine;
use crate::store::{FinalizeOutcome, TerminalTransition, TicketStore, UpdateTicketFields};
use crate::types::{NotificationCategory, Ticket, TicketId, TicketStatus};

/// Input for creating a ticket.
#[derive(Debug, Clone)]
pub struct CreateTicketInput {
    /// Caller-supplied unique business key.
    pub ticket_id: String,
    /// Free-text description of the emergency.
    pub description: String,
    /// Owning requester.
    pub user_id: Uuid,
    /// Free-form emergency category.
    pub emergency_type: String,
    /// Contact to reach during the emergency.
    pub emergency_contact: String,
    /// Grant duration in minutes; `None` means no automatic expiration.
    pub duration_minutes: Option<i64>,
}

/// Partial update of a ticket. Only fields present are applied.
#[derive(Debug, Clone, Default)]
pub struct UpdateTicketInput {
    /// New description.
    pub description: Option<String>,
    /// New emergency category.
    pub emergency_type: Option<String>,
    /// New emergency contact.
    pub emergency_contact: Option<String>,
    /// New duration in minutes.
    pub duration_minutes: Option<i64>,
    /// Status transition, validated against the lifecycle table.
    pub status: Option<TicketStatus>,
}

/// Reference to a ticket by internal id or business key.
#[derive(Debug, Clone)]
pub enum TicketRef {
    /// Internal surrogate id.
    Internal(TicketId),
    /// Caller-supplied business key.
    Business(String),
}

impl fmt::Display for TicketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(id) => write!(f, "{id}"),
            Self::Business(key) => write!(f, "{key}"),
        }
    }
}

impl From<TicketId> for TicketRef {
    fn from(id: TicketId) -> Self {
        Self::Internal(id)
    }
}

impl From<&str> for TicketRef {
    fn from(key: &str) -> Self {
        Self::Business(key.to_string())
    }
}

/// Owns ticket creation, update, and admin-initiated revocation.
pub struct TicketLifecycleManager {
    store: Arc<dyn TicketStore>,
    directory: Arc<dyn UserDirectory>,
    notifier: Notifier,
    anomaly: Arc<AnomalyDetectionEngine>,
}

impl TicketLifecycleManager {
    /// Create a new lifecycle manager.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        directory: Arc<dyn UserDirectory>,
        notifier: Notifier,
        anomaly: Arc<AnomalyDetectionEngine>,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            anomaly,
        }
    }

    /// Create a new active ticket.
    ///
    /// Fails with a duplicate-key conflict when the business key is taken,
    /// without mutating anything. Once persisted, the owner notification
    /// and anomaly evaluation are best-effort and cannot fail the call.
    #[instrument(skip(self, input), fields(ticket_id = %input.ticket_id, user_id = %input.user_id))]
    pub async fn create_ticket(&self, input: CreateTicketInput) -> Result<Ticket> {
        let ticket = Ticket::new(
            input.ticket_id,
            input.description,
            input.user_id,
            input.emergency_type,
            input.emergency_contact,
            input.duration_minutes,
        );
        let ticket = self.store.insert(ticket).await?;
        info!(
            id = %ticket.id,
            duration_minutes = ?ticket.duration_minutes,
            "emergency access ticket created"
        );

        let message = format!(
            "Emergency access ticket '{}' was created ({})",
            ticket.ticket_id, ticket.emergency_type
        );
        self.notifier
            .notify_user(ticket.user_id, NotificationCategory::TicketCreated, &message)
            .await;

        self.anomaly.evaluate_ticket_created(&ticket).await;

        Ok(ticket)
    }

    /// Apply a partial update to a ticket.
    ///
    /// A status transition, when present, is validated against the
    /// lifecycle table; terminal targets record `date_completed` and
    /// notify the owner.
    #[instrument(skip(self, input), fields(id = %id))]
    pub async fn update_ticket(&self, id: TicketId, input: UpdateTicketInput) -> Result<Ticket> {
        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| TicketError::TicketNotFound(id.to_string()))?;

        let mut updated = current.clone();

        if let Some(next) = input.status {
            if current.status.is_terminal() {
                return Err(TicketError::AlreadyTerminal {
                    id,
                    status: current.status,
                });
            }
            if !current.status.can_transition_to(next) {
                return Err(TicketError::InvalidTransition {
                    from: current.status,
                    to: next,
                });
            }

            updated = self
                .apply_terminal(
                    id,
                    TerminalTransition {
                        status: next,
                        date_completed: Utc::now(),
                        revoked_by: None,
                        reject_reason: None,
                    },
                )
                .await?;

            let category = match next {
                TicketStatus::Rejected => NotificationCategory::TicketRevoked,
                _ => NotificationCategory::TicketCompleted,
            };
            let message = format!(
                "Emergency access ticket '{}' is now {}",
                updated.ticket_id, updated.status
            );
            self.notifier
                .notify_user(updated.user_id, category, &message)
                .await;
        }

        let fields = UpdateTicketFields {
            description: input.description,
            emergency_type: input.emergency_type,
            emergency_contact: input.emergency_contact,
            duration_minutes: input.duration_minutes,
        };
        if !fields.is_empty() {
            updated = self
                .store
                .update_fields(id, fields)
                .await?
                .ok_or_else(|| TicketError::TicketNotFound(id.to_string()))?;
        }

        Ok(updated)
    }

    /// Revoke a ticket on behalf of an administrator.
    ///
    /// The admin capability and ticket existence are checked before any
    /// mutation. Losing the race against another terminal writer is a
    /// conflict, not an overwrite.
    #[instrument(skip(self, reason), fields(admin_id = %admin_id))]
    pub async fn revoke_ticket(
        &self,
        ticket: TicketRef,
        admin_id: Uuid,
        reason: String,
    ) -> Result<Ticket> {
        let admin = require_admin(self.directory.as_ref(), admin_id).await?;

        let current = self
            .resolve(&ticket)
            .await?
            .ok_or_else(|| TicketError::TicketNotFound(ticket.to_string()))?;

        if current.status.is_terminal() {
            return Err(TicketError::AlreadyTerminal {
                id: current.id,
                status: current.status,
            });
        }

        let revoked = self
            .apply_terminal(
                current.id,
                TerminalTransition {
                    status: TicketStatus::Rejected,
                    date_completed: Utc::now(),
                    revoked_by: Some(admin.id),
                    reject_reason: Some(reason.clone()),
                },
            )
            .await?;

        info!(
            id = %revoked.id,
            ticket_id = %revoked.ticket_id,
            "ticket revoked by administrator"
        );

        let message = format!(
            "Your emergency access ticket '{}' was revoked: {}",
            revoked.ticket_id, reason
        );
        self.notifier
            .notify_user(revoked.user_id, NotificationCategory::TicketRevoked, &message)
            .await;

        Ok(revoked)
    }

    async fn apply_terminal(
        &self,
        id: TicketId,
        transition: TerminalTransition,
    ) -> Result<Ticket> {
        match self.store.finalize(id, transition).await? {
            FinalizeOutcome::Applied(ticket) => Ok(ticket),
            FinalizeOutcome::AlreadyTerminal(ticket) => Err(TicketError::AlreadyTerminal {
                id: ticket.id,
                status: ticket.status,
            }),
            FinalizeOutcome::NotFound => Err(TicketError::TicketNotFound(id.to_string())),
        }
    }

    async fn resolve(&self, ticket: &TicketRef) -> Result<Option<Ticket>> {
        match ticket {
            TicketRef::Internal(id) => self.store.find_by_id(*id).await,
            TicketRef::Business(key) => self.store.find_by_ticket_id(key).await,
        }
    }

    // ------------------------------------------------------------------
    // Queries (no side effects)
    // ------------------------------------------------------------------

    /// Look up by internal id.
    pub async fn get_by_id(&self, id: TicketId) -> Result<Option<Ticket>> {
        self.store.find_by_id(id).await
    }

    /// Look up by business key.
    pub async fn get_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        self.store.find_by_ticket_id(ticket_id).await
    }

    /// All tickets in the given status.
    pub async fn list_by_status(&self, status: TicketStatus) -> Result<Vec<Ticket>> {
        self.store.find_by_status(status).await
    }

    /// All tickets owned by the given user.
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Ticket>> {
        self.store.find_by_user(user_id).await
    }

    /// All tickets created inside `[from, to)`.
    pub async fn list_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Ticket>> {
        self.store.find_by_date_range(from, to).await
    }

    /// Text search over descriptions.
    pub async fn search(&self, needle: &str) -> Result<Vec<Ticket>> {
        self.store.search_description(needle).await
    }
}
