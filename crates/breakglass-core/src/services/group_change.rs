//! Suspicion classification for access-group membership changes.
//!
//! Classification depends only on the sensitivity of the groups involved:
//! Financial/Management outrank HR, which outranks Logistics. Logistics-only
//! moves are routine; unrecognized groups fall back to a low-risk finding
//! that reports the raw group id.

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::notify::Notifier;
use crate::types::{AccessGroup, NotificationCategory, RiskLevel};

/// A group membership transition observed on a ticket event. Ephemeral,
/// never persisted by this core.
#[derive(Debug, Clone)]
pub struct GroupChange {
    /// The user whose membership changed.
    pub user_id: Uuid,
    /// Business key of the ticket the change is associated with.
    pub ticket_id: String,
    /// Previous group, `None` when the user had no group.
    pub old_group: Option<AccessGroup>,
    /// New group, `None` when the user was removed from all groups.
    pub new_group: Option<AccessGroup>,
    /// Caller-supplied reason for the change.
    pub reason: String,
}

/// Classify a transition by the sensitivity of the groups involved.
///
/// `None` means the change is not suspicious and triggers no notification.
#[must_use]
pub fn classify(old: Option<AccessGroup>, new: Option<AccessGroup>) -> Option<RiskLevel> {
    if old == new {
        return None;
    }

    let involved = [old, new];
    let involves = |pred: fn(AccessGroup) -> bool| involved.iter().flatten().any(|g| pred(*g));

    if involves(|g| matches!(g, AccessGroup::Financial | AccessGroup::Management)) {
        return Some(RiskLevel::High);
    }
    if involves(|g| matches!(g, AccessGroup::Hr)) {
        return Some(RiskLevel::Medium);
    }
    if involved
        .iter()
        .flatten()
        .all(|g| matches!(g, AccessGroup::Logistics))
    {
        return None;
    }
    // An unrecognized group is involved; flag it at low risk so an admin
    // can look at the raw id.
    Some(RiskLevel::Low)
}

/// Evaluates group transitions and alerts the admin roster.
pub struct GroupChangeSuspicionClassifier {
    notifier: Notifier,
}

impl GroupChangeSuspicionClassifier {
    /// Create a new classifier.
    #[must_use]
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    /// Classify a change and, when suspicious, broadcast one notification
    /// per current admin. Infallible; delivery failures are isolated
    /// inside the broadcast. Returns the classification.
    #[instrument(skip(self, change), fields(user_id = %change.user_id, ticket_id = %change.ticket_id))]
    pub async fn evaluate_group_change(&self, change: &GroupChange) -> Option<RiskLevel> {
        let risk = match classify(change.old_group, change.new_group) {
            Some(risk) => risk,
            None => {
                debug!("group change is not suspicious");
                return None;
            }
        };

        let render = |group: Option<AccessGroup>| {
            group.map_or_else(|| "none".to_string(), |g| g.to_string())
        };
        let message = format!(
            "Suspicious group change for user {}: {} to {} (reason: {}, risk: {}, ticket: {})",
            change.user_id,
            render(change.old_group),
            render(change.new_group),
            change.reason,
            risk,
            change.ticket_id
        );

        let delivered = self
            .notifier
            .broadcast_admins(NotificationCategory::SuspiciousGroupChange, &message)
            .await;
        debug!(risk = %risk, delivered, "suspicious group change broadcast");

        Some(risk)
    }
}
