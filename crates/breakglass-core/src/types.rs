//! Type definitions for the break-glass access domain.
//!
//! Includes newtype wrappers for IDs and enums for domain values.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types (Newtype Pattern)
// ============================================================================

/// Internal surrogate identifier for a ticket.
///
/// Distinct from the caller-supplied business key ([`Ticket::ticket_id`]),
/// which is a free-form unique string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub Uuid);

impl TicketId {
    /// Create a new random `TicketId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TicketId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<TicketId> for Uuid {
    fn from(id: TicketId) -> Self {
        id.0
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Lifecycle status of a ticket.
///
/// `Active` is the only non-terminal state. `Closed` is set exclusively by
/// the expiration job's auto-expiry path; `Completed` and `Rejected` are set
/// by caller-initiated completion and admin revocation respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Ticket is live and grants access.
    Active,
    /// Ticket was completed by its owner or an administrator.
    Completed,
    /// Ticket was revoked by an administrator.
    Rejected,
    /// Ticket expired and was closed automatically.
    Closed,
}

impl TicketStatus {
    /// Whether this status permits no further lifecycle mutation.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Exhaustive transition table: `Active` may move to any terminal state,
    /// terminal states may not move at all.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Active => next.is_terminal(),
            Self::Completed | Self::Rejected | Self::Closed => false,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Coarse severity label attached to an anomaly or group-change finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Low risk finding.
    Low,
    /// Medium risk finding.
    Medium,
    /// High risk finding.
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Access groups with a well-known sensitivity ordering
/// (Financial/Management > HR > Logistics).
///
/// Groups arrive from the directory as numeric identifiers; ids without a
/// well-known name are carried as [`AccessGroup::Other`] and rendered with
/// the raw identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessGroup {
    /// Finance department group.
    Financial,
    /// Management group.
    Management,
    /// Human resources group.
    Hr,
    /// Logistics group.
    Logistics,
    /// A group this core does not recognize, identified only by raw id.
    Other(i64),
}

impl AccessGroup {
    /// Resolve a directory group id to a well-known group.
    #[must_use]
    pub fn from_id(id: i64) -> Self {
        match id {
            1 => Self::Financial,
            2 => Self::Management,
            3 => Self::Hr,
            4 => Self::Logistics,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for AccessGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Financial => write!(f, "Financial"),
            Self::Management => write!(f, "Management"),
            Self::Hr => write!(f, "HR"),
            Self::Logistics => write!(f, "Logistics"),
            Self::Other(id) => write!(f, "Group ID: {id}"),
        }
    }
}

/// Category of an outgoing notification.
///
/// Owner-facing categories are subject to the per-user preference gate;
/// admin-facing security categories are always delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// A ticket was created (sent to the owner).
    TicketCreated,
    /// A ticket was revoked by an administrator (sent to the owner).
    TicketRevoked,
    /// A ticket is within the warning threshold of expiring (sent to the owner).
    FiveMinuteWarning,
    /// A ticket reached a terminal completion state (sent to the owner).
    TicketCompleted,
    /// An anomaly heuristic fired (sent to administrators).
    AnomalyDetected,
    /// A suspicious group membership change occurred (sent to administrators).
    SuspiciousGroupChange,
}

impl NotificationCategory {
    /// Whether this category is subject to the per-user preference gate.
    #[must_use]
    pub fn is_preference_gated(self) -> bool {
        matches!(
            self,
            Self::TicketCreated
                | Self::TicketRevoked
                | Self::FiveMinuteWarning
                | Self::TicketCompleted
        )
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TicketCreated => write!(f, "ticket_created"),
            Self::TicketRevoked => write!(f, "ticket_revoked"),
            Self::FiveMinuteWarning => write!(f, "five_minute_warning"),
            Self::TicketCompleted => write!(f, "ticket_completed"),
            Self::AnomalyDetected => write!(f, "anomaly_detected"),
            Self::SuspiciousGroupChange => write!(f, "suspicious_group_change"),
        }
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// A time-boxed grant of elevated emergency access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Internal surrogate id, assigned at creation.
    pub id: TicketId,
    /// Caller-supplied unique business key, immutable once set.
    pub ticket_id: String,
    /// Free-text description of the emergency.
    pub description: String,
    /// Owning requester.
    pub user_id: Uuid,
    /// Free-form emergency category.
    pub emergency_type: String,
    /// Contact to reach during the emergency.
    pub emergency_contact: String,
    /// Grant duration in minutes. `None` means no automatic expiration.
    pub duration_minutes: Option<i64>,
    /// Current lifecycle status.
    pub status: TicketStatus,
    /// Set at creation, immutable.
    pub date_created: DateTime<Utc>,
    /// Set exactly once, on any terminal transition. `None` iff status is Active.
    pub date_completed: Option<DateTime<Utc>>,
    /// Admin who revoked the ticket, set only on revocation.
    pub revoked_by: Option<Uuid>,
    /// Revocation reason, set only on revocation.
    pub reject_reason: Option<String>,
    /// Flips false to true at most once, never reverts.
    pub five_minute_warning_sent: bool,
}

impl Ticket {
    /// Build a new active ticket with `date_created` set to now.
    #[must_use]
    pub fn new(
        ticket_id: String,
        description: String,
        user_id: Uuid,
        emergency_type: String,
        emergency_contact: String,
        duration_minutes: Option<i64>,
    ) -> Self {
        Self {
            id: TicketId::new(),
            ticket_id,
            description,
            user_id,
            emergency_type,
            emergency_contact,
            duration_minutes,
            status: TicketStatus::Active,
            date_created: Utc::now(),
            date_completed: None,
            revoked_by: None,
            reject_reason: None,
            five_minute_warning_sent: false,
        }
    }

    /// The configured grant duration, if any.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.duration_minutes.map(Duration::minutes)
    }

    /// When this ticket expires, if it carries a duration.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.duration().map(|d| self.date_created + d)
    }

    /// Time left until expiration at `now`. Negative once expired.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at().map(|at| at - now)
    }

    /// Whether the ticket's duration has fully elapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_is_the_only_non_terminal_status() {
        assert!(!TicketStatus::Active.is_terminal());
        assert!(TicketStatus::Completed.is_terminal());
        assert!(TicketStatus::Rejected.is_terminal());
        assert!(TicketStatus::Closed.is_terminal());
    }

    #[test]
    fn transition_table_is_active_to_terminal_only() {
        let all = [
            TicketStatus::Active,
            TicketStatus::Completed,
            TicketStatus::Rejected,
            TicketStatus::Closed,
        ];

        for next in all {
            assert_eq!(
                TicketStatus::Active.can_transition_to(next),
                next.is_terminal()
            );
        }

        for from in all.into_iter().filter(|s| s.is_terminal()) {
            for next in all {
                assert!(!from.can_transition_to(next));
            }
        }
    }

    #[test]
    fn access_group_resolves_well_known_ids() {
        assert_eq!(AccessGroup::from_id(1), AccessGroup::Financial);
        assert_eq!(AccessGroup::from_id(2), AccessGroup::Management);
        assert_eq!(AccessGroup::from_id(3), AccessGroup::Hr);
        assert_eq!(AccessGroup::from_id(4), AccessGroup::Logistics);
        assert_eq!(AccessGroup::from_id(99), AccessGroup::Other(99));
    }

    #[test]
    fn unresolved_group_renders_raw_id() {
        assert_eq!(AccessGroup::Other(42).to_string(), "Group ID: 42");
        assert_eq!(AccessGroup::Hr.to_string(), "HR");
    }

    #[test]
    fn owner_categories_are_gated_admin_categories_are_not() {
        assert!(NotificationCategory::TicketCreated.is_preference_gated());
        assert!(NotificationCategory::FiveMinuteWarning.is_preference_gated());
        assert!(!NotificationCategory::AnomalyDetected.is_preference_gated());
        assert!(!NotificationCategory::SuspiciousGroupChange.is_preference_gated());
    }

    #[test]
    fn expiry_math_uses_creation_time_plus_duration() {
        let mut ticket = Ticket::new(
            "T-1".into(),
            "db outage".into(),
            Uuid::new_v4(),
            "outage".into(),
            "+1 555 0100".into(),
            Some(30),
        );
        ticket.date_created = Utc::now() - Duration::minutes(20);

        assert!(!ticket.is_expired(Utc::now()));
        let remaining = ticket.remaining(Utc::now()).unwrap();
        assert!(remaining <= Duration::minutes(10));
        assert!(remaining > Duration::minutes(9));

        ticket.date_created = Utc::now() - Duration::minutes(31);
        assert!(ticket.is_expired(Utc::now()));
    }

    #[test]
    fn no_duration_means_no_expiry() {
        let ticket = Ticket::new(
            "T-2".into(),
            "audit".into(),
            Uuid::new_v4(),
            "audit".into(),
            "".into(),
            None,
        );
        assert!(ticket.expires_at().is_none());
        assert!(!ticket.is_expired(Utc::now() + Duration::days(365)));
    }
}
