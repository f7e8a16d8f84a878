//! Anomaly detection over per-user request history.
//!
//! Three independent heuristics run after every ticket creation:
//! frequent requests (medium risk), dormancy followed by a burst (high
//! risk), and off-hours activity (low risk). Zero, one, or several may
//! fire for the same event; each firing heuristic is broadcast to every
//! current admin. Nothing in here ever propagates a failure into the
//! creation path.

use std::sync::Arc;

use chrono::Timelike;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::config::DetectionConfig;
use crate::notify::Notifier;
use crate::store::TicketStore;
use crate::types::{NotificationCategory, RiskLevel, Ticket};

/// Which heuristic produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    /// Too many requests inside the trailing window.
    FrequentRequests,
    /// A burst of activity immediately after an extended dormancy.
    DormantUserActivity,
    /// Activity outside the configured business hours.
    OffHoursActivity,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrequentRequests => write!(f, "Frequent requests"),
            Self::DormantUserActivity => write!(f, "Dormant user activity"),
            Self::OffHoursActivity => write!(f, "Off-hours activity"),
        }
    }
}

/// One firing heuristic.
#[derive(Debug, Clone)]
pub struct AnomalyFinding {
    /// The heuristic that fired.
    pub kind: AnomalyKind,
    /// Severity assigned by the heuristic.
    pub risk: RiskLevel,
    /// Human-readable detail with the observed values.
    pub detail: String,
}

/// Evaluates a user's request history whenever a ticket is created.
pub struct AnomalyDetectionEngine {
    store: Arc<dyn TicketStore>,
    notifier: Notifier,
    config: DetectionConfig,
}

impl AnomalyDetectionEngine {
    /// Create a new engine.
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>, notifier: Notifier, config: DetectionConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Evaluate all heuristics for a freshly created ticket and broadcast
    /// each finding to the admin roster.
    ///
    /// Infallible by contract: a history lookup failure is logged and
    /// treated as "nothing fired", and delivery failures are isolated
    /// inside the broadcast. Returns the findings for observability.
    #[instrument(skip(self, ticket), fields(ticket_id = %ticket.ticket_id, user_id = %ticket.user_id))]
    pub async fn evaluate_ticket_created(&self, ticket: &Ticket) -> Vec<AnomalyFinding> {
        let history = match self.store.find_by_user(ticket.user_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "request history lookup failed, skipping anomaly evaluation");
                return Vec::new();
            }
        };

        let findings = self.evaluate(&history, ticket);
        if findings.is_empty() {
            debug!("no anomaly heuristics fired");
            return findings;
        }

        for finding in &findings {
            let message = format!(
                "{} anomaly for user {} on ticket '{}': {} (risk: {})",
                finding.kind, ticket.user_id, ticket.ticket_id, finding.detail, finding.risk
            );
            let delivered = self
                .notifier
                .broadcast_admins(NotificationCategory::AnomalyDetected, &message)
                .await;
            debug!(
                kind = %finding.kind,
                risk = %finding.risk,
                delivered,
                "anomaly finding broadcast"
            );
        }
        findings
    }

    /// Run the three heuristics against a history snapshot. Pure with
    /// respect to the ticket's own creation time, so results are
    /// deterministic and order-insensitive.
    #[must_use]
    pub fn evaluate(&self, history: &[Ticket], ticket: &Ticket) -> Vec<AnomalyFinding> {
        [
            self.check_frequent_requests(history, ticket),
            self.check_dormant_activity(history, ticket),
            self.check_off_hours(ticket),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn check_frequent_requests(
        &self,
        history: &[Ticket],
        ticket: &Ticket,
    ) -> Option<AnomalyFinding> {
        let window_start = ticket.date_created - self.config.frequent_window();
        let count = history
            .iter()
            .filter(|t| t.date_created > window_start && t.date_created <= ticket.date_created)
            .count();

        if count as u32 <= self.config.frequent_request_threshold {
            return None;
        }

        Some(AnomalyFinding {
            kind: AnomalyKind::FrequentRequests,
            risk: RiskLevel::Medium,
            detail: format!(
                "User created {} emergency requests in the last {} minutes (threshold: {})",
                count, self.config.frequent_window_minutes, self.config.frequent_request_threshold
            ),
        })
    }

    fn check_dormant_activity(&self, history: &[Ticket], ticket: &Ticket) -> Option<AnomalyFinding> {
        let burst_start = ticket.date_created - self.config.burst_window();
        let burst_count = history
            .iter()
            .filter(|t| t.date_created > burst_start && t.date_created <= ticket.date_created)
            .count();

        if (burst_count as u32) < self.config.burst_threshold {
            return None;
        }

        // A brand-new user has no dormancy to wake from.
        let last_before_burst = history
            .iter()
            .filter(|t| t.date_created <= burst_start)
            .map(|t| t.date_created)
            .max()?;

        let earliest_in_burst = history
            .iter()
            .filter(|t| t.date_created > burst_start && t.date_created <= ticket.date_created)
            .map(|t| t.date_created)
            .min()
            .unwrap_or(ticket.date_created);

        let gap = earliest_in_burst - last_before_burst;
        if gap < self.config.dormancy_window() {
            return None;
        }

        Some(AnomalyFinding {
            kind: AnomalyKind::DormantUserActivity,
            risk: RiskLevel::High,
            detail: format!(
                "User inactive for {} days resumed with {} actions within {} minutes",
                gap.num_days(),
                burst_count,
                self.config.burst_window_minutes
            ),
        })
    }

    fn check_off_hours(&self, ticket: &Ticket) -> Option<AnomalyFinding> {
        let hour = ticket.date_created.hour();
        if hour >= self.config.business_hours_start && hour < self.config.business_hours_end {
            return None;
        }

        Some(AnomalyFinding {
            kind: AnomalyKind::OffHoursActivity,
            risk: RiskLevel::Low,
            detail: format!(
                "Ticket created at {:02}:{:02} outside business hours (allowed: {}:00 AM - {}:00 PM)",
                hour,
                ticket.date_created.minute(),
                self.config.business_hours_start,
                self.config.business_hours_end
            ),
        })
    }
}
