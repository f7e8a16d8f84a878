//! Ticket Expiration Job.
//!
//! Runs every minute, plus once at process startup to catch tickets that
//! expired while the process was not running. Each cycle performs two
//! independent sweeps over the active duration-bearing tickets:
//! 1. Warning sweep: one-time expiry warning to owners of tickets inside
//!    the warning threshold
//! 2. Closure sweep: force-close tickets whose duration has elapsed
//!
//! Both sweeps are idempotent and isolate per-ticket failures, so one bad
//! record cannot stall a cycle.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::notify::Notifier;
use crate::store::{FinalizeOutcome, TerminalTransition, TicketStore};
use crate::types::{NotificationCategory, TicketStatus};

/// Default polling interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default warning threshold in minutes.
pub const DEFAULT_WARNING_THRESHOLD_MINUTES: i64 = 5;

/// Statistics from one expiration sweep or cycle.
#[derive(Debug, Clone, Default)]
pub struct ExpirationStats {
    /// Number of tickets examined.
    pub examined: usize,
    /// Number of expiry warnings delivered.
    pub warnings_sent: usize,
    /// Number of tickets force-closed.
    pub closed: usize,
    /// Number of per-ticket errors recovered.
    pub errors: usize,
}

impl ExpirationStats {
    /// Merge stats from another sweep.
    pub fn merge(&mut self, other: &ExpirationStats) {
        self.examined += other.examined;
        self.warnings_sent += other.warnings_sent;
        self.closed += other.closed;
        self.errors += other.errors;
    }

    /// Total number of actions taken (warnings + closures).
    #[must_use]
    pub fn total_actions(&self) -> usize {
        self.warnings_sent + self.closed
    }
}

/// Job that warns about and force-closes expiring tickets.
pub struct TicketExpirationJob {
    store: Arc<dyn TicketStore>,
    notifier: Notifier,
    config: SchedulerConfig,
}

impl TicketExpirationJob {
    /// Create a new expiration job.
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>, notifier: Notifier, config: SchedulerConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Warning sweep: send a one-time expiry warning to the owner of every
    /// active duration-bearing ticket inside the warning threshold.
    ///
    /// Already-warned tickets are skipped. The warned flag is persisted
    /// after the delivery attempt, so a ticket is warned at most once even
    /// when delivery fails or is suppressed by preference.
    #[instrument(skip(self))]
    pub async fn send_five_minute_warnings(&self) -> ExpirationStats {
        let mut stats = ExpirationStats::default();
        let now = Utc::now();

        let tickets = match self.store.find_active_with_duration().await {
            Ok(tickets) => tickets,
            Err(e) => {
                warn!(error = %e, "failed to load active tickets for warning sweep");
                stats.errors += 1;
                return stats;
            }
        };

        for ticket in tickets {
            stats.examined += 1;

            if ticket.five_minute_warning_sent {
                continue;
            }
            let Some(remaining) = ticket.remaining(now) else {
                continue;
            };
            if remaining > self.config.warning_threshold() {
                continue;
            }

            let message = format!(
                "Your emergency access ticket '{}' expires in {} minutes or less",
                ticket.ticket_id, self.config.warning_threshold_minutes
            );
            let delivered = self
                .notifier
                .notify_user(
                    ticket.user_id,
                    NotificationCategory::FiveMinuteWarning,
                    &message,
                )
                .await;

            match self.store.mark_warning_sent(ticket.id).await {
                Ok(flipped) => {
                    if flipped && delivered {
                        stats.warnings_sent += 1;
                        info!(
                            ticket_id = %ticket.ticket_id,
                            remaining_secs = remaining.num_seconds(),
                            "expiry warning sent"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        ticket_id = %ticket.ticket_id,
                        error = %e,
                        "failed to persist warning flag, continuing sweep"
                    );
                    stats.errors += 1;
                }
            }
        }

        stats
    }

    /// Closure sweep: force-close every active ticket whose duration has
    /// elapsed and notify the owner of the completion.
    ///
    /// A ticket that lost the race to another terminal writer is skipped.
    #[instrument(skip(self))]
    pub async fn close_expired_tickets(&self) -> ExpirationStats {
        let mut stats = ExpirationStats::default();
        let now = Utc::now();

        let tickets = match self.store.find_active_with_duration().await {
            Ok(tickets) => tickets,
            Err(e) => {
                warn!(error = %e, "failed to load active tickets for closure sweep");
                stats.errors += 1;
                return stats;
            }
        };

        for ticket in tickets {
            stats.examined += 1;

            if !ticket.is_expired(now) {
                continue;
            }

            let outcome = self
                .store
                .finalize(
                    ticket.id,
                    TerminalTransition {
                        status: TicketStatus::Closed,
                        date_completed: now,
                        revoked_by: None,
                        reject_reason: None,
                    },
                )
                .await;

            match outcome {
                Ok(FinalizeOutcome::Applied(closed)) => {
                    stats.closed += 1;
                    info!(
                        ticket_id = %closed.ticket_id,
                        duration_minutes = ?closed.duration_minutes,
                        "expired ticket closed"
                    );
                    let message = format!(
                        "Your emergency access ticket '{}' has expired and was closed",
                        closed.ticket_id
                    );
                    self.notifier
                        .notify_user(
                            closed.user_id,
                            NotificationCategory::TicketCompleted,
                            &message,
                        )
                        .await;
                }
                Ok(FinalizeOutcome::AlreadyTerminal(_) | FinalizeOutcome::NotFound) => {
                    debug!(
                        ticket_id = %ticket.ticket_id,
                        "ticket reached a terminal state before the closure sweep"
                    );
                }
                Err(e) => {
                    warn!(
                        ticket_id = %ticket.ticket_id,
                        error = %e,
                        "failed to close expired ticket, continuing sweep"
                    );
                    stats.errors += 1;
                }
            }
        }

        stats
    }

    /// Run one full cycle: warning sweep, then closure sweep.
    #[instrument(skip(self))]
    pub async fn scheduled_ticket_check(&self) -> ExpirationStats {
        let mut stats = self.send_five_minute_warnings().await;
        stats.merge(&self.close_expired_tickets().await);

        if stats.total_actions() > 0 {
            info!(
                examined = stats.examined,
                warnings_sent = stats.warnings_sent,
                closed = stats.closed,
                errors = stats.errors,
                "completed expiration check cycle"
            );
        } else {
            debug!(
                examined = stats.examined,
                errors = stats.errors,
                "expiration check cycle complete, no actions taken"
            );
        }
        stats
    }

    /// Startup catch-up pass for tickets that expired while the process
    /// was not running.
    pub async fn run_startup_check(&self) -> ExpirationStats {
        info!("running startup expiration check");
        self.scheduled_ticket_check().await
    }

    /// The configured polling interval in seconds.
    #[must_use]
    pub const fn poll_interval_secs(&self) -> u64 {
        self.config.poll_interval_secs
    }

    /// Spawn the periodic timer loop: one startup check, then one cycle per
    /// interval tick. Sequential awaits inside a single task guarantee a
    /// new cycle never starts while the previous one is still running.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run_startup_check().await;

            let period = std::time::Duration::from_secs(self.config.poll_interval_secs);
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the startup check
            // already covered it.
            interval.tick().await;

            loop {
                interval.tick().await;
                self.scheduled_ticket_check().await;
            }
        })
    }
}
