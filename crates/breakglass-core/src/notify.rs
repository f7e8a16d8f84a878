//! Notification dispatch collaborators and the best-effort fan-out helper.
//!
//! Delivery is fire-and-forget with respect to failure: a failed send is
//! logged and swallowed, never rolled back into the operation that
//! triggered it, and never stops remaining recipients from being reached.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::directory::UserDirectory;
use crate::types::NotificationCategory;

/// Errors a dispatcher may raise per send attempt.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The message could not be delivered to the recipient.
    #[error("delivery to {recipient} failed: {reason}")]
    Delivery {
        /// Intended recipient address.
        recipient: String,
        /// Transport-reported reason.
        reason: String,
    },
}

/// Sends one categorized notification to one recipient. May fail per call.
#[async_trait::async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver `message` to `recipient` under `category`.
    async fn send(
        &self,
        category: NotificationCategory,
        recipient: &str,
        message: &str,
    ) -> Result<(), NotifyError>;
}

/// Per-user switches gating whether a notification category is delivered.
#[async_trait::async_trait]
pub trait PreferenceGate: Send + Sync {
    /// Whether `user_id` wants notifications of `category`.
    async fn is_enabled(&self, user_id: Uuid, category: NotificationCategory) -> bool;
}

/// Best-effort notification fan-out used by every component that notifies.
///
/// Owner-facing sends consult the preference gate; admin broadcasts do not.
/// Every failure path here is logged and swallowed.
#[derive(Clone)]
pub struct Notifier {
    dispatcher: Arc<dyn NotificationDispatcher>,
    gate: Arc<dyn PreferenceGate>,
    directory: Arc<dyn UserDirectory>,
}

impl Notifier {
    /// Create a new notifier over the given collaborators.
    #[must_use]
    pub fn new(
        dispatcher: Arc<dyn NotificationDispatcher>,
        gate: Arc<dyn PreferenceGate>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            dispatcher,
            gate,
            directory,
        }
    }

    /// Notify a single user, honoring the preference gate for gated
    /// categories. Returns whether a delivery actually happened.
    pub async fn notify_user(
        &self,
        user_id: Uuid,
        category: NotificationCategory,
        message: &str,
    ) -> bool {
        let user = match self.directory.find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(user_id = %user_id, category = %category, "notification recipient not found");
                return false;
            }
            Err(e) => {
                warn!(user_id = %user_id, category = %category, error = %e, "recipient lookup failed");
                return false;
            }
        };

        if category.is_preference_gated() && !self.gate.is_enabled(user_id, category).await {
            debug!(user_id = %user_id, category = %category, "notification suppressed by preference");
            return false;
        }

        match self.dispatcher.send(category, &user.email, message).await {
            Ok(()) => {
                debug!(user_id = %user_id, category = %category, "notification delivered");
                true
            }
            Err(e) => {
                warn!(user_id = %user_id, category = %category, error = %e, "notification delivery failed");
                false
            }
        }
    }

    /// Notify every current admin, isolating per-recipient failures.
    ///
    /// An empty admin roster is not an error; a roster lookup failure is
    /// logged and results in zero sends. Returns the delivered count.
    pub async fn broadcast_admins(&self, category: NotificationCategory, message: &str) -> usize {
        let admins = match self.directory.list_admins().await {
            Ok(admins) => admins,
            Err(e) => {
                warn!(category = %category, error = %e, "admin roster lookup failed, skipping broadcast");
                return 0;
            }
        };

        if admins.is_empty() {
            debug!(category = %category, "no admin users to notify");
            return 0;
        }

        let mut delivered = 0;
        for admin in admins {
            match self.dispatcher.send(category, &admin.email, message).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        recipient = %admin.email,
                        category = %category,
                        error = %e,
                        "admin notification failed, continuing with remaining recipients"
                    );
                }
            }
        }
        delivered
    }
}

// ============================================================================
// In-Memory Implementations (for testing)
// ============================================================================

/// A delivery captured by [`RecordingDispatcher`].
#[derive(Debug, Clone)]
pub struct SentNotification {
    /// Category the message was sent under.
    pub category: NotificationCategory,
    /// Recipient address.
    pub recipient: String,
    /// Message body.
    pub message: String,
}

/// Dispatcher that records deliveries instead of sending, for testing.
/// Specific recipients can be made to fail.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: RwLock<Vec<SentNotification>>,
    failing: RwLock<HashSet<String>>,
}

impl RecordingDispatcher {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future send to `recipient` fail.
    pub async fn fail_for(&self, recipient: &str) {
        self.failing.write().await.insert(recipient.to_string());
    }

    /// All recorded deliveries, in send order.
    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().await.clone()
    }

    /// Number of recorded deliveries under `category`.
    pub async fn count_for(&self, category: NotificationCategory) -> usize {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| n.category == category)
            .count()
    }

    /// Drop all recorded deliveries.
    pub async fn clear(&self) {
        self.sent.write().await.clear();
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        category: NotificationCategory,
        recipient: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        if self.failing.read().await.contains(recipient) {
            return Err(NotifyError::Delivery {
                recipient: recipient.to_string(),
                reason: "simulated transport failure".into(),
            });
        }
        self.sent.write().await.push(SentNotification {
            category,
            recipient: recipient.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

/// In-memory preference gate: everything enabled unless explicitly disabled.
#[derive(Debug, Default)]
pub struct InMemoryPreferenceGate {
    disabled: RwLock<HashSet<(Uuid, NotificationCategory)>>,
}

impl InMemoryPreferenceGate {
    /// Create a gate with all categories enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable `category` for `user_id`.
    pub async fn disable(&self, user_id: Uuid, category: NotificationCategory) {
        self.disabled.write().await.insert((user_id, category));
    }

    /// Re-enable `category` for `user_id`.
    pub async fn enable(&self, user_id: Uuid, category: NotificationCategory) {
        self.disabled.write().await.remove(&(user_id, category));
    }
}

#[async_trait::async_trait]
impl PreferenceGate for InMemoryPreferenceGate {
    async fn is_enabled(&self, user_id: Uuid, category: NotificationCategory) -> bool {
        !self.disabled.read().await.contains(&(user_id, category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryUserDirectory, User};

    fn user(email: &str, is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: email.into(),
            is_admin,
            department: "Ops".into(),
        }
    }

    fn notifier(
        dispatcher: &Arc<RecordingDispatcher>,
        gate: &Arc<InMemoryPreferenceGate>,
        directory: &Arc<InMemoryUserDirectory>,
    ) -> Notifier {
        Notifier::new(dispatcher.clone(), gate.clone(), directory.clone())
    }

    #[tokio::test]
    async fn gated_category_respects_preference() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let gate = Arc::new(InMemoryPreferenceGate::new());
        let directory = Arc::new(InMemoryUserDirectory::new());
        let user_id = directory.add_user(user("owner@example.com", false)).await;
        let notifier = notifier(&dispatcher, &gate, &directory);

        gate.disable(user_id, NotificationCategory::TicketCreated)
            .await;
        assert!(
            !notifier
                .notify_user(user_id, NotificationCategory::TicketCreated, "hello")
                .await
        );
        assert!(dispatcher.sent().await.is_empty());

        gate.enable(user_id, NotificationCategory::TicketCreated)
            .await;
        assert!(
            notifier
                .notify_user(user_id, NotificationCategory::TicketCreated, "hello")
                .await
        );
        assert_eq!(dispatcher.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn broadcast_isolates_per_recipient_failures() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let gate = Arc::new(InMemoryPreferenceGate::new());
        let directory = Arc::new(InMemoryUserDirectory::new());
        directory.add_user(user("a@example.com", true)).await;
        directory.add_user(user("b@example.com", true)).await;
        directory.add_user(user("c@example.com", true)).await;
        dispatcher.fail_for("b@example.com").await;

        let notifier = notifier(&dispatcher, &gate, &directory);
        let delivered = notifier
            .broadcast_admins(NotificationCategory::AnomalyDetected, "alert")
            .await;

        assert_eq!(delivered, 2);
        let recipients: Vec<_> = dispatcher
            .sent()
            .await
            .into_iter()
            .map(|n| n.recipient)
            .collect();
        assert!(recipients.contains(&"a@example.com".to_string()));
        assert!(recipients.contains(&"c@example.com".to_string()));
    }

    #[tokio::test]
    async fn broadcast_with_no_admins_sends_nothing() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let gate = Arc::new(InMemoryPreferenceGate::new());
        let directory = Arc::new(InMemoryUserDirectory::new());
        directory.add_user(user("plain@example.com", false)).await;

        let notifier = notifier(&dispatcher, &gate, &directory);
        let delivered = notifier
            .broadcast_admins(NotificationCategory::SuspiciousGroupChange, "alert")
            .await;

        assert_eq!(delivered, 0);
        assert!(dispatcher.sent().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_recipient_is_swallowed() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let gate = Arc::new(InMemoryPreferenceGate::new());
        let directory = Arc::new(InMemoryUserDirectory::new());

        let notifier = notifier(&dispatcher, &gate, &directory);
        assert!(
            !notifier
                .notify_user(Uuid::new_v4(), NotificationCategory::TicketRevoked, "x")
                .await
        );
        assert!(dispatcher.sent().await.is_empty());
    }
}
