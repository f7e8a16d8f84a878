//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use breakglass_core::{
    AnomalyDetectionEngine, DetectionConfig, GroupChangeSuspicionClassifier,
    InMemoryPreferenceGate, InMemoryTicketStore, InMemoryUserDirectory, Notifier,
    RecordingDispatcher, SchedulerConfig, Ticket, TicketExpirationJob, TicketLifecycleManager,
    TicketStore, User,
};

/// Fully wired in-memory stack.
pub struct TestContext {
    pub store: Arc<InMemoryTicketStore>,
    pub directory: Arc<InMemoryUserDirectory>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub gate: Arc<InMemoryPreferenceGate>,
    pub notifier: Notifier,
    pub anomaly: Arc<AnomalyDetectionEngine>,
    pub lifecycle: TicketLifecycleManager,
    pub classifier: GroupChangeSuspicionClassifier,
    pub job: TicketExpirationJob,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryTicketStore::new());
        let directory = Arc::new(InMemoryUserDirectory::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let gate = Arc::new(InMemoryPreferenceGate::new());
        let notifier = Notifier::new(dispatcher.clone(), gate.clone(), directory.clone());

        let anomaly = Arc::new(AnomalyDetectionEngine::new(
            store.clone(),
            notifier.clone(),
            DetectionConfig::default(),
        ));
        let lifecycle = TicketLifecycleManager::new(
            store.clone(),
            directory.clone(),
            notifier.clone(),
            anomaly.clone(),
        );
        let classifier = GroupChangeSuspicionClassifier::new(notifier.clone());
        let job = TicketExpirationJob::new(
            store.clone(),
            notifier.clone(),
            SchedulerConfig::default(),
        );

        Self {
            store,
            directory,
            dispatcher,
            gate,
            notifier,
            anomaly,
            lifecycle,
            classifier,
            job,
        }
    }

    /// Register a non-admin user and return its id.
    pub async fn add_user(&self, email: &str) -> Uuid {
        self.directory
            .add_user(User {
                id: Uuid::new_v4(),
                email: email.into(),
                display_name: email.into(),
                is_admin: false,
                department: "Engineering".into(),
            })
            .await
    }

    /// Register an admin user and return its id.
    pub async fn add_admin(&self, email: &str) -> Uuid {
        self.directory
            .add_user(User {
                id: Uuid::new_v4(),
                email: email.into(),
                display_name: email.into(),
                is_admin: true,
                department: "Security".into(),
            })
            .await
    }

    /// Insert a ticket directly into the store with a backdated creation
    /// time, bypassing the lifecycle manager (and its notifications).
    pub async fn backdated_ticket(
        &self,
        user_id: Uuid,
        key: &str,
        minutes_ago: i64,
        duration_minutes: Option<i64>,
    ) -> Ticket {
        let mut ticket = Ticket::new(
            key.into(),
            format!("backdated ticket {key}"),
            user_id,
            "outage".into(),
            "+1 555 0100".into(),
            duration_minutes,
        );
        ticket.date_created = Utc::now() - Duration::minutes(minutes_ago);
        self.store
            .insert(ticket)
            .await
            .expect("backdated insert should succeed")
    }
}
