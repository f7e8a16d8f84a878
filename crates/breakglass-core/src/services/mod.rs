//! Service layer for break-glass access management.
//!
//! Business logic for the ticket lifecycle, anomaly detection over request
//! history, and suspicion classification of group membership changes.

pub mod anomaly;
pub mod group_change;
pub mod lifecycle;

// Re-export commonly used types
pub use anomaly::{AnomalyDetectionEngine, AnomalyFinding, AnomalyKind};
pub use group_change::{classify, GroupChange, GroupChangeSuspicionClassifier};
pub use lifecycle::{
    CreateTicketInput, TicketLifecycleManager, TicketRef, UpdateTicketInput,
};
