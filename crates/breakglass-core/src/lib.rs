//! Break-glass emergency access domain logic.
//!
//! This crate provides the core for granting temporary elevated access via
//! time-boxed tickets: the ticket lifecycle state machine, the expiration
//! scheduler that warns holders and force-closes expired grants, and the
//! heuristics that flag unusual usage for admin review.
//!
//! # Features
//!
//! - Ticket creation, partial update, and admin-initiated revocation with
//!   an exhaustively checked status transition table
//! - Periodic expiration sweeps: one-time five-minute warnings and
//!   idempotent auto-close, with a startup catch-up pass
//! - Anomaly detection over per-user request history (frequent requests,
//!   dormancy-then-burst, off-hours activity)
//! - Suspicion classification of access-group membership changes
//! - Best-effort admin fan-out with per-recipient failure isolation
//!
//! # Services
//!
//! - [`services::TicketLifecycleManager`] - creation, update, revocation,
//!   and read queries
//! - [`services::AnomalyDetectionEngine`] - heuristic evaluation on every
//!   ticket creation
//! - [`services::GroupChangeSuspicionClassifier`] - risk classification of
//!   group transitions
//! - [`jobs::TicketExpirationJob`] - the expiration sweeps and timer loop
//!
//! # Collaborators
//!
//! External systems are reached through narrow trait seams, each with an
//! in-memory implementation for tests and local wiring:
//! [`store::TicketStore`], [`directory::UserDirectory`],
//! [`notify::NotificationDispatcher`], and [`notify::PreferenceGate`].
//! Domain errors are surfaced unmodified; collaborator failures are logged
//! and recovered at the point of failure.

pub mod config;
pub mod directory;
pub mod error;
pub mod jobs;
pub mod notify;
pub mod services;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{DetectionConfig, SchedulerConfig};
pub use directory::{require_admin, InMemoryUserDirectory, User, UserDirectory};
pub use error::{Result, TicketError};
pub use jobs::{ExpirationStats, TicketExpirationJob};
pub use notify::{
    InMemoryPreferenceGate, NotificationDispatcher, Notifier, NotifyError, PreferenceGate,
    RecordingDispatcher, SentNotification,
};
pub use services::{
    AnomalyDetectionEngine, AnomalyFinding, AnomalyKind, CreateTicketInput, GroupChange,
    GroupChangeSuspicionClassifier, TicketLifecycleManager, TicketRef, UpdateTicketInput,
};
pub use store::{
    FinalizeOutcome, InMemoryTicketStore, TerminalTransition, TicketStore, UpdateTicketFields,
};
pub use types::{
    AccessGroup, NotificationCategory, RiskLevel, Ticket, TicketId, TicketStatus,
};
