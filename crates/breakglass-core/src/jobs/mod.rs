//! Background jobs for the ticket lifecycle.
//!
//! - Ticket expiration - warns owners ahead of expiry and force-closes
//!   expired tickets, every minute plus once at startup

pub mod expiration_job;

pub use expiration_job::{
    ExpirationStats, TicketExpirationJob, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_WARNING_THRESHOLD_MINUTES,
};
