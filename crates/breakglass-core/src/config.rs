//! Configuration for the anomaly heuristics and the expiration scheduler.
//!
//! Every threshold the heuristics and sweeps use is a named value here with
//! a documented default, rather than a literal at the call site.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tuning knobs for the anomaly detection heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// A user exceeding this many requests inside the trailing window fires
    /// the frequent-requests heuristic.
    #[serde(default = "default_frequent_request_threshold")]
    pub frequent_request_threshold: u32,

    /// Trailing window for the frequent-requests heuristic, in minutes.
    #[serde(default = "default_frequent_window_minutes")]
    pub frequent_window_minutes: i64,

    /// Minimum inactivity gap, in days, for a user to count as dormant.
    #[serde(default = "default_dormancy_window_days")]
    pub dormancy_window_days: i64,

    /// Width of the post-dormancy burst window, in minutes.
    #[serde(default = "default_burst_window_minutes")]
    pub burst_window_minutes: i64,

    /// Number of actions inside the burst window that qualifies as a burst.
    #[serde(default = "default_burst_threshold")]
    pub burst_threshold: u32,

    /// Start of the business-hours window (inclusive hour, 24h clock).
    #[serde(default = "default_business_hours_start")]
    pub business_hours_start: u32,

    /// End of the business-hours window (exclusive hour, 24h clock).
    #[serde(default = "default_business_hours_end")]
    pub business_hours_end: u32,
}

fn default_frequent_request_threshold() -> u32 {
    5
}

fn default_frequent_window_minutes() -> i64 {
    60
}

fn default_dormancy_window_days() -> i64 {
    7
}

fn default_burst_window_minutes() -> i64 {
    15
}

fn default_burst_threshold() -> u32 {
    3
}

fn default_business_hours_start() -> u32 {
    7
}

fn default_business_hours_end() -> u32 {
    17
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            frequent_request_threshold: default_frequent_request_threshold(),
            frequent_window_minutes: default_frequent_window_minutes(),
            dormancy_window_days: default_dormancy_window_days(),
            burst_window_minutes: default_burst_window_minutes(),
            burst_threshold: default_burst_threshold(),
            business_hours_start: default_business_hours_start(),
            business_hours_end: default_business_hours_end(),
        }
    }
}

impl DetectionConfig {
    /// Trailing window for the frequent-requests heuristic.
    #[must_use]
    pub fn frequent_window(&self) -> Duration {
        Duration::minutes(self.frequent_window_minutes)
    }

    /// Minimum dormancy gap.
    #[must_use]
    pub fn dormancy_window(&self) -> Duration {
        Duration::days(self.dormancy_window_days)
    }

    /// Post-dormancy burst window.
    #[must_use]
    pub fn burst_window(&self) -> Duration {
        Duration::minutes(self.burst_window_minutes)
    }
}

/// Tuning knobs for the ticket expiration job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the expiration job runs, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Tickets with this much or less time remaining get a one-time
    /// expiry warning, in minutes.
    #[serde(default = "default_warning_threshold_minutes")]
    pub warning_threshold_minutes: i64,
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_warning_threshold_minutes() -> i64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            warning_threshold_minutes: default_warning_threshold_minutes(),
        }
    }
}

impl SchedulerConfig {
    /// Warning threshold as a duration.
    #[must_use]
    pub fn warning_threshold(&self) -> Duration {
        Duration::minutes(self.warning_threshold_minutes)
    }
}
