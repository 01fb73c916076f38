//! Status and event model
//!
//! Providers report instance state in their own vocabulary; resources
//! translate it into a [`Status`] map keyed by [`StatusCode`], and the task's
//! overall [`TaskStatus`] is derived from the latest map with [`aggregate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format used for event timestamps (UTC, second precision)
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Normalized instance state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    #[serde(rename = "running")]
    Active,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCode::Active => write!(f, "running"),
            StatusCode::Succeeded => write!(f, "succeeded"),
            StatusCode::Failed => write!(f, "failed"),
        }
    }
}

/// Instance counts per status code; a missing code counts as zero
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status(BTreeMap<StatusCode, usize>);

impl Status {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, code: StatusCode) -> usize {
        self.0.get(&code).copied().unwrap_or(0)
    }

    pub fn set(&mut self, code: StatusCode, count: usize) {
        self.0.insert(code, count);
    }

    pub fn increment(&mut self, code: StatusCode) {
        *self.0.entry(code).or_insert(0) += 1;
    }

    pub fn with(mut self, code: StatusCode, count: usize) -> Self {
        self.set(code, count);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StatusCode, &usize)> {
        self.0.iter()
    }
}

/// Provider-reported status entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub time: DateTime<Utc>,
    pub code: String,
    pub description: Vec<String>,
}

impl Event {
    /// Render as `<code>: <description>`, prefixed with the timestamp when
    /// `timestamps` is set
    pub fn line(&self, timestamps: bool) -> String {
        let line = format!("{}: {}", self.code, self.description.join(" "));
        if timestamps {
            format!("{} {}", self.time.format(EVENT_TIME_FORMAT), line)
        } else {
            line
        }
    }
}

/// Aggregate status of a whole task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Succeeded => write!(f, "succeeded"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Derive the task status from the latest instance counts.
///
/// A single failed instance turns an otherwise succeeded task into a failed
/// one; `running` is only reported when nothing has failed or finished.
pub fn aggregate(status: &Status, parallelism: usize) -> TaskStatus {
    let mut result = TaskStatus::Queued;

    if status.count(StatusCode::Succeeded) >= parallelism {
        result = TaskStatus::Succeeded;
    }

    if status.count(StatusCode::Failed) > 0 {
        return TaskStatus::Failed;
    }

    if result == TaskStatus::Queued && status.count(StatusCode::Active) >= parallelism {
        result = TaskStatus::Running;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn counts(active: usize, succeeded: usize, failed: usize) -> Status {
        Status::new()
            .with(StatusCode::Active, active)
            .with(StatusCode::Succeeded, succeeded)
            .with(StatusCode::Failed, failed)
    }

    #[test]
    fn test_aggregate_matches_rules_for_small_counts() {
        for p in 1..4 {
            for a in 0..5 {
                for s in 0..5 {
                    for f in 0..3 {
                        let expected = if f > 0 {
                            TaskStatus::Failed
                        } else if s >= p {
                            TaskStatus::Succeeded
                        } else if a >= p {
                            TaskStatus::Running
                        } else {
                            TaskStatus::Queued
                        };
                        assert_eq!(
                            aggregate(&counts(a, s, f), p),
                            expected,
                            "a={} s={} f={} p={}",
                            a,
                            s,
                            f,
                            p
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_failure_overrides_success() {
        assert_eq!(aggregate(&counts(0, 1, 1), 2), TaskStatus::Failed);
        assert_eq!(aggregate(&counts(2, 2, 1), 2), TaskStatus::Failed);
    }

    #[test]
    fn test_empty_status_is_queued() {
        assert_eq!(aggregate(&Status::new(), 1), TaskStatus::Queued);
    }

    #[test]
    fn test_event_line() {
        let event = Event {
            time: Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap(),
            code: "ProvisioningState/succeeded".to_string(),
            description: vec!["Info".to_string(), "Provisioning succeeded".to_string()],
        };

        assert_eq!(
            event.line(false),
            "ProvisioningState/succeeded: Info Provisioning succeeded"
        );
        assert_eq!(
            event.line(true),
            "2021-03-04T05:06:07Z ProvisioningState/succeeded: Info Provisioning succeeded"
        );
    }

    #[test]
    fn test_status_counts() {
        let mut status = Status::new();
        status.increment(StatusCode::Failed);
        status.increment(StatusCode::Failed);
        assert_eq!(status.count(StatusCode::Failed), 2);
        assert_eq!(status.count(StatusCode::Active), 0);
    }
}
