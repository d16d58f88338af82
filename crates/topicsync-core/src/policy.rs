//! Fixed topic policy.
//!
//! Every provisioned topic is compacted, flushed every minute, and retained
//! for a configured number of 31-day months.

use serde::{Deserialize, Serialize};

/// Cleanup policy applied to every topic.
pub const CLEANUP_POLICY: &str = "compact";

/// Flush interval applied to every topic, in milliseconds.
pub const FLUSH_MS: u64 = 60_000;

/// Length of a retention month, in milliseconds (31 days).
pub const MONTH_MS: u64 = 31 * 24 * 3600 * 1000;

/// Process-level settings from which a [`TopicConfig`] is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPolicy {
    /// Replication factor for new topics
    pub replication_factor: i32,
    /// Partition count for new topics
    pub partitions: i32,
    /// Retention period in months
    pub retention_months: u32,
}

impl Default for TopicPolicy {
    fn default() -> Self {
        Self {
            replication_factor: 1,
            partitions: 1,
            retention_months: 6,
        }
    }
}

impl TopicPolicy {
    /// Compute the per-topic configuration.
    #[must_use]
    pub fn topic_config(&self) -> TopicConfig {
        TopicConfig {
            replication_factor: self.replication_factor,
            partitions: self.partitions,
            cleanup_policy: CLEANUP_POLICY.to_string(),
            flush_ms: FLUSH_MS,
            retention_ms: retention_ms(self.retention_months),
        }
    }
}

/// Configuration attached to a topic at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Replication factor
    pub replication_factor: i32,
    /// Partition count
    pub partitions: i32,
    /// `cleanup.policy`
    pub cleanup_policy: String,
    /// `flush.ms`
    pub flush_ms: u64,
    /// `retention.ms`
    pub retention_ms: u64,
}

impl Default for TopicConfig {
    fn default() -> Self {
        TopicPolicy::default().topic_config()
    }
}

impl TopicConfig {
    /// Topic-level config entries as broker key/value pairs.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("cleanup.policy", self.cleanup_policy.clone()),
            ("flush.ms", self.flush_ms.to_string()),
            ("retention.ms", self.retention_ms.to_string()),
        ]
    }
}

/// Retention in milliseconds for the given number of months.
#[must_use]
pub fn retention_ms(months: u32) -> u64 {
    u64::from(months) * MONTH_MS
}
