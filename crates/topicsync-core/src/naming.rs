//! Broker topic naming.
//!
//! Channel topics: `eu.ChannelID_{id}.CompanyID_{owner}`
//! Sensor topics: `eu.{company}.{system}.{sensor}`
//!
//! Names are sanitized to the broker-legal character class `[A-Za-z0-9._-]`:
//! whitespace becomes `-`, every other illegal character is dropped.
//! The same input always yields the same name, so names are recomputed
//! on demand and never stored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Region prefix shared by every topic.
pub const TOPIC_PREFIX: &str = "eu";

/// A sanitized broker topic identifier.
///
/// May be empty when every input character was illegal; callers must check
/// [`TopicName::is_empty`] before provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicName(String);

impl TopicName {
    /// Sanitize an arbitrary string into a topic name.
    #[must_use]
    pub fn sanitize(raw: &str) -> Self {
        let name = raw
            .chars()
            .map(|c| if c.is_whitespace() { '-' } else { c })
            .filter(|c| is_legal(*c))
            .collect();
        Self(name)
    }

    /// The topic name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether sanitization left nothing usable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TopicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether `c` is allowed in a broker topic name.
#[must_use]
pub fn is_legal(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Derive the channel topic for a catalog registration.
///
/// # Examples
///
/// ```
/// use topicsync_core::resolve;
///
/// assert_eq!(resolve(42, "acme").as_str(), "eu.ChannelID_42.CompanyID_acme");
/// assert_eq!(resolve(7, "Big Co/op").as_str(), "eu.ChannelID_7.CompanyID_Big-Coop");
/// ```
#[must_use]
pub fn resolve(id: u64, owner_id: &str) -> TopicName {
    TopicName::sanitize(&format!(
        "{TOPIC_PREFIX}.ChannelID_{id}.CompanyID_{owner_id}"
    ))
}

/// Derive the topic for a sensor addressed by company, system and sensor name.
#[must_use]
pub fn sensor_topic(company: &str, system: &str, sensor: &str) -> TopicName {
    TopicName::sanitize(&format!("{TOPIC_PREFIX}.{company}.{system}.{sensor}"))
}
