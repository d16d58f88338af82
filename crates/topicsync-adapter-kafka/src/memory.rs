//! In-memory broker for tests and local runs.
//!
//! Replies with the same text the admin tool prints, so outcomes go
//! through the shared classifier exactly as in production.

use crate::admin::{AdminError, TopicAdmin};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use topicsync_core::{classify, BrokerResponse, ProvisionOutcome, TopicConfig, TopicName};

#[derive(Debug, Default)]
struct State {
    topics: BTreeMap<String, TopicConfig>,
    failures: BTreeMap<String, String>,
    fail_all: Option<String>,
    attempts: Vec<String>,
    list_unavailable: bool,
}

/// Broker state held in a map; scripted failures per topic.
#[derive(Debug, Default)]
pub struct MemoryAdmin {
    state: Mutex<State>,
}

impl MemoryAdmin {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create topics.
    #[must_use]
    pub fn with_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let admin = Self::new();
        {
            let mut state = admin.lock();
            for topic in topics {
                state.topics.insert(topic.into(), TopicConfig::default());
            }
        }
        admin
    }

    /// Reject creation of `topic` with the given tool output.
    pub fn fail_topic(&self, topic: &str, output: &str) {
        self.lock()
            .failures
            .insert(topic.to_string(), output.to_string());
    }

    /// Reject every creation with the given tool output.
    pub fn fail_all(&self, output: &str) {
        self.lock().fail_all = Some(output.to_string());
    }

    /// Make topic listing fail.
    pub fn fail_listing(&self) {
        self.lock().list_unavailable = true;
    }

    /// Topic names of every create attempt, in call order.
    #[must_use]
    pub fn attempts(&self) -> Vec<String> {
        self.lock().attempts.clone()
    }

    /// Names of every topic currently on the broker.
    #[must_use]
    pub fn topics(&self) -> BTreeSet<String> {
        self.lock().topics.keys().cloned().collect()
    }

    /// Configuration a topic was created with.
    #[must_use]
    pub fn topic_config(&self, topic: &str) -> Option<TopicConfig> {
        self.lock().topics.get(topic).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TopicAdmin for MemoryAdmin {
    async fn create_topic(&self, name: &TopicName, config: &TopicConfig) -> ProvisionOutcome {
        let mut state = self.lock();
        state.attempts.push(name.to_string());

        let scripted = state
            .failures
            .get(name.as_str())
            .or(state.fail_all.as_ref())
            .cloned();

        let output = if let Some(output) = scripted {
            output
        } else if state.topics.contains_key(name.as_str()) {
            format!("Error while executing topic command : Topic '{name}' already exists.")
        } else {
            state.topics.insert(name.to_string(), config.clone());
            format!("Created topic \"{name}\".")
        };

        classify(&BrokerResponse::Text(output))
    }

    async fn list_topics(&self) -> Result<Vec<String>, AdminError> {
        let state = self.lock();
        if state.list_unavailable {
            return Err(AdminError::Broker("broker not available".to_string()));
        }
        Ok(state.topics.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;
    use topicsync_core::resolve;

    #[test]
    fn second_create_is_already_exists() {
        let admin = MemoryAdmin::new();
        let name = resolve(42, "acme");
        let config = TopicConfig::default();

        assert_eq!(
            block_on(admin.create_topic(&name, &config)),
            ProvisionOutcome::Created
        );
        assert_eq!(
            block_on(admin.create_topic(&name, &config)),
            ProvisionOutcome::AlreadyExists
        );
        assert_eq!(admin.attempts().len(), 2);
        assert_eq!(admin.topics().len(), 1);
    }

    #[test]
    fn scripted_failure() {
        let admin = MemoryAdmin::new();
        let name = resolve(1, "acme");
        admin.fail_topic(name.as_str(), "Error: Broker may not be available.");

        assert_eq!(
            block_on(admin.create_topic(&name, &TopicConfig::default())),
            ProvisionOutcome::Failed("Error: Broker may not be available.".to_string())
        );
        assert!(admin.topic_config(name.as_str()).is_none());
    }

    #[test]
    fn listing() {
        let admin = MemoryAdmin::with_topics(["b", "a"]);
        assert_eq!(block_on(admin.list_topics()).unwrap(), vec!["a", "b"]);

        admin.fail_listing();
        assert!(block_on(admin.list_topics()).is_err());
    }
}
