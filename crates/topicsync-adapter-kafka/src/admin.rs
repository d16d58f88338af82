//! Topic admin interface.

use async_trait::async_trait;
use topicsync_core::{ProvisionOutcome, TopicConfig, TopicName};

/// Broker topic administration.
#[async_trait]
pub trait TopicAdmin: Send + Sync {
    /// Create `name` with `config`. One attempt, no retries.
    ///
    /// Never errors: failures are reported as [`ProvisionOutcome::Failed`].
    async fn create_topic(&self, name: &TopicName, config: &TopicConfig) -> ProvisionOutcome;

    /// List topic names known to the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the broker cannot be queried.
    async fn list_topics(&self) -> Result<Vec<String>, AdminError>;
}

/// Errors that can occur outside of topic creation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdminError {
    /// Admin client initialization failed
    #[error("admin init error: {0}")]
    Init(String),
    /// Admin tool could not be run or exited with failure
    #[error("admin command error: {0}")]
    Command(String),
    /// Admin call exceeded its timeout
    #[error("admin call timed out after {0} s")]
    Timeout(u64),
    /// Broker returned an error
    #[error("broker error: {0}")]
    Broker(String),
}
