//! Single-topic provisioning shared by every entry point.

use topicsync_adapter_kafka::TopicAdmin;
use topicsync_core::{ProvisionOutcome, TopicConfig, TopicName};

/// Detail reported when sanitization left no usable topic name.
pub const EMPTY_TOPIC: &str = "empty topic identifier";

/// Create `name`, refusing empty identifiers without contacting the broker.
pub async fn provision(
    admin: &dyn TopicAdmin,
    name: &TopicName,
    config: &TopicConfig,
) -> ProvisionOutcome {
    if name.is_empty() {
        tracing::warn!("Refusing to provision an empty topic identifier");
        return ProvisionOutcome::Failed(EMPTY_TOPIC.to_string());
    }

    let outcome = admin.create_topic(name, config).await;
    match &outcome {
        ProvisionOutcome::Created => tracing::info!(topic = %name, "Created topic"),
        ProvisionOutcome::AlreadyExists => {
            tracing::debug!(topic = %name, "Topic already exists");
        }
        ProvisionOutcome::Failed(detail) => {
            tracing::warn!(topic = %name, detail, "Topic creation failed");
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use topicsync_adapter_kafka::MemoryAdmin;

    #[tokio::test]
    async fn empty_name_never_reaches_broker() {
        let admin = MemoryAdmin::new();
        let outcome = provision(&admin, &TopicName::sanitize("???"), &TopicConfig::default()).await;

        assert_eq!(outcome, ProvisionOutcome::Failed(EMPTY_TOPIC.to_string()));
        assert!(admin.attempts().is_empty());
    }
}
