//! Contract ingestion: register an entity, then provision its topic.
//!
//! A failed catalog write aborts before the broker is touched. Once the
//! catalog write succeeds the stored document is returned whatever the
//! provisioning outcome, including when it carries no usable id or owner.
//! A topic that failed here is rebuilt by the next reconciliation as long
//! as the scan reaches its id.

use crate::provision::provision;
use serde_json::Value;
use std::sync::Arc;
use topicsync_adapter_catalog::{Catalog, CatalogError};
use topicsync_adapter_kafka::TopicAdmin;
use topicsync_core::{resolve, ProvisionOutcome, RegistrationEntity, TopicName, TopicPolicy};

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct Ingested {
    /// Document as stored by the catalog
    pub document: Value,
    /// Derived topic; `None` when the document is not a usable registration
    pub topic: Option<TopicName>,
    /// Provisioning outcome for the topic
    pub outcome: ProvisionOutcome,
}

/// Two-phase registration flow.
#[derive(Clone)]
pub struct ContractIngestion {
    catalog: Arc<dyn Catalog>,
    admin: Arc<dyn TopicAdmin>,
    policy: TopicPolicy,
}

impl ContractIngestion {
    /// Create a new ingestion flow.
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>, admin: Arc<dyn TopicAdmin>, policy: TopicPolicy) -> Self {
        Self {
            catalog,
            admin,
            policy,
        }
    }

    /// Register `payload` in the catalog and provision the derived topic.
    ///
    /// # Errors
    ///
    /// Returns error if the catalog write fails; no topic is created then.
    pub async fn submit(&self, payload: &Value) -> Result<Ingested, IngestError> {
        tracing::info!("Received contract");

        let document = match self.catalog.create(payload).await {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(error = %err, "Posting contract to the catalog failed");
                return Err(IngestError::Catalog(err));
            }
        };

        let entity = match RegistrationEntity::from_json(document.clone()) {
            Ok(entity) => entity,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "Stored contract has no usable id or owner, no topic created"
                );
                return Ok(Ingested {
                    document,
                    topic: None,
                    outcome: ProvisionOutcome::Failed(err.to_string()),
                });
            }
        };

        tracing::info!(
            entity_id = entity.id,
            name = entity.name().unwrap_or_default(),
            "Added entity to the catalog"
        );

        let topic = resolve(entity.id, &entity.owner_id);
        let outcome = provision(self.admin.as_ref(), &topic, &self.policy.topic_config()).await;

        match &outcome {
            ProvisionOutcome::Created => {}
            ProvisionOutcome::AlreadyExists => {
                tracing::warn!(topic = %topic, "Couldn't create topic for contract, topic already exists");
            }
            ProvisionOutcome::Failed(detail) => {
                tracing::warn!(topic = %topic, detail, "Couldn't create topic for contract");
            }
        }

        Ok(Ingested {
            document,
            topic: Some(topic),
            outcome,
        })
    }
}

/// Errors that abort an ingestion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IngestError {
    /// Catalog write failed
    #[error("catalog write failed: {0}")]
    Catalog(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use topicsync_adapter_catalog::MemoryCatalog;
    use topicsync_adapter_kafka::MemoryAdmin;

    fn ingestion(catalog: &Arc<MemoryCatalog>, admin: &Arc<MemoryAdmin>) -> ContractIngestion {
        ContractIngestion::new(
            Arc::clone(catalog) as Arc<dyn Catalog>,
            Arc::clone(admin) as Arc<dyn TopicAdmin>,
            TopicPolicy::default(),
        )
    }

    #[tokio::test]
    async fn registers_then_provisions() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.insert(41, "globex");
        let admin = Arc::new(MemoryAdmin::new());

        let ingested = ingestion(&catalog, &admin)
            .submit(&json!({"name": "press", "properties": {"owner": "acme"}}))
            .await
            .unwrap();

        assert_eq!(ingested.document["@iot.id"], 42);
        assert_eq!(
            ingested.topic.unwrap().as_str(),
            "eu.ChannelID_42.CompanyID_acme"
        );
        assert_eq!(ingested.outcome, ProvisionOutcome::Created);

        let config = admin.topic_config("eu.ChannelID_42.CompanyID_acme").unwrap();
        assert_eq!(config.retention_ms, 16_070_400_000);
        assert_eq!(config.cleanup_policy, "compact");
    }

    #[tokio::test]
    async fn catalog_rejection_skips_provisioning() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.reject_writes(400, "missing name");
        let admin = Arc::new(MemoryAdmin::new());

        let err = ingestion(&catalog, &admin)
            .submit(&json!({"properties": {"owner": "acme"}}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestError::Catalog(CatalogError::WriteRejected { status: 400, .. })
        ));
        assert!(admin.attempts().is_empty());
    }

    #[tokio::test]
    async fn catalog_unavailable_skips_provisioning() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.fail_writes();
        let admin = Arc::new(MemoryAdmin::new());

        let err = ingestion(&catalog, &admin)
            .submit(&json!({"properties": {"owner": "acme"}}))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Catalog(CatalogError::Unavailable(_))));
        assert!(admin.attempts().is_empty());
    }

    #[tokio::test]
    async fn entity_returned_when_provisioning_fails() {
        let catalog = Arc::new(MemoryCatalog::new());
        let admin = Arc::new(MemoryAdmin::new());
        admin.fail_all("Error: Broker may not be available.");

        let ingested = ingestion(&catalog, &admin)
            .submit(&json!({"name": "press", "properties": {"owner": "acme"}}))
            .await
            .unwrap();

        assert_eq!(ingested.document["@iot.id"], 1);
        assert!(ingested.outcome.is_failed());
        assert!(catalog.get_by_id(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stored_document_without_owner_is_returned() {
        let catalog = Arc::new(MemoryCatalog::new());
        let admin = Arc::new(MemoryAdmin::new());

        let ingested = ingestion(&catalog, &admin)
            .submit(&json!({"name": "press"}))
            .await
            .unwrap();

        assert_eq!(ingested.document["@iot.id"], 1);
        assert_eq!(ingested.document["name"], "press");
        assert!(ingested.topic.is_none());
        assert!(ingested.outcome.is_failed());
        assert!(admin.attempts().is_empty());
        assert_eq!(catalog.creates(), 1);
    }
}
