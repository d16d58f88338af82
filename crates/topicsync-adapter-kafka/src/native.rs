//! Native admin protocol backend over librdkafka.

use crate::admin::{AdminError, TopicAdmin};
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use topicsync_core::{classify, BrokerResponse, ProvisionOutcome, TopicConfig, TopicName};

/// Configuration for the native admin client.
#[derive(Debug, Clone)]
pub struct KafkaAdminConfig {
    /// `bootstrap.servers`
    pub bootstrap_servers: String,
    /// Upper bound on one admin request
    pub timeout: Duration,
}

impl Default for KafkaAdminConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Topic admin speaking the Kafka admin protocol.
pub struct KafkaAdmin {
    client: Arc<AdminClient<DefaultClientContext>>,
    timeout: Duration,
}

impl KafkaAdmin {
    /// Create a new native admin client.
    ///
    /// # Errors
    ///
    /// Returns error if librdkafka rejects the client configuration.
    pub fn new(config: &KafkaAdminConfig) -> Result<Self, AdminError> {
        let client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .create()
            .map_err(|e| AdminError::Init(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl TopicAdmin for KafkaAdmin {
    async fn create_topic(&self, name: &TopicName, config: &TopicConfig) -> ProvisionOutcome {
        let entries = config.entries();
        let mut topic = NewTopic::new(
            name.as_str(),
            config.partitions,
            TopicReplication::Fixed(config.replication_factor),
        );
        for (key, value) in &entries {
            topic = topic.set(key, value);
        }

        let options = AdminOptions::new().request_timeout(Some(self.timeout));

        tracing::debug!(topic = %name, "Creating topic via admin protocol");

        let results = match self.client.create_topics([&topic], &options).await {
            Ok(results) => results,
            Err(e) => return ProvisionOutcome::Failed(e.to_string()),
        };

        let response = match results.into_iter().next() {
            Some(Ok(_)) => BrokerResponse::Code {
                code: 0,
                message: String::new(),
            },
            Some(Err((_, code))) => BrokerResponse::Code {
                code: protocol_code(code),
                message: code.to_string(),
            },
            None => return ProvisionOutcome::Failed("broker returned no topic result".to_string()),
        };

        classify(&response)
    }

    async fn list_topics(&self) -> Result<Vec<String>, AdminError> {
        let client = Arc::clone(&self.client);
        let timeout = self.timeout;

        // Metadata fetches block the calling thread.
        let metadata = tokio::task::spawn_blocking(move || {
            client.inner().fetch_metadata(None, timeout)
        })
        .await
        .map_err(|e| AdminError::Broker(e.to_string()))?
        .map_err(|e| AdminError::Broker(e.to_string()))?;

        Ok(metadata
            .topics()
            .iter()
            .map(|t| t.name().to_string())
            .collect())
    }
}

/// Numeric error code; broker errors keep their Kafka protocol value,
/// client-side errors are negative.
fn protocol_code(code: RDKafkaErrorCode) -> i32 {
    code as i32
}
