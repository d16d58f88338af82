//! HTTP client for the metadata catalog.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use topicsync_core::{EntityError, RegistrationEntity};
use url::Url;

/// Default `$expand` list used when fetching an entity.
pub const DEFAULT_EXPAND: &str = "Locations,Sensor,Datastreams,Observations,ObservedProperty";

/// How an entity id is placed in the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStyle {
    /// OData key syntax: `/Things(42)`
    #[default]
    Parenthesized,
    /// Plain path segment: `/Things/42`
    Path,
}

impl std::str::FromStr for KeyStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paren" | "parenthesized" | "odata" => Ok(Self::Parenthesized),
            "path" => Ok(Self::Path),
            other => Err(format!("unknown key style '{other}'")),
        }
    }
}

/// Catalog HTTP client configuration.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL of the catalog API (e.g., <http://gost:8080/v1.0>)
    pub base_url: String,
    /// Entity collection name
    pub collection: String,
    /// Related entities to expand when fetching by id
    pub expand: Option<String>,
    /// Id placement in request paths
    pub key_style: KeyStyle,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://gost:8080/v1.0".to_string(),
            collection: "Things".to_string(),
            expand: Some(DEFAULT_EXPAND.to_string()),
            key_style: KeyStyle::Parenthesized,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Read/write access to registration entities.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch one entity. `Ok(None)` means the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the catalog cannot be reached or returns a
    /// document that is not a registration.
    async fn get_by_id(&self, id: u64) -> Result<Option<RegistrationEntity>, CatalogError>;

    /// Register a new entity and return the document the catalog stored.
    ///
    /// The document is returned as sent back by the catalog; callers extract
    /// the registration from it. A non-JSON success body comes back as a
    /// JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::WriteRejected`] on a non-success response.
    async fn create(&self, payload: &Value) -> Result<Value, CatalogError>;
}

/// HTTP client for catalog operations.
pub struct CatalogClient {
    client: Client,
    config: CatalogClientConfig,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot
    /// be created.
    pub fn new(mut config: CatalogClientConfig) -> Result<Self, CatalogError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| CatalogError::Init(format!("invalid base URL {}: {e}", config.base_url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(CatalogError::Init(format!(
                "unsupported scheme '{}' in {}",
                base.scheme(),
                config.base_url
            )));
        }
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CatalogError::Init(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &CatalogClientConfig {
        &self.config
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.config.base_url, self.config.collection)
    }

    fn entity_url(&self, id: u64) -> String {
        let mut url = match self.config.key_style {
            KeyStyle::Parenthesized => format!("{}({id})", self.collection_url()),
            KeyStyle::Path => format!("{}/{id}", self.collection_url()),
        };
        if let Some(expand) = &self.config.expand {
            url.push_str("?$expand=");
            url.push_str(expand);
        }
        url
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    async fn get_by_id(&self, id: u64) -> Result<Option<RegistrationEntity>, CatalogError> {
        let url = self.entity_url(id);

        tracing::debug!(entity_id = id, url, "GET entity");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            tracing::debug!(
                entity_id = id,
                status = response.status().as_u16(),
                "Entity not found"
            );
            return Ok(None);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        RegistrationEntity::from_json(body)
            .map(Some)
            .map_err(CatalogError::Entity)
    }

    async fn create(&self, payload: &Value) -> Result<Value, CatalogError> {
        let url = self.collection_url();

        tracing::debug!(url, "POST entity");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::WriteRejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        // The entity is stored at this point; a body read failure must not
        // look like a rejected write.
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read catalog reply after write");
                String::new()
            }
        };

        Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Catalog reply after write is not JSON");
            Value::String(text)
        }))
    }
}

/// Errors that can occur with the catalog client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    /// Client initialization failed
    #[error("client init error: {0}")]
    Init(String),
    /// Network failure or timeout
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    /// The catalog rejected a write
    #[error("catalog rejected write (status {status}): {body}")]
    WriteRejected {
        /// HTTP status code
        status: u16,
        /// Response body from the catalog
        body: String,
    },
    /// Response body was not JSON
    #[error("parse error: {0}")]
    Parse(String),
    /// Response was JSON but not a registration
    #[error(transparent)]
    Entity(#[from] EntityError),
}
