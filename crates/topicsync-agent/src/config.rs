//! Agent configuration.

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use topicsync_adapter_catalog::{CatalogClientConfig, KeyStyle};
use topicsync_core::TopicPolicy;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// HTTP API configuration
    pub server: ServerConfig,

    /// Metadata catalog client configuration
    pub catalog: CatalogClientConfig,

    /// Broker admin configuration
    pub admin: AdminConfig,

    /// Policy applied to every created topic
    pub topics: TopicPolicy,

    /// Startup reconciliation configuration
    pub reconcile: ReconcileConfig,
}

/// HTTP API configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub listen: SocketAddr,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

/// Which admin backend provisions topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminBackend {
    /// `kafka-topics` command-line tool
    Cli,
    /// Native admin protocol (requires the `rdkafka` feature)
    Kafka,
}

impl FromStr for AdminBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cli" => Ok(Self::Cli),
            "kafka" | "native" => Ok(Self::Kafka),
            other => Err(format!("unknown admin backend '{other}'")),
        }
    }
}

/// Broker admin configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Admin backend
    pub backend: AdminBackend,

    /// ZooKeeper address (CLI backend)
    pub zookeeper: String,

    /// Bootstrap servers; preferred over ZooKeeper by the CLI backend when set
    pub bootstrap_servers: Option<String>,

    /// Admin tool path (CLI backend)
    pub kafka_topics_bin: String,

    /// Upper bound on one admin call
    pub timeout: Duration,
}

/// Startup reconciliation configuration.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Run reconciliation at startup
    pub enabled: bool,

    /// Delay before the scan starts, giving the broker and catalog time to come up
    pub start_delay: Duration,

    /// Consecutive catalog read failures after which the scan stops
    pub max_consecutive_catalog_errors: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen: SocketAddr::from(([0, 0, 0, 0], 3033)),
                max_body_size: 1_048_576,
            },
            catalog: CatalogClientConfig::default(),
            admin: AdminConfig {
                backend: AdminBackend::Cli,
                zookeeper: "localhost:2181".to_string(),
                bootstrap_servers: None,
                kafka_topics_bin: "kafka-topics".to_string(),
                timeout: Duration::from_secs(30),
            },
            topics: TopicPolicy::default(),
            reconcile: ReconcileConfig {
                enabled: true,
                start_delay: Duration::from_secs(20),
                max_consecutive_catalog_errors: 5,
            },
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TOPICSYNC_LISTEN`: HTTP listen address
    /// - `TOPICSYNC_CATALOG_URL`: Catalog base URL
    /// - `TOPICSYNC_CATALOG_COLLECTION`: Entity collection name
    /// - `TOPICSYNC_CATALOG_EXPAND`: `$expand` list (empty disables)
    /// - `TOPICSYNC_CATALOG_KEY_STYLE`: "paren" or "path"
    /// - `TOPICSYNC_CATALOG_TIMEOUT_SECS`: Catalog request timeout
    /// - `TOPICSYNC_ADMIN`: "cli" or "kafka"
    /// - `TOPICSYNC_ZOOKEEPER`: ZooKeeper address
    /// - `TOPICSYNC_BOOTSTRAP_SERVERS`: Kafka bootstrap servers
    /// - `TOPICSYNC_KAFKA_TOPICS_BIN`: Admin tool path
    /// - `TOPICSYNC_ADMIN_TIMEOUT_SECS`: Admin call timeout
    /// - `TOPICSYNC_REPLICATION_FACTOR`, `TOPICSYNC_PARTITIONS`: Topic layout
    /// - `TOPICSYNC_RETENTION_MONTHS`: Retention period
    /// - `TOPICSYNC_RECONCILE`: "false" disables startup reconciliation
    /// - `TOPICSYNC_RECONCILE_DELAY_SECS`: Delay before reconciliation
    /// - `TOPICSYNC_RECONCILE_MAX_CATALOG_ERRORS`: Scan stop threshold
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(listen) = parse(&lookup, "TOPICSYNC_LISTEN")? {
            config.server.listen = listen;
        }

        if let Some(url) = lookup("TOPICSYNC_CATALOG_URL") {
            config.catalog.base_url = url;
        }
        if let Some(collection) = lookup("TOPICSYNC_CATALOG_COLLECTION") {
            config.catalog.collection = collection;
        }
        if let Some(expand) = lookup("TOPICSYNC_CATALOG_EXPAND") {
            config.catalog.expand = Some(expand).filter(|e| !e.is_empty());
        }
        if let Some(style) = parse::<KeyStyle>(&lookup, "TOPICSYNC_CATALOG_KEY_STYLE")? {
            config.catalog.key_style = style;
        }
        if let Some(secs) = parse(&lookup, "TOPICSYNC_CATALOG_TIMEOUT_SECS")? {
            config.catalog.timeout = Duration::from_secs(secs);
        }

        if let Some(backend) = parse(&lookup, "TOPICSYNC_ADMIN")? {
            config.admin.backend = backend;
        }
        if let Some(zookeeper) = lookup("TOPICSYNC_ZOOKEEPER") {
            config.admin.zookeeper = zookeeper;
        }
        if let Some(servers) = lookup("TOPICSYNC_BOOTSTRAP_SERVERS") {
            config.admin.bootstrap_servers = Some(servers).filter(|s| !s.is_empty());
        }
        if let Some(bin) = lookup("TOPICSYNC_KAFKA_TOPICS_BIN") {
            config.admin.kafka_topics_bin = bin;
        }
        if let Some(secs) = parse(&lookup, "TOPICSYNC_ADMIN_TIMEOUT_SECS")? {
            config.admin.timeout = Duration::from_secs(secs);
        }

        if let Some(factor) = parse(&lookup, "TOPICSYNC_REPLICATION_FACTOR")? {
            config.topics.replication_factor = factor;
        }
        if let Some(partitions) = parse(&lookup, "TOPICSYNC_PARTITIONS")? {
            config.topics.partitions = partitions;
        }
        if let Some(months) = parse(&lookup, "TOPICSYNC_RETENTION_MONTHS")? {
            config.topics.retention_months = months;
        }

        if let Some(enabled) = parse(&lookup, "TOPICSYNC_RECONCILE")? {
            config.reconcile.enabled = enabled;
        }
        if let Some(secs) = parse(&lookup, "TOPICSYNC_RECONCILE_DELAY_SECS")? {
            config.reconcile.start_delay = Duration::from_secs(secs);
        }
        if let Some(max) = parse(&lookup, "TOPICSYNC_RECONCILE_MAX_CATALOG_ERRORS")? {
            config.reconcile.max_consecutive_catalog_errors = max;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.topics.replication_factor < 1 {
            bail!("TOPICSYNC_REPLICATION_FACTOR must be at least 1");
        }
        if self.topics.partitions < 1 {
            bail!("TOPICSYNC_PARTITIONS must be at least 1");
        }
        if self.reconcile.max_consecutive_catalog_errors < 1 {
            bail!("TOPICSYNC_RECONCILE_MAX_CATALOG_ERRORS must be at least 1");
        }
        Ok(())
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{e}"))
                .with_context(|| format!("Invalid {name}: '{raw}'"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = AgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server.listen.port(), 3033);
        assert_eq!(config.catalog.base_url, "http://gost:8080/v1.0");
        assert_eq!(config.admin.backend, AdminBackend::Cli);
        assert_eq!(config.admin.zookeeper, "localhost:2181");
        assert_eq!(config.topics, TopicPolicy::default());
        assert!(config.reconcile.enabled);
        assert_eq!(config.reconcile.start_delay, Duration::from_secs(20));
    }

    #[test]
    fn overrides() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("TOPICSYNC_LISTEN", "127.0.0.1:8080"),
            ("TOPICSYNC_CATALOG_URL", "http://localhost:8084/v1.0"),
            ("TOPICSYNC_CATALOG_EXPAND", ""),
            ("TOPICSYNC_CATALOG_KEY_STYLE", "path"),
            ("TOPICSYNC_ADMIN", "kafka"),
            ("TOPICSYNC_BOOTSTRAP_SERVERS", "kafka:9092"),
            ("TOPICSYNC_REPLICATION_FACTOR", "3"),
            ("TOPICSYNC_PARTITIONS", "2"),
            ("TOPICSYNC_RETENTION_MONTHS", "12"),
            ("TOPICSYNC_RECONCILE", "false"),
            ("TOPICSYNC_RECONCILE_DELAY_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.catalog.base_url, "http://localhost:8084/v1.0");
        assert!(config.catalog.expand.is_none());
        assert_eq!(config.catalog.key_style, KeyStyle::Path);
        assert_eq!(config.admin.backend, AdminBackend::Kafka);
        assert_eq!(config.admin.bootstrap_servers.as_deref(), Some("kafka:9092"));
        assert_eq!(config.topics.replication_factor, 3);
        assert_eq!(config.topics.partitions, 2);
        assert_eq!(config.topics.retention_months, 12);
        assert!(!config.reconcile.enabled);
        assert_eq!(config.reconcile.start_delay, Duration::ZERO);
    }

    #[test]
    fn invalid_number_names_variable() {
        let err = AgentConfig::from_lookup(lookup(&[("TOPICSYNC_PARTITIONS", "two")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("TOPICSYNC_PARTITIONS"));
    }

    #[test]
    fn zero_replication_rejected() {
        let result = AgentConfig::from_lookup(lookup(&[("TOPICSYNC_REPLICATION_FACTOR", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let result = AgentConfig::from_lookup(lookup(&[("TOPICSYNC_ADMIN", "zookeeper")]));
        assert!(result.is_err());
    }
}
