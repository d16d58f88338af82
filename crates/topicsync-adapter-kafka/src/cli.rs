//! `kafka-topics` command-line backend.

use crate::admin::{AdminError, TopicAdmin};
use async_trait::async_trait;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use topicsync_core::{classify, BrokerResponse, ProvisionOutcome, TopicConfig, TopicName};

/// How the admin tool reaches the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connect {
    /// `--zookeeper host:port`
    Zookeeper(String),
    /// `--bootstrap-server host:port`
    BootstrapServer(String),
}

impl Connect {
    fn args(&self) -> [&str; 2] {
        match self {
            Self::Zookeeper(addr) => ["--zookeeper", addr.as_str()],
            Self::BootstrapServer(addr) => ["--bootstrap-server", addr.as_str()],
        }
    }
}

/// Configuration for the `kafka-topics` backend.
#[derive(Debug, Clone)]
pub struct KafkaTopicsCliConfig {
    /// Path or name of the admin tool
    pub binary: String,
    /// Cluster coordinator address
    pub connect: Connect,
    /// Upper bound on one tool invocation
    pub timeout: Duration,
}

impl Default for KafkaTopicsCliConfig {
    fn default() -> Self {
        Self {
            binary: "kafka-topics".to_string(),
            connect: Connect::Zookeeper("localhost:2181".to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Topic admin that shells out to `kafka-topics`.
pub struct KafkaTopicsCli {
    config: KafkaTopicsCliConfig,
}

impl KafkaTopicsCli {
    /// Create a new CLI backend.
    #[must_use]
    pub fn new(config: KafkaTopicsCliConfig) -> Self {
        Self { config }
    }

    /// Arguments for a create invocation.
    #[must_use]
    pub fn create_args(&self, name: &TopicName, config: &TopicConfig) -> Vec<String> {
        let mut args = vec!["--create".to_string()];
        args.extend(self.config.connect.args().map(str::to_string));
        args.extend([
            "--topic".to_string(),
            name.to_string(),
            "--replication-factor".to_string(),
            config.replication_factor.to_string(),
            "--partitions".to_string(),
            config.partitions.to_string(),
        ]);
        for (key, value) in config.entries() {
            args.push("--config".to_string());
            args.push(format!("{key}={value}"));
        }
        args
    }

    /// Arguments for a list invocation.
    #[must_use]
    pub fn list_args(&self) -> Vec<String> {
        let mut args = vec!["--list".to_string()];
        args.extend(self.config.connect.args().map(str::to_string));
        args
    }

    async fn run(&self, args: &[String]) -> Result<Output, AdminError> {
        tracing::debug!(binary = %self.config.binary, ?args, "Running admin tool");

        let child = Command::new(&self.config.binary)
            .args(args)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.config.timeout, child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(AdminError::Command(format!(
                "failed to run {}: {e}",
                self.config.binary
            ))),
            Err(_) => Err(AdminError::Timeout(self.config.timeout.as_secs())),
        }
    }
}

#[async_trait]
impl TopicAdmin for KafkaTopicsCli {
    async fn create_topic(&self, name: &TopicName, config: &TopicConfig) -> ProvisionOutcome {
        let output = match self.run(&self.create_args(name, config)).await {
            Ok(output) => output,
            Err(e) => return ProvisionOutcome::Failed(e.to_string()),
        };

        // The tool reports "already exists" on stderr.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        classify(&BrokerResponse::Text(text))
    }

    async fn list_topics(&self) -> Result<Vec<String>, AdminError> {
        let output = self.run(&self.list_args()).await?;
        if !output.status.success() {
            return Err(AdminError::Command(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
