//! Agent runtime orchestration.

use crate::config::{AdminBackend, AdminConfig, AgentConfig};
use crate::ingest::ContractIngestion;
use crate::reconcile::{ReconcileTask, Reconciler};
use crate::server::{AppState, Server};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use topicsync_adapter_catalog::{Catalog, CatalogClient};
use topicsync_adapter_kafka::{Connect, KafkaTopicsCli, KafkaTopicsCliConfig, TopicAdmin};
use topicsync_core::ReconciliationReport;

/// The main agent runtime.
pub struct Agent {
    config: AgentConfig,
    catalog: Arc<dyn Catalog>,
    admin: Arc<dyn TopicAdmin>,
}

impl Agent {
    /// Create a new agent with clients built from `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the catalog or admin client cannot be created.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let catalog = CatalogClient::new(config.catalog.clone())
            .context("Failed to create catalog client")?;
        let admin = build_admin(&config.admin)?;

        Ok(Self::with_clients(config, Arc::new(catalog), admin))
    }

    /// Create an agent over existing clients.
    #[must_use]
    pub fn with_clients(
        config: AgentConfig,
        catalog: Arc<dyn Catalog>,
        admin: Arc<dyn TopicAdmin>,
    ) -> Self {
        Self {
            config,
            catalog,
            admin,
        }
    }

    /// Run the HTTP API and the startup reconciliation until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP API cannot be bound or stops unexpectedly.
    pub async fn run_until(self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!("Starting agent runtime");

        let state = Arc::new(AppState {
            admin: Arc::clone(&self.admin),
            ingestion: ContractIngestion::new(
                Arc::clone(&self.catalog),
                Arc::clone(&self.admin),
                self.config.topics,
            ),
            policy: self.config.topics,
        });

        let server = Server::new(self.config.server.clone(), state);
        let listener = server.bind().await.context("Failed to start HTTP API")?;
        let mut server_task = tokio::spawn(server.serve(listener, shutdown.child_token()));

        let mut reconcile = if self.config.reconcile.enabled {
            let reconciler = Reconciler::new(
                Arc::clone(&self.catalog),
                Arc::clone(&self.admin),
                self.config.topics,
                self.config.reconcile.max_consecutive_catalog_errors,
            );
            tracing::info!(
                delay_secs = self.config.reconcile.start_delay.as_secs(),
                "Scheduling reconciliation"
            );
            Some(reconciler.spawn(self.config.reconcile.start_delay, shutdown.child_token()))
        } else {
            tracing::info!("Reconciliation disabled");
            None
        };
        let mut awaiting_report = reconcile.is_some();

        let result = loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested");
                    break Ok(());
                }
                report = next_report(&mut reconcile), if awaiting_report => {
                    awaiting_report = false;
                    match report {
                        Ok(report) => tracing::info!(
                            entities = report.len(),
                            failed = report.failures().len(),
                            "Reconciliation report received"
                        ),
                        Err(_) => tracing::warn!("Reconciliation ended without a report"),
                    }
                }
                served = &mut server_task => {
                    break match served {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(err)) => Err(err).context("HTTP API stopped"),
                        Err(err) => Err(err).context("HTTP API task panicked"),
                    };
                }
            }
        };

        shutdown.cancel();
        if let Some(task) = reconcile {
            task.join().await;
        }
        if !server_task.is_finished() {
            let _ = server_task.await;
        }

        tracing::info!("Agent stopped");
        result
    }

    /// Run until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP API cannot be bound or stops unexpectedly.
    pub async fn run(self) -> Result<()> {
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let stop = shutdown_signal();
        tokio::spawn(async move {
            stop.await;
            signal.cancel();
        });

        tracing::info!("Agent running, press Ctrl+C to stop");
        self.run_until(shutdown).await
    }
}

/// Resolves on Ctrl+C, or on SIGTERM where available.
///
/// Handlers are installed when this is called, not when the future is first
/// polled.
pub(crate) fn shutdown_signal() -> impl std::future::Future<Output = ()> + Send + 'static {
    #[cfg(unix)]
    let terminate = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
    {
        Ok(terminate) => Some(terminate),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            None
        }
    };

    async move {
        #[cfg(unix)]
        let terminated = async move {
            match terminate {
                Some(mut terminate) => {
                    terminate.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        #[cfg(not(unix))]
        let terminated = std::future::pending::<()>();

        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            () = interrupted => tracing::info!("Received Ctrl+C"),
            () = terminated => tracing::info!("Received SIGTERM"),
        }
    }
}

async fn next_report(
    task: &mut Option<ReconcileTask>,
) -> Result<ReconciliationReport, oneshot::error::RecvError> {
    match task {
        Some(task) => (&mut task.report).await,
        None => std::future::pending().await,
    }
}

/// Build the configured admin backend.
///
/// # Errors
///
/// Returns error if the backend cannot be created.
pub fn build_admin(config: &AdminConfig) -> Result<Arc<dyn TopicAdmin>> {
    match config.backend {
        AdminBackend::Cli => {
            let connect = match &config.bootstrap_servers {
                Some(servers) => Connect::BootstrapServer(servers.clone()),
                None => Connect::Zookeeper(config.zookeeper.clone()),
            };
            Ok(Arc::new(KafkaTopicsCli::new(KafkaTopicsCliConfig {
                binary: config.kafka_topics_bin.clone(),
                connect,
                timeout: config.timeout,
            })))
        }
        AdminBackend::Kafka => build_native_admin(config),
    }
}

#[cfg(feature = "rdkafka")]
fn build_native_admin(config: &AdminConfig) -> Result<Arc<dyn TopicAdmin>> {
    use topicsync_adapter_kafka::{KafkaAdmin, KafkaAdminConfig};

    let admin = KafkaAdmin::new(&KafkaAdminConfig {
        bootstrap_servers: config
            .bootstrap_servers
            .clone()
            .unwrap_or_else(|| KafkaAdminConfig::default().bootstrap_servers),
        timeout: config.timeout,
    })
    .context("Failed to create Kafka admin client")?;
    Ok(Arc::new(admin))
}

#[cfg(not(feature = "rdkafka"))]
fn build_native_admin(_config: &AdminConfig) -> Result<Arc<dyn TopicAdmin>> {
    anyhow::bail!("TOPICSYNC_ADMIN=kafka requires building with the `rdkafka` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_triggers_shutdown() {
        let stop = shutdown_signal();

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), stop)
            .await
            .unwrap();
    }

    #[test]
    fn native_backend_requires_feature() {
        let mut config = AgentConfig::default().admin;
        config.backend = AdminBackend::Kafka;

        let built = build_admin(&config);
        if cfg!(feature = "rdkafka") {
            assert!(built.is_ok());
        } else {
            let err = built.err().unwrap().to_string();
            assert!(err.contains("rdkafka"));
        }
    }
}
