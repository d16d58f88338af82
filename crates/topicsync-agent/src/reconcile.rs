//! Startup reconciliation of broker topics against the catalog.
//!
//! The catalog has no bulk listing, so entities are read one id at a time
//! starting at 1. The first id the catalog does not know ends the scan;
//! entities beyond a gap are not visited. A run of failed reads also ends
//! it, whatever the failure.

use crate::provision::provision;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use topicsync_adapter_catalog::Catalog;
use topicsync_adapter_kafka::TopicAdmin;
use topicsync_core::{resolve, ProvisionOutcome, ReconciliationReport, StopReason, TopicPolicy};

/// Rebuilds a topic for every entity reachable by the sequential scan.
pub struct Reconciler {
    catalog: Arc<dyn Catalog>,
    admin: Arc<dyn TopicAdmin>,
    policy: TopicPolicy,
    max_consecutive_catalog_errors: u32,
}

/// A reconciliation running in the background.
pub struct ReconcileTask {
    /// Delivers the report once the scan ends
    pub report: oneshot::Receiver<ReconciliationReport>,
    handle: JoinHandle<()>,
}

impl ReconcileTask {
    /// Wait for the task to exit.
    pub async fn join(self) {
        if let Err(err) = self.handle.await {
            tracing::error!(error = %err, "Reconciliation task panicked");
        }
    }
}

impl Reconciler {
    /// Create a new reconciler.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        admin: Arc<dyn TopicAdmin>,
        policy: TopicPolicy,
        max_consecutive_catalog_errors: u32,
    ) -> Self {
        Self {
            catalog,
            admin,
            policy,
            max_consecutive_catalog_errors: max_consecutive_catalog_errors.max(1),
        }
    }

    /// Run the scan once after `start_delay` on a background task.
    #[must_use]
    pub fn spawn(self, start_delay: Duration, cancel: CancellationToken) -> ReconcileTask {
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Reconciliation cancelled before start");
                    let mut report = ReconciliationReport::new();
                    report.finish(StopReason::Cancelled(1));
                    let _ = tx.send(report);
                    return;
                }
                () = tokio::time::sleep(start_delay) => {}
            }

            let report = self.run(&cancel).await;
            if tx.send(report).is_err() {
                tracing::debug!("Reconciliation report receiver dropped");
            }
        });

        ReconcileTask { report: rx, handle }
    }

    /// Scan the catalog from id 1 and provision every entity found.
    ///
    /// Always completes with a report; failures are recorded per entity.
    pub async fn run(&self, cancel: &CancellationToken) -> ReconciliationReport {
        tracing::info!("Restoring broker topics from the catalog");

        let mut report = ReconciliationReport::new();
        let mut consecutive_errors = 0u32;
        let mut id = 1u64;

        let reason = loop {
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => break StopReason::Cancelled(id),
                fetched = self.catalog.get_by_id(id) => fetched,
            };

            match fetched {
                Ok(None) => break StopReason::NotFound(id),
                Ok(Some(entity)) => {
                    consecutive_errors = 0;
                    let name = resolve(entity.id, &entity.owner_id);
                    let outcome =
                        provision(self.admin.as_ref(), &name, &self.policy.topic_config()).await;
                    tracing::debug!(entity_id = id, topic = %name, %outcome, "Reconciled entity");
                    report.record(id, outcome);
                }
                Err(err) => {
                    tracing::warn!(entity_id = id, error = %err, "Failed to read entity from catalog");
                    consecutive_errors += 1;
                    report.record(id, ProvisionOutcome::Failed(err.to_string()));
                    if consecutive_errors >= self.max_consecutive_catalog_errors {
                        break StopReason::CatalogErrors(id);
                    }
                }
            }

            id += 1;
        };

        report.finish(reason);
        log_report(&report);
        report
    }
}

fn log_report(report: &ReconciliationReport) {
    tracing::info!(
        entities = report.len(),
        created = report.created(),
        already_existing = report.already_existing(),
        stopped = ?report.stopped,
        "Reconciliation finished"
    );

    let failures = report.failures();
    if !failures.is_empty() {
        tracing::warn!(
            count = failures.len(),
            ?failures,
            "Encountered errors while restoring topics"
        );
    }
}
