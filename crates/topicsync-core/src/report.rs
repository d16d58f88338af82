//! Reconciliation report.

use crate::outcome::ProvisionOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a catalog scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "id", rename_all = "snake_case")]
pub enum StopReason {
    /// The catalog has no entity at this id
    NotFound(u64),
    /// Too many consecutive catalog read failures, the last at this id
    CatalogErrors(u64),
    /// Shutdown was requested before this id was read
    Cancelled(u64),
}

impl StopReason {
    /// The id at which scanning stopped.
    #[must_use]
    pub fn id(&self) -> u64 {
        match self {
            Self::NotFound(id) | Self::CatalogErrors(id) | Self::Cancelled(id) => *id,
        }
    }
}

/// Outcomes of one full catalog scan, in ascending entity id order.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    /// When the scan started
    pub started_at: DateTime<Utc>,
    /// When the scan ended
    pub finished_at: Option<DateTime<Utc>>,
    /// `(entity id, outcome)` pairs
    pub entries: Vec<(u64, ProvisionOutcome)>,
    /// Why the scan ended
    pub stopped: Option<StopReason>,
}

impl Default for ReconciliationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationReport {
    /// Start an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
            stopped: None,
        }
    }

    /// Record the outcome for one entity.
    pub fn record(&mut self, entity_id: u64, outcome: ProvisionOutcome) {
        self.entries.push((entity_id, outcome));
    }

    /// Close the report.
    pub fn finish(&mut self, reason: StopReason) {
        self.stopped = Some(reason);
        self.finished_at = Some(Utc::now());
    }

    /// Number of recorded outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of newly created topics.
    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ProvisionOutcome::Created))
    }

    /// Number of topics that already existed.
    #[must_use]
    pub fn already_existing(&self) -> usize {
        self.count(|o| matches!(o, ProvisionOutcome::AlreadyExists))
    }

    /// Entries whose outcome was neither created nor already existing.
    #[must_use]
    pub fn failures(&self) -> Vec<(u64, &str)> {
        self.entries
            .iter()
            .filter_map(|(id, outcome)| match outcome {
                ProvisionOutcome::Failed(detail) => Some((*id, detail.as_str())),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&ProvisionOutcome) -> bool) -> usize {
        self.entries.iter().filter(|(_, o)| pred(o)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts() {
        let mut report = ReconciliationReport::new();
        report.record(1, ProvisionOutcome::Created);
        report.record(2, ProvisionOutcome::AlreadyExists);
        report.record(3, ProvisionOutcome::Failed("broker down".to_string()));
        report.record(4, ProvisionOutcome::Created);
        report.finish(StopReason::NotFound(5));

        assert_eq!(report.len(), 4);
        assert_eq!(report.created(), 2);
        assert_eq!(report.already_existing(), 1);
        assert_eq!(report.failures(), vec![(3, "broker down")]);
        assert_eq!(report.stopped.map(|r| r.id()), Some(5));
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn empty_report() {
        let report = ReconciliationReport::new();
        assert!(report.is_empty());
        assert!(report.failures().is_empty());
        assert!(report.stopped.is_none());
    }
}
