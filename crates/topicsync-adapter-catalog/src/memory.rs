//! In-memory catalog for tests and local runs.

use crate::client::{Catalog, CatalogError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use topicsync_core::RegistrationEntity;

#[derive(Debug, Default)]
struct State {
    entities: BTreeMap<u64, Value>,
    unavailable: BTreeSet<u64>,
    reject_writes: Option<(u16, String)>,
    writes_unavailable: bool,
    reads: Vec<u64>,
    creates: usize,
}

/// Catalog backed by a map of entity documents.
///
/// Created entities get the next id after the highest one present.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity at `id` owned by `owner`.
    pub fn insert(&self, id: u64, owner: &str) {
        self.insert_document(id, json!({"@iot.id": id, "properties": {"owner": owner}}));
    }

    /// Store a raw entity document at `id`.
    pub fn insert_document(&self, id: u64, document: Value) {
        self.lock().entities.insert(id, document);
    }

    /// Make reads of `id` fail as if the catalog were unreachable.
    pub fn fail_reads_at(&self, id: u64) {
        self.lock().unavailable.insert(id);
    }

    /// Reject every subsequent write with the given status and body.
    pub fn reject_writes(&self, status: u16, body: &str) {
        self.lock().reject_writes = Some((status, body.to_string()));
    }

    /// Make every subsequent write fail as if the catalog were unreachable.
    pub fn fail_writes(&self) {
        self.lock().writes_unavailable = true;
    }

    /// Ids read so far, in call order.
    #[must_use]
    pub fn reads(&self) -> Vec<u64> {
        self.lock().reads.clone()
    }

    /// Number of create calls so far, successful or not.
    #[must_use]
    pub fn creates(&self) -> usize {
        self.lock().creates
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn get_by_id(&self, id: u64) -> Result<Option<RegistrationEntity>, CatalogError> {
        let mut state = self.lock();
        state.reads.push(id);

        if state.unavailable.contains(&id) {
            return Err(CatalogError::Unavailable(format!(
                "connection refused reading entity {id}"
            )));
        }

        match state.entities.get(&id) {
            Some(doc) => RegistrationEntity::from_json(doc.clone())
                .map(Some)
                .map_err(CatalogError::Entity),
            None => Ok(None),
        }
    }

    async fn create(&self, payload: &Value) -> Result<Value, CatalogError> {
        let mut state = self.lock();
        state.creates += 1;

        if state.writes_unavailable {
            return Err(CatalogError::Unavailable("connection refused".to_string()));
        }
        if let Some((status, body)) = &state.reject_writes {
            return Err(CatalogError::WriteRejected {
                status: *status,
                body: body.clone(),
            });
        }

        let Value::Object(mut document) = payload.clone() else {
            return Err(CatalogError::WriteRejected {
                status: 400,
                body: "entity must be a JSON object".to_string(),
            });
        };

        let id = state.entities.keys().next_back().map_or(1, |last| last + 1);
        document.insert("@iot.id".to_string(), json!(id));
        let document = Value::Object(document);

        state.entities.insert(id, document.clone());
        Ok(document)
    }
}
