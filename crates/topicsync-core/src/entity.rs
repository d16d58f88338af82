//! Catalog registration entities.
//!
//! A registration is one sensor/device endpoint held by the metadata
//! catalog. Only the catalog id and the owning organization are consumed
//! here; everything else is carried through untouched.

use serde_json::{Map, Value};

/// Keys under which catalogs report the entity id, in lookup order.
const ID_KEYS: [&str; 2] = ["@iot.id", "id"];

/// A registered sensor/device endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationEntity {
    /// Catalog-assigned id
    pub id: u64,
    /// Owning organization (`properties.owner`)
    pub owner_id: String,
    /// The full entity document as returned by the catalog
    pub document: Map<String, Value>,
}

impl RegistrationEntity {
    /// Build an entity from a catalog JSON document.
    ///
    /// # Errors
    ///
    /// Returns error if the document is not an object, has no integer id,
    /// or has no `properties.owner`.
    pub fn from_json(value: Value) -> Result<Self, EntityError> {
        let Value::Object(document) = value else {
            return Err(EntityError::InvalidPayload(
                "entity document is not a JSON object".to_string(),
            ));
        };

        let id = ID_KEYS
            .iter()
            .find_map(|key| document.get(*key))
            .and_then(parse_id)
            .ok_or(EntityError::MissingId)?;

        let owner_id = document
            .get("properties")
            .and_then(|p| p.get("owner"))
            .and_then(owner_to_string)
            .ok_or(EntityError::MissingOwner { id })?;

        Ok(Self {
            id,
            owner_id,
            document,
        })
    }

    /// The entity's display name, if the catalog has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.document.get("name").and_then(Value::as_str)
    }

    /// The entity document as JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.document.clone())
    }
}

// Some catalogs serialize ids as strings.
fn parse_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn owner_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Errors raised when a catalog document is not a usable registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    /// No integer id present
    #[error("entity has no integer id")]
    MissingId,
    /// No owner present
    #[error("entity {id} has no properties.owner")]
    MissingOwner {
        /// Id of the offending entity
        id: u64,
    },
    /// Document is not an entity at all
    #[error("invalid entity payload: {0}")]
    InvalidPayload(String),
}
