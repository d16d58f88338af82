//! # Catalog Adapter
//!
//! Reads and writes registration entities in the external metadata catalog
//! (an OGC SensorThings-style HTTP API).
//!
//! - `GET {base}/{collection}({id})?$expand=...` fetches one entity; any
//!   non-success status means the id does not exist.
//! - `POST {base}/{collection}` registers a new entity.
//!
//! Neither call retries. Timeouts and connection failures surface as
//! [`CatalogError::Unavailable`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod memory;

pub use client::{Catalog, CatalogClient, CatalogClientConfig, CatalogError, KeyStyle};
pub use memory::MemoryCatalog;
