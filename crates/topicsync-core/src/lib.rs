//! # topicsync Core
//!
//! Domain model for provisioning broker topics from catalog registrations.
//!
//! This crate provides:
//! - Deterministic, broker-legal topic naming from registration metadata
//! - The fixed retention/compaction policy attached to every topic
//! - Tri-state provisioning outcomes and the single response classifier
//! - The registration entity schema and the reconciliation report
//!
//! Nothing here performs I/O; adapters and the agent build on these types.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod naming;
pub mod outcome;
pub mod policy;
pub mod report;

pub use entity::{EntityError, RegistrationEntity};
pub use naming::{resolve, sensor_topic, TopicName};
pub use outcome::{classify, BrokerResponse, ProvisionOutcome};
pub use policy::{TopicConfig, TopicPolicy};
pub use report::{ReconciliationReport, StopReason};
