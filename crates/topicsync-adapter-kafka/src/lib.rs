//! # Kafka Adapter
//!
//! Topic administration against a Kafka broker.
//!
//! Backends:
//! - [`KafkaTopicsCli`]: drives the `kafka-topics` admin tool
//! - `KafkaAdmin`: native admin protocol client (feature `rdkafka`)
//! - [`MemoryAdmin`]: in-process broker state for tests
//!
//! Every backend makes exactly one attempt per call and hands the raw
//! response to [`topicsync_core::classify`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod admin;
pub mod cli;
pub mod memory;
#[cfg(feature = "rdkafka")]
pub mod native;

pub use admin::{AdminError, TopicAdmin};
pub use cli::{Connect, KafkaTopicsCli, KafkaTopicsCliConfig};
pub use memory::MemoryAdmin;
#[cfg(feature = "rdkafka")]
pub use native::{KafkaAdmin, KafkaAdminConfig};
