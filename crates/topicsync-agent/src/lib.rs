//! # topicsync Agent
//!
//! Provisioning agent that keeps one broker topic per registered entity.
//!
//! ## Architecture
//!
//! The agent runs two concurrent parts:
//! 1. **HTTP API**: status, direct topic creation and contract ingestion
//! 2. **Reconciliation**: a delayed, one-shot catalog scan that recreates
//!    the topic of every entity it reaches
//!
//! Both share [`provision::provision`], so every topic is created with the
//! same [`topicsync_core::TopicPolicy`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod ingest;
pub mod provision;
pub mod reconcile;
pub mod runtime;
pub mod server;

pub use config::{AdminBackend, AdminConfig, AgentConfig, ReconcileConfig, ServerConfig};
pub use ingest::{ContractIngestion, IngestError, Ingested};
pub use reconcile::{ReconcileTask, Reconciler};
pub use runtime::{build_admin, Agent};
pub use server::{AppState, Server, ServerError};
