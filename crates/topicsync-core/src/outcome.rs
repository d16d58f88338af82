//! Provisioning outcomes and response classification.
//!
//! Every admin backend hands its raw response to [`classify`], so that
//! "already exists" is recognised the same way for direct creation and
//! for reconciliation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kafka protocol error code for `TOPIC_ALREADY_EXISTS`.
pub const TOPIC_ALREADY_EXISTS: i32 = 36;

/// Result of a single topic creation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ProvisionOutcome {
    /// The topic was newly created
    Created,
    /// The topic was already registered on the broker
    AlreadyExists,
    /// The broker rejected or could not complete the request
    Failed(String),
}

impl ProvisionOutcome {
    /// Whether broker state now satisfies the request.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Created | Self::AlreadyExists)
    }

    /// Whether the attempt failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::Failed(detail) => write!(f, "failed: {detail}"),
        }
    }
}

/// Raw response from a broker admin operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerResponse {
    /// Free-text output of an admin tool
    Text(String),
    /// Structured admin protocol result
    Code {
        /// Kafka protocol error code (0 = no error)
        code: i32,
        /// Diagnostic message accompanying the code
        message: String,
    },
}

/// Classify a broker response into a [`ProvisionOutcome`].
///
/// Rules, in order: newly created, already exists, anything else failed.
///
/// # Examples
///
/// ```
/// use topicsync_core::{classify, BrokerResponse, ProvisionOutcome};
///
/// let out = BrokerResponse::Text("Created topic eu.ChannelID_1.CompanyID_acme.\n".into());
/// assert_eq!(classify(&out), ProvisionOutcome::Created);
/// ```
#[must_use]
pub fn classify(response: &BrokerResponse) -> ProvisionOutcome {
    match response {
        BrokerResponse::Text(text) => classify_text(text),
        BrokerResponse::Code { code: 0, .. } => ProvisionOutcome::Created,
        BrokerResponse::Code {
            code: TOPIC_ALREADY_EXISTS,
            ..
        } => ProvisionOutcome::AlreadyExists,
        BrokerResponse::Code { code, message } => {
            ProvisionOutcome::Failed(format!("error code {code}: {message}"))
        }
    }
}

fn classify_text(text: &str) -> ProvisionOutcome {
    // Tools print warnings ahead of the result line.
    if text
        .lines()
        .any(|line| line.trim_start().starts_with("Created topic"))
    {
        return ProvisionOutcome::Created;
    }

    if text.contains("already exists") {
        return ProvisionOutcome::AlreadyExists;
    }

    ProvisionOutcome::Failed(text.trim().to_string())
}
