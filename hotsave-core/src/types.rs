//! Identifiers used on the control plane.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `(applicationId, signalId)` pair a persistent subscriber announces once
/// after connecting. Serialized as `"{applicationId}-{signalId}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
    application_id: String,
    signal_id: String,
}

impl SubscriptionKey {
    pub fn new(application_id: impl Into<String>, signal_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            signal_id: signal_id.into(),
        }
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn signal_id(&self) -> &str {
        &self.signal_id
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.application_id, self.signal_id)
    }
}
