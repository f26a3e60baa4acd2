//! Public types for the inbound mail API
use serde::{Deserialize, Serialize};

use crate::email::Processed;
use crate::threads::Decision;

/// What the relay worker gets back for each inbound message.
#[derive(Debug, Serialize, Deserialize)]
pub struct InboundResponse {
    pub status: String,
    pub reason: String,
    /// True exactly when the message should be forwarded.
    pub forward: bool,
    pub thread_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatched: Option<bool>,
}

impl From<&Processed> for InboundResponse {
    fn from(processed: &Processed) -> Self {
        let decision = &processed.outcome.decision;
        Self {
            status: decision.label().to_string(),
            reason: decision.reason().to_string(),
            forward: matches!(decision, Decision::Allow { .. }),
            thread_key: processed.outcome.key.to_string(),
            dispatched: processed.dispatched,
        }
    }
}
