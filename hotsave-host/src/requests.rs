//! Answers for requests the daemon sends through the responder.

use std::sync::Arc;

use hotsave_core::QueryResponse;
use hotsave_link::RequestHandler;

use crate::coordinator::Coordinator;

/// `PING`, `STATUS`, and an error for everything else.
pub struct StatusRequests {
    coordinator: Arc<Coordinator>,
}

impl StatusRequests {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    fn status(&self) -> QueryResponse {
        match serde_json::to_string(&self.coordinator.snapshot()) {
            Ok(json) => QueryResponse::ok(json),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialise status");
                QueryResponse::error("STATUS_UNAVAILABLE")
            }
        }
    }
}

impl RequestHandler for StatusRequests {
    fn handle(&self, data: &str) -> String {
        let verb = data.split_whitespace().next().unwrap_or_default();
        let response = match verb.to_ascii_uppercase().as_str() {
            "PING" => QueryResponse::ok("pong"),
            "STATUS" => self.status(),
            _ => {
                tracing::debug!(request = data, "unknown responder request");
                QueryResponse::error("UNKNOWN_COMMAND")
            }
        };
        response.to_string()
    }
}
