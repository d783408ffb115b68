//! Persistent responder answering requests the daemon initiates.
//!
//! Inbound messages are `{correlationId}&*&{data}`; the handler's answer is
//! written back under the same correlation id.

use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use hotsave_core::{HotsaveConfig, QueryResponse, ResponderPacket, SubscriptionKey};

use crate::error::LinkError;
use crate::reconnect::ReconnectPolicy;
use crate::supervisor::Supervisor;
use crate::transport::{MessageListener, TransportOptions};

/// Computes the reply for one inbound request body.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, data: &str) -> String;
}

impl<F> RequestHandler for F
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    fn handle(&self, data: &str) -> String {
        self(data)
    }
}

pub struct QueryResponder {
    supervisor: Arc<Supervisor>,
    handler: Arc<dyn RequestHandler>,
}

impl QueryResponder {
    pub fn new(
        addr: SocketAddr,
        key: SubscriptionKey,
        options: TransportOptions,
        policy: ReconnectPolicy,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        Self {
            supervisor: Supervisor::new("responder", addr, key, options, policy),
            handler,
        }
    }

    /// Uses the signal port with the responder subscription key.
    pub fn from_config(config: &HotsaveConfig, handler: Arc<dyn RequestHandler>) -> Self {
        Self::new(
            config.signal_addr(),
            config.responder_key(),
            TransportOptions::from_config(config),
            ReconnectPolicy::from(&config.reconnect),
            handler,
        )
    }

    pub fn start(&self) {
        let supervisor = Arc::downgrade(&self.supervisor);
        let handler = self.handler.clone();
        let listener: MessageListener =
            Arc::new(move |raw: String| on_request(&supervisor, &handler, &raw));
        self.supervisor.start(listener);
    }

    pub async fn stop(&self) {
        self.supervisor.stop().await;
    }

    pub async fn is_connected(&self) -> bool {
        self.supervisor.is_connected().await
    }

    /// Write `{correlationId}&*&{data}` on the live session.
    pub async fn send_back(&self, data: &str, correlation_id: &str) -> Result<(), LinkError> {
        let packet = ResponderPacket::new(correlation_id, data);
        self.supervisor.send(&packet.to_string()).await
    }
}

fn on_request(supervisor: &Weak<Supervisor>, handler: &Arc<dyn RequestHandler>, raw: &str) {
    let packet = match ResponderPacket::decode(raw) {
        Ok(packet) => packet,
        Err(err) => {
            tracing::warn!(error = %err, "dropping responder message");
            return;
        }
    };

    let reply = catch_unwind(AssertUnwindSafe(|| handler.handle(&packet.data)))
        .unwrap_or_else(|_| {
            tracing::error!(correlation_id = %packet.correlation_id, "request handler panicked");
            QueryResponse::error("HANDLER_FAILED").to_string()
        });

    let Some(supervisor) = supervisor.upgrade() else {
        return;
    };
    tokio::spawn(async move {
        let answer = ResponderPacket::new(packet.correlation_id, reply);
        if let Err(err) = supervisor.send(&answer.to_string()).await {
            tracing::warn!(
                correlation_id = %answer.correlation_id,
                error = %err,
                "failed to send response",
            );
        }
    });
}
