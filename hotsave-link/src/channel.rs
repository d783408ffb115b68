//! Persistent subscriber for daemon broadcasts.

use std::net::SocketAddr;
use std::sync::Arc;

use hotsave_core::{HotsaveConfig, SubscriptionKey};

use crate::reconnect::ReconnectPolicy;
use crate::supervisor::Supervisor;
use crate::transport::{MessageListener, TransportOptions};

/// Subscribes with its key and forwards every inbound message to one
/// handler. Reconnects with backoff when the link drops.
pub struct SignalChannel {
    supervisor: Arc<Supervisor>,
    handler: MessageListener,
}

impl SignalChannel {
    pub fn new(
        addr: SocketAddr,
        key: SubscriptionKey,
        options: TransportOptions,
        policy: ReconnectPolicy,
        handler: MessageListener,
    ) -> Self {
        Self {
            supervisor: Supervisor::new("signal", addr, key, options, policy),
            handler,
        }
    }

    pub fn from_config(config: &HotsaveConfig, handler: MessageListener) -> Self {
        Self::new(
            config.signal_addr(),
            config.signal_key(),
            TransportOptions::from_config(config),
            ReconnectPolicy::from(&config.reconnect),
            handler,
        )
    }

    pub fn start(&self) {
        self.supervisor.start(self.handler.clone());
    }

    /// Close the link and stop reconnecting. Safe if never started.
    pub async fn stop(&self) {
        self.supervisor.stop().await;
    }

    pub async fn is_connected(&self) -> bool {
        self.supervisor.is_connected().await
    }

    pub fn key(&self) -> &SubscriptionKey {
        self.supervisor.key()
    }
}
