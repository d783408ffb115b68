//! Reconnecting wrapper around [`Transport`] shared by the signal channel
//! and the query responder.
//!
//! The supervisor connects, announces its subscription key, and waits for
//! the transport to drop; then it backs off and starts over. Every
//! successful reconnect re-issues the subscription key.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use hotsave_core::SubscriptionKey;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

use crate::error::LinkError;
use crate::reconnect::ReconnectPolicy;
use crate::transport::{MessageListener, Transport, TransportOptions};

pub(crate) struct Supervisor {
    name: &'static str,
    addr: SocketAddr,
    key: SubscriptionKey,
    options: TransportOptions,
    policy: ReconnectPolicy,
    current: RwLock<Option<Arc<Transport>>>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl Supervisor {
    pub(crate) fn new(
        name: &'static str,
        addr: SocketAddr,
        key: SubscriptionKey,
        options: TransportOptions,
        policy: ReconnectPolicy,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = broadcast::channel(4);
        Arc::new(Self {
            name,
            addr,
            key,
            options,
            policy,
            current: RwLock::new(None),
            shutdown_tx,
            task: Mutex::new(None),
            stopped: AtomicBool::new(false),
        })
    }

    pub(crate) fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    /// Spawn the supervising task. A second call while running is a no-op.
    pub(crate) fn start(self: &Arc<Self>, listener: MessageListener) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!(channel = self.name, "already started");
            return;
        }
        self.stopped.store(false, Ordering::SeqCst);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let this = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            this.supervise(listener, shutdown_rx).await;
        }));
    }

    /// Stop supervising and close the live transport. Safe before `start`.
    pub(crate) async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());

        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::warn!(channel = self.name, error = %err, "supervisor task join failure");
            }
        }

        if let Some(transport) = self.current.write().await.take() {
            transport.close().await;
        }
    }

    pub(crate) async fn is_connected(&self) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(|transport| transport.is_alive())
    }

    /// Write through the live transport.
    pub(crate) async fn send(&self, text: &str) -> Result<(), LinkError> {
        let transport = self.current.read().await.clone();
        match transport {
            Some(transport) => transport.send(text).await,
            None => Err(LinkError::NotConnected),
        }
    }

    async fn supervise(
        self: Arc<Self>,
        listener: MessageListener,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut attempt = 0u32;

        loop {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }

            let connected = tokio::select! {
                _ = shutdown_rx.recv() => break,
                connected = self.connect_and_subscribe(listener.clone()) => connected,
            };

            match connected {
                Ok(transport) => {
                    attempt = 0;
                    tracing::info!(
                        channel = self.name,
                        addr = %self.addr,
                        key = %self.key,
                        "subscribed",
                    );

                    let stopping = tokio::select! {
                        _ = shutdown_rx.recv() => true,
                        _ = transport.closed() => false,
                    };
                    self.current.write().await.take();
                    transport.close().await;
                    if stopping {
                        break;
                    }
                    tracing::warn!(channel = self.name, "connection lost, reconnecting");
                }
                Err(err) => {
                    tracing::warn!(channel = self.name, addr = %self.addr, error = %err, "connect failed");
                }
            }

            attempt = attempt.saturating_add(1);
            if !self.policy.should_retry(attempt) {
                tracing::error!(channel = self.name, attempt, "giving up reconnecting");
                break;
            }
            let delay = self.policy.delay_for_attempt(attempt);
            tracing::debug!(
                channel = self.name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "waiting before reconnect",
            );
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect_and_subscribe(
        &self,
        listener: MessageListener,
    ) -> Result<Arc<Transport>, LinkError> {
        let transport = Transport::connect(self.addr, &self.options, listener).await?;
        // Published before subscribing so replies to the first request have a writer.
        *self.current.write().await = Some(transport.clone());
        if let Err(err) = transport.send(&self.key.to_string()).await {
            self.current.write().await.take();
            transport.close().await;
            return Err(err);
        }
        Ok(transport)
    }
}
