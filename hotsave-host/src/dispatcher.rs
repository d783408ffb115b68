//! Routes inbound broadcasts to the coordinator.

use std::sync::Arc;

use hotsave_core::{Broadcast, Event, EventKind};
use hotsave_link::MessageListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::coordinator::Coordinator;

pub struct Dispatcher {
    coordinator: Arc<Coordinator>,
}

impl Dispatcher {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    /// Handle one raw broadcast to completion.
    pub async fn dispatch(&self, raw: &str) {
        match Broadcast::classify(raw) {
            Broadcast::SaveTrigger => {
                tracing::info!("save trigger received");
                self.coordinator.handle_save_trigger().await;
            }
            Broadcast::Event(event) => self.route(&event).await,
            Broadcast::Unrouted(fields) => {
                if !fields.is_empty() {
                    tracing::debug!(keys = fields.len(), "broadcast without an event; ignored");
                }
            }
        }
    }

    async fn route(&self, event: &Event) {
        tracing::debug!(event = %event.kind, "dispatching");
        match &event.kind {
            EventKind::Handshake => self.coordinator.handle_handshake(event).await,
            EventKind::PreHotBackup => self.coordinator.handle_pre_hot_backup().await,
            EventKind::PreHotRestore => {
                self.coordinator.handle_pre_hot_restore().await;
            }
            EventKind::RestoreFinished => self.coordinator.handle_restore_finished(event),
            EventKind::RejoinWorld => self.coordinator.handle_rejoin_world(event),
            EventKind::BackupStarted
            | EventKind::RestoreStarted
            | EventKind::BackupSuccess
            | EventKind::BackupFailed
            | EventKind::GameSessionEnd
            | EventKind::AutoBackupStarted
            | EventKind::SnapshotCompleted => self.coordinator.announce(event),
            EventKind::Unknown(name) => tracing::warn!(event = %name, "unknown event ignored"),
        }
    }

    /// Start a task that handles broadcasts one at a time in arrival order.
    ///
    /// Returns the listener to hand to the signal channel; it only enqueues,
    /// so the transport's read loop never waits on a handler.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> (MessageListener, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let listener: MessageListener = Arc::new(move |message: String| {
            if tx.send(message).is_err() {
                tracing::debug!("dispatcher stopped; broadcast dropped");
            }
        });

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = rx.recv() => match message {
                        Some(message) => self.dispatch(&message).await,
                        None => break,
                    },
                    _ = shutdown.recv() => {
                        tracing::debug!("dispatcher shutting down");
                        break;
                    }
                }
            }
        });

        (listener, handle)
    }
}
