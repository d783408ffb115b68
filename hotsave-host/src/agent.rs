//! Host-side runtime: the coordinator plus every link it needs.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hotsave_core::{DaemonCommand, HotsaveConfig, QueryResponse, ScheduleRecord};
use hotsave_link::{QueryClient, QueryResponder, SignalChannel, SingleFlight};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::capability::Host;
use crate::context::HostContext;
use crate::coordinator::{Coordinator, CoordinatorSettings};
use crate::dispatcher::Dispatcher;
use crate::error::HostError;
use crate::requests::StatusRequests;
use crate::schedule::Scheduler;

pub struct Agent {
    coordinator: Arc<Coordinator>,
    context: HostContext,
    channel: SignalChannel,
    responder: QueryResponder,
    client: QueryClient,
    listings: SingleFlight,
    scheduler: Arc<Scheduler>,
    tick_period: Duration,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
    resume: JoinHandle<()>,
}

impl Agent {
    /// Wire the coordinator to the daemon and start both persistent links.
    ///
    /// A stored auto-backup schedule is re-issued in the background.
    pub fn start(
        config: &HotsaveConfig,
        home: &Path,
        host: Arc<dyn Host>,
        context: HostContext,
    ) -> Self {
        let client = QueryClient::from_config(config);
        let coordinator = Coordinator::new(
            host,
            context.clone(),
            client.clone(),
            CoordinatorSettings::from_config(config),
        );
        let (shutdown_tx, _) = broadcast::channel::<()>(4);

        let (listener, dispatcher_handle) =
            Dispatcher::new(coordinator.clone()).spawn(shutdown_tx.subscribe());
        let channel = SignalChannel::from_config(config, listener);
        channel.start();
        coordinator.link_started();

        let responder = QueryResponder::from_config(
            config,
            Arc::new(StatusRequests::new(coordinator.clone())),
        );
        responder.start();

        let scheduler = Arc::new(Scheduler::new(client.clone(), home));
        let resume_handle = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                if let Err(err) = scheduler.resume().await {
                    tracing::warn!(error = %err, "could not read stored schedule");
                }
            })
        };

        tracing::info!(
            signal = %config.signal_addr(),
            query = %config.query_addr(),
            key = %channel.key(),
            "agent started",
        );

        Self {
            coordinator,
            context,
            channel,
            responder,
            listings: SingleFlight::new(client.clone(), config.query_cooldown()),
            client,
            scheduler,
            tick_period: Duration::from_millis(config.rejoin.tick_millis.max(1)),
            shutdown_tx,
            tasks: vec![dispatcher_handle],
            resume: resume_handle,
        }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub async fn is_connected(&self) -> bool {
        self.channel.is_connected().await
    }

    /// Send a user command to the daemon. Listings are coalesced; schedule
    /// changes update the stored record.
    pub async fn command(&self, command: &DaemonCommand) -> Result<QueryResponse, HostError> {
        match command {
            cmd if cmd.is_listing() => Ok(self.listings.query(&cmd.to_string()).await),
            DaemonCommand::AutoBackup {
                config_id,
                world_index,
                interval_minutes,
            } => {
                let record = ScheduleRecord {
                    config_id: *config_id,
                    world_index: *world_index,
                    interval_minutes: *interval_minutes,
                };
                self.scheduler.start(record).await
            }
            DaemonCommand::StopAutoBackup {
                config_id,
                world_index,
            } => self.scheduler.stop(*config_id, *world_index).await,
            other => Ok(self.client.send(other).await),
        }
    }

    /// Drive the rejoin controller once. Call from the host's own thread.
    pub fn tick(&self) {
        self.coordinator.tick();
    }

    /// For hosts without their own scheduler: run [`Agent::tick`] on the
    /// host context every `rejoin.tick_millis`.
    pub fn drive_ticks(&mut self) {
        let coordinator = self.coordinator.clone();
        let context = self.context.clone();
        let period = self.tick_period;
        let mut shutdown = self.shutdown_tx.subscribe();
        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let coordinator = coordinator.clone();
                        if let Err(err) = context.call(move || coordinator.tick()).await {
                            tracing::error!(error = %err, "tick failed; stopping tick driver");
                            break;
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        }));
    }

    pub fn cancel_rejoin(&self) {
        self.coordinator.cancel_rejoin();
    }

    /// Stop both links and every background task.
    ///
    /// The dispatcher finishes the broadcast it is handling and any stop
    /// acknowledgement it scheduled is delivered before the links close.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        self.resume.abort();
        for task in self.tasks {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "agent task ended abnormally");
            }
        }
        self.coordinator.pending_acks().await;
        self.channel.stop().await;
        self.responder.stop().await;
        tracing::info!("agent stopped");
    }
}
