//! Backup/restore orchestration.
//!
//! The coordinator owns the restore state, the phase, and the rejoin
//! controller behind one lock, so every transition is atomic and readers
//! see whole snapshots. Blocking host work runs on the [`HostContext`];
//! acknowledgements go to the daemon through the [`QueryClient`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hotsave_core::{
    is_compatible, DaemonCommand, Event, FolderId, HotsaveConfig, Phase, RejoinSettings,
    RestoreState,
};
use hotsave_link::QueryClient;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::capability::{Host, Topology};
use crate::context::HostContext;
use crate::error::HostError;
use crate::notice::{Notice, NoticeKind};
use crate::rejoin::{RejoinAction, RejoinController, RejoinOutcome, RejoinState};

/// Version this host reports during the handshake.
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Handshake field carrying the daemon's own version.
const FIELD_PEER_VERSION: &str = "version";
/// Handshake field carrying the minimum host version the daemon accepts.
const FIELD_MIN_VERSION: &str = "min_mod_version";

const DISCONNECT_REASON: &str = "World is being restored from a backup";

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub host_version: String,
    /// Pause between vacating the dataset and acknowledging it.
    pub restore_settle: Duration,
    pub rejoin: RejoinSettings,
}

impl CoordinatorSettings {
    pub fn from_config(config: &HotsaveConfig) -> Self {
        Self {
            host_version: HOST_VERSION.to_string(),
            restore_settle: config.restore_settle(),
            rejoin: config.rejoin.clone(),
        }
    }
}

/// Point-in-time copy of everything the coordinator tracks.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub restore: RestoreState,
    pub rejoin: RejoinState,
}

struct Inner {
    phase: Phase,
    link_started: bool,
    restore: RestoreState,
    rejoin: RejoinController,
    warned_versions: HashSet<String>,
}

impl Inner {
    fn resting_phase(&self) -> Phase {
        if self.restore.handshake_completed {
            Phase::Ready
        } else if self.link_started {
            Phase::HandshakePending
        } else {
            Phase::Idle
        }
    }

    fn reset_restore(&mut self) {
        self.restore.clear_restore();
        self.rejoin.reset();
        self.phase = self.resting_phase();
    }
}

pub struct Coordinator {
    host: Arc<dyn Host>,
    context: HostContext,
    daemon: QueryClient,
    settings: CoordinatorSettings,
    inner: Mutex<Inner>,
    /// Stop acknowledgements still sleeping out the settle delay.
    acks: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    pub fn new(
        host: Arc<dyn Host>,
        context: HostContext,
        daemon: QueryClient,
        settings: CoordinatorSettings,
    ) -> Arc<Self> {
        let rejoin = RejoinController::new(settings.rejoin.clone());
        Arc::new(Self {
            host,
            context,
            daemon,
            settings,
            inner: Mutex::new(Inner {
                phase: Phase::Idle,
                link_started: false,
                restore: RestoreState::default(),
                rejoin,
                warned_versions: HashSet::new(),
            }),
            acks: Mutex::new(Vec::new()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            phase: inner.phase,
            restore: inner.restore.clone(),
            rejoin: inner.rejoin.state().clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// The signal channel is up; a handshake is now expected.
    pub fn link_started(&self) {
        let mut inner = self.lock();
        inner.link_started = true;
        if inner.phase == Phase::Idle {
            inner.phase = Phase::HandshakePending;
        }
    }

    // ----------------------------------------------------------------------
    // Event reactions
    // ----------------------------------------------------------------------

    pub async fn handle_handshake(&self, event: &Event) {
        let peer_version = event.get(FIELD_PEER_VERSION).map(str::to_string);
        let required = event.get(FIELD_MIN_VERSION).map(str::to_string);
        let compatible = required
            .as_deref()
            .map_or(true, |required| is_compatible(&self.settings.host_version, required));

        let first_warning = {
            let mut inner = self.lock();
            inner.restore.handshake_completed = true;
            inner.restore.peer_version = peer_version.clone();
            inner.restore.required_min_version = required.clone();
            inner.restore.version_compatible = compatible;
            if matches!(inner.phase, Phase::Idle | Phase::HandshakePending) {
                inner.phase = Phase::Ready;
            }
            !compatible
                && inner
                    .warned_versions
                    .insert(peer_version.clone().unwrap_or_default())
        };

        tracing::info!(
            peer_version = peer_version.as_deref().unwrap_or("unknown"),
            required = required.as_deref().unwrap_or("none"),
            host_version = %self.settings.host_version,
            compatible,
            "handshake received",
        );

        if first_warning {
            self.host.notify(&Notice::new(
                NoticeKind::VersionMismatch,
                &[
                    ("peer", peer_version.as_deref().unwrap_or("?")),
                    ("required", required.as_deref().unwrap_or("?")),
                    ("current", &self.settings.host_version),
                ],
            ));
        }

        let reply = DaemonCommand::HandshakeResponse {
            version: self.settings.host_version.clone(),
        };
        self.acknowledge(&reply).await;
    }

    /// The literal save trigger: flush now and report, no acknowledgement.
    pub async fn handle_save_trigger(&self) {
        match self.flush().await {
            Ok(()) => self.notify(NoticeKind::SaveCompleted, &[]),
            Err(err) => {
                tracing::error!(error = %err, "save trigger flush failed");
                self.notify(NoticeKind::HotBackupFailed, &[("error", &err.to_string())]);
            }
        }
    }

    pub async fn handle_pre_hot_backup(&self) {
        let previous = {
            let mut inner = self.lock();
            if inner.phase.is_restore_in_progress() {
                tracing::warn!(phase = ?inner.phase, "pre_hot_backup during restore ignored");
                return;
            }
            std::mem::replace(&mut inner.phase, Phase::BackupInFlight)
        };
        self.notify(NoticeKind::HotBackupPreparing, &[]);

        let flushed = self.flush().await;
        {
            let mut inner = self.lock();
            if inner.phase == Phase::BackupInFlight {
                inner.phase = previous;
            }
        }

        match flushed {
            Ok(()) => {
                self.notify(NoticeKind::HotBackupSaved, &[]);
                self.acknowledge(&DaemonCommand::WorldSaved).await;
            }
            Err(err) => {
                tracing::error!(error = %err, "flush before hot backup failed; not acknowledging");
                self.notify(NoticeKind::HotBackupFailed, &[("error", &err.to_string())]);
            }
        }
    }

    /// Vacate the dataset for a restore. Returns `false` when a restore is
    /// already under way and the event was a duplicate.
    pub async fn handle_pre_hot_restore(self: &Arc<Self>) -> bool {
        {
            let mut inner = self.lock();
            if inner.restore.is_restoring {
                tracing::debug!("duplicate pre_hot_restore ignored");
                return false;
            }
            inner.restore.is_restoring = true;
            inner.restore.waiting_for_stop_ack = true;
            inner.phase = Phase::RestorePreparing;
        }
        self.notify(NoticeKind::RestorePreparing, &[]);

        let host = Arc::clone(&self.host);
        let topology = host.topology();
        let vacated = match topology {
            Topology::MultiUser => self
                .context
                .call(move || vacate_multi_user(host.as_ref()))
                .await
                .map(|()| None),
            Topology::SingleUser => self
                .context
                .call(move || vacate_single_user(host.as_ref()))
                .await
                .map(Some),
        };

        {
            let mut inner = self.lock();
            match vacated {
                Ok(folder) => {
                    if let Some(folder) = folder {
                        tracing::info!(folder = %folder, "stored folder id for rejoin");
                        inner.restore.level_id_to_rejoin = Some(folder);
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, ?topology, "vacating dataset failed; acknowledging anyway");
                }
            }
            if inner.phase == Phase::RestorePreparing {
                inner.phase = Phase::WaitingForStopAck;
            }
        }

        self.schedule_stop_ack();
        true
    }

    pub fn handle_restore_finished(&self, event: &Event) {
        if event.get("status") != Some("success") {
            self.lock().reset_restore();
            tracing::warn!(status = event.get("status").unwrap_or("missing"), "restore did not succeed");
            self.notify(
                NoticeKind::RestoreFailed,
                &[("error", event.get("error").unwrap_or("unknown error"))],
            );
            return;
        }

        if self.host.topology() == Topology::MultiUser {
            self.lock().reset_restore();
            self.notify_event(NoticeKind::RestoreSuccess, event);
            return;
        }

        let armed = {
            let mut inner = self.lock();
            let target = inner
                .restore
                .level_id_to_rejoin
                .clone()
                .or_else(|| world_from(event));
            match target {
                Some(target) => {
                    inner.restore.waiting_for_stop_ack = false;
                    inner.restore.level_id_to_rejoin = Some(target.clone());
                    inner.rejoin.arm(target.clone());
                    inner.phase = Phase::WaitingForRejoinSignal;
                    Some(target)
                }
                None => {
                    inner.reset_restore();
                    None
                }
            }
        };

        match armed {
            Some(target) => self.notify(NoticeKind::RestoreSuccess, &[("world", target.as_str())]),
            None => {
                tracing::warn!("restore finished but no folder id to rejoin");
                self.notify_event(NoticeKind::RestoreSuccess, event);
                self.host.offer_manual_selection();
            }
        }
    }

    /// Daemon-initiated rejoin, independent of `restore_finished`.
    pub fn handle_rejoin_world(&self, event: &Event) {
        let Some(target) = world_from(event) else {
            tracing::warn!("rejoin_world without a usable world");
            return;
        };
        let mut inner = self.lock();
        inner.restore.level_id_to_rejoin = Some(target.clone());
        inner.rejoin.arm(target);
        inner.phase = Phase::WaitingForRejoinSignal;
    }

    /// Presentation-only events: notify, never transition.
    pub fn announce(&self, event: &Event) {
        if let Some(notice) = Notice::for_event(event) {
            self.host.notify(&notice);
        }
    }

    // ----------------------------------------------------------------------
    // Rejoin driving (host thread)
    // ----------------------------------------------------------------------

    /// Called by the host once per scheduling tick, on its own thread.
    pub fn tick(&self) {
        let session_open = self.host.is_session_open();
        let action = {
            let mut inner = self.lock();
            let action = inner.rejoin.poll(session_open);
            if matches!(
                action,
                RejoinAction::RequestTeardown
                    | RejoinAction::Reopen(_)
                    | RejoinAction::TeardownTimedOut
            ) {
                inner.phase = Phase::Rejoining;
            }
            action
        };

        match action {
            RejoinAction::Idle | RejoinAction::Waiting => {}
            RejoinAction::RequestTeardown => {
                tracing::info!("closing the open session before rejoining");
                if let Err(err) = self.host.close_session() {
                    tracing::warn!(error = %err, "session teardown request failed");
                }
            }
            RejoinAction::TeardownTimedOut => {
                tracing::warn!("old session never closed");
                self.finish_attempt(false, None);
            }
            RejoinAction::Reopen(folder) => {
                let opened = self.host.open_session(&folder);
                if let Err(err) = &opened {
                    tracing::warn!(folder = %folder, error = %err, "reopening session failed");
                }
                self.finish_attempt(opened.is_ok(), Some(&folder));
            }
        }
    }

    /// Abandon any pending restore or rejoin immediately.
    pub fn cancel_rejoin(&self) {
        self.lock().reset_restore();
        tracing::info!("rejoin cancelled");
    }

    fn finish_attempt(&self, success: bool, folder: Option<&FolderId>) {
        let (outcome, max) = {
            let mut inner = self.lock();
            let max = inner.rejoin.max_retries();
            let outcome = inner.rejoin.record_attempt(success);
            match outcome {
                RejoinOutcome::Rejoined | RejoinOutcome::Exhausted => inner.reset_restore(),
                RejoinOutcome::Retrying { .. } => inner.phase = Phase::WaitingForRejoinSignal,
            }
            (outcome, max)
        };

        let world = folder.map_or("?", FolderId::as_str);
        match outcome {
            RejoinOutcome::Rejoined => {
                tracing::info!(world, "rejoined");
                self.notify(NoticeKind::RejoinSucceeded, &[("world", world)]);
            }
            RejoinOutcome::Retrying { attempt } => {
                self.notify(
                    NoticeKind::RejoinRetrying,
                    &[
                        ("world", world),
                        ("attempt", &attempt.to_string()),
                        ("max", &max.to_string()),
                    ],
                );
            }
            RejoinOutcome::Exhausted => {
                self.notify(NoticeKind::RejoinAbandoned, &[("world", world)]);
                self.host.offer_manual_selection();
            }
        }
    }

    // ----------------------------------------------------------------------
    // Helpers
    // ----------------------------------------------------------------------

    async fn flush(&self) -> Result<(), HostError> {
        let host = Arc::clone(&self.host);
        self.context.call(move || host.flush_all()).await?
    }

    /// Send after the settle delay on a detached task; not cancellable.
    /// Wait for every scheduled stop acknowledgement to reach the daemon.
    ///
    /// A multi-user host usually exits right after vacating; the daemon
    /// still needs `WORLD_SAVE_AND_EXIT_COMPLETE` before it can restore.
    pub async fn pending_acks(&self) {
        let handles = std::mem::take(&mut *self.acks.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "stop acknowledgement task failed");
            }
        }
    }

    fn schedule_stop_ack(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(this.settings.restore_settle).await;
            this.acknowledge(&DaemonCommand::WorldSaveAndExitComplete)
                .await;
            let mut inner = this.lock();
            if inner.phase == Phase::WaitingForStopAck {
                inner.phase = Phase::Restoring;
            }
        });
        let mut acks = self.acks.lock().unwrap_or_else(PoisonError::into_inner);
        acks.retain(|ack| !ack.is_finished());
        acks.push(handle);
    }

    async fn acknowledge(&self, command: &DaemonCommand) {
        let response = self.daemon.send(command).await;
        if response.is_transport_failure() {
            tracing::warn!(command = %command, response = %response, "acknowledgement not delivered");
        } else {
            tracing::debug!(command = %command, response = %response, "acknowledged");
        }
    }

    fn notify(&self, kind: NoticeKind, args: &[(&str, &str)]) {
        self.host.notify(&Notice::new(kind, args));
    }

    fn notify_event(&self, kind: NoticeKind, event: &Event) {
        let args: Vec<(&str, &str)> = event
            .fields()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.notify(kind, &args);
    }
}

fn world_from(event: &Event) -> Option<FolderId> {
    let raw = event.get("world")?;
    match FolderId::parse(raw) {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::warn!(error = %err, "event carried an unusable world");
            None
        }
    }
}

/// Flush, disconnect everyone (each isolated), then stop the process.
fn vacate_multi_user(host: &dyn Host) {
    if let Err(err) = host.flush_all() {
        tracing::error!(error = %err, "flush before restore failed");
    }
    for participant in host.participants() {
        if let Err(err) = host.disconnect_participant(&participant, DISCONNECT_REASON) {
            tracing::warn!(participant = %participant, error = %err, "disconnect failed; continuing");
        }
    }
    tracing::info!("terminating host for restore");
    host.terminate();
}

/// Resolve the folder id, flush, and leave the local session.
fn vacate_single_user(host: &dyn Host) -> FolderId {
    let root = host.dataset_root();
    let display_name = host.dataset_display_name();
    let folder = FolderId::resolve(root.as_deref(), display_name.as_deref());

    if let Err(err) = host.flush_all() {
        tracing::error!(error = %err, "flush before restore failed");
    }
    if let Err(err) = host.close_session() {
        tracing::error!(error = %err, "leaving session before restore failed");
    }
    folder
}
