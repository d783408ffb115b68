//! Restore coordination state shared between the dispatcher and the
//! rejoin path.

use serde::Serialize;

use crate::folder::FolderId;

/// Where the host is in a backup/restore exchange with the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    HandshakePending,
    Ready,
    BackupInFlight,
    RestorePreparing,
    WaitingForStopAck,
    Restoring,
    WaitingForRejoinSignal,
    Rejoining,
}

impl Phase {
    /// Phases during which the dataset is vacated or being swapped.
    pub fn is_restore_in_progress(self) -> bool {
        matches!(
            self,
            Self::RestorePreparing
                | Self::WaitingForStopAck
                | Self::Restoring
                | Self::WaitingForRejoinSignal
                | Self::Rejoining
        )
    }
}

/// Process-wide restore bookkeeping. Reset to [`Default`] on restore
/// completion, failure, or cancellation; the handshake fields survive a
/// reset via [`RestoreState::clear_restore`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RestoreState {
    pub waiting_for_stop_ack: bool,
    pub level_id_to_rejoin: Option<FolderId>,
    pub is_restoring: bool,
    pub handshake_completed: bool,
    pub peer_version: Option<String>,
    pub version_compatible: bool,
    pub required_min_version: Option<String>,
}

impl RestoreState {
    /// Drop every restore-related field, keeping the handshake outcome.
    pub fn clear_restore(&mut self) {
        self.waiting_for_stop_ack = false;
        self.level_id_to_rejoin = None;
        self.is_restoring = false;
    }
}
