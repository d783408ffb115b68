//! Structured broadcast events.

use std::collections::HashMap;
use std::fmt;

/// Every event name the daemon is known to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Handshake,
    PreHotBackup,
    PreHotRestore,
    RestoreFinished,
    RejoinWorld,
    BackupStarted,
    RestoreStarted,
    BackupSuccess,
    BackupFailed,
    GameSessionEnd,
    AutoBackupStarted,
    SnapshotCompleted,
    Unknown(String),
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "handshake" => Self::Handshake,
            "pre_hot_backup" => Self::PreHotBackup,
            "pre_hot_restore" => Self::PreHotRestore,
            "restore_finished" => Self::RestoreFinished,
            "rejoin_world" => Self::RejoinWorld,
            "backup_started" => Self::BackupStarted,
            "restore_started" => Self::RestoreStarted,
            "backup_success" => Self::BackupSuccess,
            "backup_failed" => Self::BackupFailed,
            "game_session_end" => Self::GameSessionEnd,
            "auto_backup_started" => Self::AutoBackupStarted,
            "snapshot_completed" => Self::SnapshotCompleted,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Handshake => "handshake",
            Self::PreHotBackup => "pre_hot_backup",
            Self::PreHotRestore => "pre_hot_restore",
            Self::RestoreFinished => "restore_finished",
            Self::RejoinWorld => "rejoin_world",
            Self::BackupStarted => "backup_started",
            Self::RestoreStarted => "restore_started",
            Self::BackupSuccess => "backup_success",
            Self::BackupFailed => "backup_failed",
            Self::GameSessionEnd => "game_session_end",
            Self::AutoBackupStarted => "auto_backup_started",
            Self::SnapshotCompleted => "snapshot_completed",
            Self::Unknown(name) => name,
        }
    }

    /// Events that only produce a user notice and never move state.
    pub fn is_presentation_only(&self) -> bool {
        matches!(
            self,
            Self::BackupStarted
                | Self::RestoreStarted
                | Self::BackupSuccess
                | Self::BackupFailed
                | Self::GameSessionEnd
                | Self::AutoBackupStarted
                | Self::SnapshotCompleted
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed broadcast: its kind plus every other field it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    fields: HashMap<String, String>,
}

impl Event {
    /// Build from parsed fields; hands the map back when `event` is absent.
    pub fn from_fields(
        mut fields: HashMap<String, String>,
    ) -> Result<Self, HashMap<String, String>> {
        match fields.remove("event") {
            Some(name) => Ok(Self {
                kind: EventKind::from_name(&name),
                fields,
            }),
            None => Err(fields),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }
}
