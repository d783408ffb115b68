//! User-facing notices broadcast by the host.
//!
//! Each notice carries a stable localization key plus an English rendering,
//! so hosts with their own translation tables can ignore `message`.

use chrono::{DateTime, Utc};
use hotsave_core::{Event, EventKind};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    BackupStarted,
    BackupSuccess,
    BackupFailed,
    RestoreStarted,
    RestoreSuccess,
    RestoreFailed,
    GameSessionEnd,
    AutoBackupStarted,
    SnapshotCompleted,
    HotBackupPreparing,
    HotBackupSaved,
    HotBackupFailed,
    SaveCompleted,
    RestorePreparing,
    RejoinSucceeded,
    RejoinRetrying,
    RejoinAbandoned,
    VersionMismatch,
}

impl NoticeKind {
    pub fn key(self) -> &'static str {
        match self {
            Self::BackupStarted => "hotsave.backup.started",
            Self::BackupSuccess => "hotsave.backup.success",
            Self::BackupFailed => "hotsave.backup.failed",
            Self::RestoreStarted => "hotsave.restore.started",
            Self::RestoreSuccess => "hotsave.restore.success",
            Self::RestoreFailed => "hotsave.restore.failed",
            Self::GameSessionEnd => "hotsave.session.end",
            Self::AutoBackupStarted => "hotsave.auto_backup.started",
            Self::SnapshotCompleted => "hotsave.snapshot.completed",
            Self::HotBackupPreparing => "hotsave.hot_backup.preparing",
            Self::HotBackupSaved => "hotsave.hot_backup.saved",
            Self::HotBackupFailed => "hotsave.hot_backup.failed",
            Self::SaveCompleted => "hotsave.save.completed",
            Self::RestorePreparing => "hotsave.restore.preparing",
            Self::RejoinSucceeded => "hotsave.rejoin.succeeded",
            Self::RejoinRetrying => "hotsave.rejoin.retrying",
            Self::RejoinAbandoned => "hotsave.rejoin.abandoned",
            Self::VersionMismatch => "hotsave.version.mismatch",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::BackupSuccess
            | Self::RestoreSuccess
            | Self::SnapshotCompleted
            | Self::HotBackupSaved
            | Self::SaveCompleted
            | Self::RejoinSucceeded => Severity::Success,
            Self::BackupFailed | Self::RestoreFailed | Self::HotBackupFailed => Severity::Error,
            Self::RejoinRetrying | Self::RejoinAbandoned | Self::VersionMismatch => {
                Severity::Warning
            }
            _ => Severity::Info,
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::BackupStarted => "Backing up world {world}...",
            Self::BackupSuccess => "Backup of {world} finished: {file}",
            Self::BackupFailed => "Backup of {world} failed: {error}",
            Self::RestoreStarted => "Restoring world {world}...",
            Self::RestoreSuccess => "Restore of {world} finished",
            Self::RestoreFailed => "Restore failed: {error}",
            Self::GameSessionEnd => "Session for {world} ended; backup may follow",
            Self::AutoBackupStarted => "Automatic backup of {world} started",
            Self::SnapshotCompleted => "Snapshot of {world} added to the index: {file}",
            Self::HotBackupPreparing => "Saving world for a live backup...",
            Self::HotBackupSaved => "World saved; backup in progress",
            Self::HotBackupFailed => "Saving for backup failed: {error}",
            Self::SaveCompleted => "World saved",
            Self::RestorePreparing => "Restore requested; saving and leaving the world...",
            Self::RejoinSucceeded => "Rejoined {world}",
            Self::RejoinRetrying => "Rejoining {world} failed, retrying ({attempt}/{max})",
            Self::RejoinAbandoned => "Could not rejoin {world}; please select it manually",
            Self::VersionMismatch => {
                "Backup daemon {peer} requires at least {required}; this host is {current}"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub severity: Severity,
    pub key: &'static str,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    /// Render `kind` with `{name}` placeholders filled from `args`.
    /// Placeholders without a value render as `?`.
    pub fn new(kind: NoticeKind, args: &[(&str, &str)]) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            key: kind.key(),
            message: render(kind.template(), args),
            at: Utc::now(),
        }
    }

    /// Notice for a presentation-only broadcast; `None` for anything else.
    pub fn for_event(event: &Event) -> Option<Self> {
        let kind = match event.kind {
            EventKind::BackupStarted => NoticeKind::BackupStarted,
            EventKind::RestoreStarted => NoticeKind::RestoreStarted,
            EventKind::BackupSuccess => NoticeKind::BackupSuccess,
            EventKind::BackupFailed => NoticeKind::BackupFailed,
            EventKind::GameSessionEnd => NoticeKind::GameSessionEnd,
            EventKind::AutoBackupStarted => NoticeKind::AutoBackupStarted,
            EventKind::SnapshotCompleted => NoticeKind::SnapshotCompleted,
            _ => return None,
        };
        let args: Vec<(&str, &str)> = event
            .fields()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        Some(Self::new(kind, &args))
    }
}

fn render(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        let value = args
            .iter()
            .find(|(key, _)| *key == name)
            .map_or("?", |(_, value)| *value);
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
