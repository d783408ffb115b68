//! Commands the host sends to the daemon over the query endpoint.
//!
//! Each renders as a space-separated verb plus arguments.

use std::fmt;

/// A daemon-bound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonCommand {
    ListConfigs,
    ListWorlds {
        config_id: u32,
    },
    ListBackups {
        config_id: u32,
        world_index: u32,
    },
    Backup {
        config_id: u32,
        world_index: u32,
        comment: Option<String>,
    },
    /// Back up whatever dataset the host currently has open.
    BackupCurrent {
        comment: Option<String>,
    },
    Restore {
        config_id: u32,
        world_index: u32,
        file: String,
    },
    /// Restore the currently open dataset from a backup file.
    RestoreCurrent {
        file: String,
    },
    AutoBackup {
        config_id: u32,
        world_index: u32,
        interval_minutes: u32,
    },
    StopAutoBackup {
        config_id: u32,
        world_index: u32,
    },
    /// Attach a backup into the external snapshot index.
    AddToSnapshot {
        config_id: u32,
        world_index: u32,
        file: String,
    },
    /// Acknowledges a `pre_hot_backup` flush.
    WorldSaved,
    /// Acknowledges that a `pre_hot_restore` flush and vacate finished.
    WorldSaveAndExitComplete,
    HandshakeResponse {
        version: String,
    },
}

impl DaemonCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::ListConfigs => "LIST_CONFIGS",
            Self::ListWorlds { .. } => "LIST_WORLDS",
            Self::ListBackups { .. } => "LIST_BACKUPS",
            Self::Backup { .. } => "BACKUP",
            Self::BackupCurrent { .. } => "BACKUP_CURRENT",
            Self::Restore { .. } => "RESTORE",
            Self::RestoreCurrent { .. } => "RESTORE_CURRENT",
            Self::AutoBackup { .. } => "AUTO_BACKUP",
            Self::StopAutoBackup { .. } => "STOP_AUTO_BACKUP",
            Self::AddToSnapshot { .. } => "ADD_TO_SNAPSHOT",
            Self::WorldSaved => "WORLD_SAVED",
            Self::WorldSaveAndExitComplete => "WORLD_SAVE_AND_EXIT_COMPLETE",
            Self::HandshakeResponse { .. } => "HANDSHAKE_RESPONSE",
        }
    }

    /// Read-only listings that are safe to coalesce.
    pub fn is_listing(&self) -> bool {
        matches!(
            self,
            Self::ListConfigs | Self::ListWorlds { .. } | Self::ListBackups { .. }
        )
    }
}

impl fmt::Display for DaemonCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())?;
        match self {
            Self::ListConfigs | Self::WorldSaved | Self::WorldSaveAndExitComplete => Ok(()),
            Self::ListWorlds { config_id } => write!(f, " {config_id}"),
            Self::ListBackups {
                config_id,
                world_index,
            }
            | Self::StopAutoBackup {
                config_id,
                world_index,
            } => write!(f, " {config_id} {world_index}"),
            Self::Backup {
                config_id,
                world_index,
                comment,
            } => {
                write!(f, " {config_id} {world_index}")?;
                write_comment(f, comment.as_deref())
            }
            Self::BackupCurrent { comment } => write_comment(f, comment.as_deref()),
            Self::Restore {
                config_id,
                world_index,
                file,
            }
            | Self::AddToSnapshot {
                config_id,
                world_index,
                file,
            } => write!(f, " {config_id} {world_index} {file}"),
            Self::RestoreCurrent { file } => write!(f, " {file}"),
            Self::AutoBackup {
                config_id,
                world_index,
                interval_minutes,
            } => write!(f, " {config_id} {world_index} {interval_minutes}"),
            Self::HandshakeResponse { version } => write!(f, " {version}"),
        }
    }
}

fn write_comment(f: &mut fmt::Formatter<'_>, comment: Option<&str>) -> fmt::Result {
    match comment.map(str::trim) {
        Some(text) if !text.is_empty() => write!(f, " {text}"),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_verb_and_arguments() {
        assert_eq!(DaemonCommand::ListConfigs.to_string(), "LIST_CONFIGS");
        assert_eq!(
            DaemonCommand::ListBackups {
                config_id: 1,
                world_index: 3
            }
            .to_string(),
            "LIST_BACKUPS 1 3"
        );
        assert_eq!(
            DaemonCommand::Restore {
                config_id: 0,
                world_index: 2,
                file: "[Full][2024-01-01]Alpha.7z".into()
            }
            .to_string(),
            "RESTORE 0 2 [Full][2024-01-01]Alpha.7z"
        );
        assert_eq!(
            DaemonCommand::AutoBackup {
                config_id: 1,
                world_index: 0,
                interval_minutes: 15
            }
            .to_string(),
            "AUTO_BACKUP 1 0 15"
        );
        assert_eq!(
            DaemonCommand::HandshakeResponse {
                version: "1.4.0".into()
            }
            .to_string(),
            "HANDSHAKE_RESPONSE 1.4.0"
        );
    }

    #[test]
    fn comment_is_optional_and_free_text() {
        let with = DaemonCommand::Backup {
            config_id: 0,
            world_index: 0,
            comment: Some("before the boss fight".into()),
        };
        assert_eq!(with.to_string(), "BACKUP 0 0 before the boss fight");

        let blank = DaemonCommand::BackupCurrent {
            comment: Some("   ".into()),
        };
        assert_eq!(blank.to_string(), "BACKUP_CURRENT");
    }

    #[test]
    fn only_listings_coalesce() {
        assert!(DaemonCommand::ListConfigs.is_listing());
        assert!(!DaemonCommand::WorldSaved.is_listing());
    }
}
