//! Persisted auto-backup schedule.
//!
//! Three integers in a flat `key=value` file under `~/.hotsave/`, reloaded
//! at host startup so a recurring schedule survives restarts.

use std::collections::HashMap;
use std::path::Path;

use crate::command::DaemonCommand;
use crate::error::{io_err, CoreError};
use crate::paths::schedule_path;

const KEY_CONFIG_ID: &str = "config_id";
const KEY_WORLD_INDEX: &str = "world_index";
const KEY_INTERVAL: &str = "interval_minutes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleRecord {
    pub config_id: u32,
    pub world_index: u32,
    pub interval_minutes: u32,
}

impl ScheduleRecord {
    /// The command that (re)starts this schedule on the daemon.
    pub fn command(&self) -> DaemonCommand {
        DaemonCommand::AutoBackup {
            config_id: self.config_id,
            world_index: self.world_index,
            interval_minutes: self.interval_minutes,
        }
    }

    /// Load the stored record. A missing, incomplete, or malformed file
    /// means no schedule; only unreadable files are errors.
    pub fn load_at(home: &Path) -> Result<Option<Self>, CoreError> {
        let path = schedule_path(home);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(&path, err)),
        };

        let values = parse_properties(&contents);
        let field = |key: &str| values.get(key).and_then(|v| v.parse::<u32>().ok());
        match (
            field(KEY_CONFIG_ID),
            field(KEY_WORLD_INDEX),
            field(KEY_INTERVAL),
        ) {
            (Some(config_id), Some(world_index), Some(interval_minutes))
                if interval_minutes > 0 =>
            {
                Ok(Some(Self {
                    config_id,
                    world_index,
                    interval_minutes,
                }))
            }
            _ => {
                tracing::warn!(path = %path.display(), "ignoring incomplete schedule record");
                Ok(None)
            }
        }
    }

    /// Write atomically via a `.tmp` sibling.
    pub fn save_at(&self, home: &Path) -> Result<(), CoreError> {
        let path = schedule_path(home);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let body = format!(
            "# hotsave auto-backup schedule\n{KEY_CONFIG_ID}={}\n{KEY_WORLD_INDEX}={}\n{KEY_INTERVAL}={}\n",
            self.config_id, self.world_index, self.interval_minutes
        );
        let tmp_path = path.with_extension("properties.tmp");
        std::fs::write(&tmp_path, body).map_err(|e| io_err(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
        Ok(())
    }

    /// Remove the stored record; a missing file is not an error.
    pub fn clear_at(home: &Path) -> Result<(), CoreError> {
        let path = schedule_path(home);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(&path, err)),
        }
    }
}

fn parse_properties(contents: &str) -> HashMap<&str, &str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn record() -> ScheduleRecord {
        ScheduleRecord {
            config_id: 2,
            world_index: 1,
            interval_minutes: 30,
        }
    }

    #[test]
    fn missing_file_is_no_schedule() {
        let home = TempDir::new().expect("home");
        assert_eq!(ScheduleRecord::load_at(home.path()).expect("load"), None);
    }

    #[test]
    fn save_load_clear() {
        let home = TempDir::new().expect("home");
        record().save_at(home.path()).expect("save");
        assert_eq!(
            ScheduleRecord::load_at(home.path()).expect("load"),
            Some(record())
        );

        ScheduleRecord::clear_at(home.path()).expect("clear");
        assert_eq!(ScheduleRecord::load_at(home.path()).expect("load"), None);
        ScheduleRecord::clear_at(home.path()).expect("clear twice");
    }

    #[test]
    fn malformed_values_are_ignored() {
        let home = TempDir::new().expect("home");
        let path = schedule_path(home.path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "config_id=two\nworld_index=1\ninterval_minutes=30\n")
            .expect("write");
        assert_eq!(ScheduleRecord::load_at(home.path()).expect("load"), None);

        std::fs::write(&path, "config_id=1\nworld_index=1\ninterval_minutes=0\n").expect("write");
        assert_eq!(ScheduleRecord::load_at(home.path()).expect("load"), None);
    }

    #[test]
    fn command_resumes_schedule() {
        assert_eq!(record().command().to_string(), "AUTO_BACKUP 2 1 30");
    }
}
