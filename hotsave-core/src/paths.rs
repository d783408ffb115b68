use std::path::{Path, PathBuf};

use crate::error::CoreError;

pub const CONFIG_FILE: &str = "config.yaml";
pub const SCHEDULE_FILE: &str = "schedule.properties";

pub fn hotsave_root(home: &Path) -> PathBuf {
    home.join(".hotsave")
}

pub fn config_path(home: &Path) -> PathBuf {
    hotsave_root(home).join(CONFIG_FILE)
}

pub fn schedule_path(home: &Path) -> PathBuf {
    hotsave_root(home).join(SCHEDULE_FILE)
}

pub fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}
