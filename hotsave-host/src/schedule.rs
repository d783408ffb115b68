//! Auto-backup schedule commands that keep the local record in step.

use std::path::PathBuf;

use hotsave_core::{DaemonCommand, QueryResponse, ScheduleRecord};
use hotsave_link::QueryClient;

use crate::error::HostError;

pub struct Scheduler {
    client: QueryClient,
    home: PathBuf,
}

impl Scheduler {
    pub fn new(client: QueryClient, home: impl Into<PathBuf>) -> Self {
        Self {
            client,
            home: home.into(),
        }
    }

    /// Ask the daemon to start a recurring backup; remember it once accepted.
    pub async fn start(&self, record: ScheduleRecord) -> Result<QueryResponse, HostError> {
        let response = self.client.send(&record.command()).await;
        if response.is_ok() {
            record.save_at(&self.home)?;
            tracing::info!(
                config_id = record.config_id,
                world_index = record.world_index,
                interval_minutes = record.interval_minutes,
                "auto-backup schedule stored",
            );
        } else {
            tracing::warn!(response = %response, "daemon rejected auto-backup; schedule not stored");
        }
        Ok(response)
    }

    /// Stop the recurring backup. The local record is cleared regardless
    /// of the daemon's answer so it is not resumed on the next start.
    pub async fn stop(&self, config_id: u32, world_index: u32) -> Result<QueryResponse, HostError> {
        let command = DaemonCommand::StopAutoBackup {
            config_id,
            world_index,
        };
        let response = self.client.send(&command).await;
        ScheduleRecord::clear_at(&self.home)?;
        tracing::info!(response = %response, "auto-backup schedule cleared");
        Ok(response)
    }

    /// Re-issue a stored schedule. `None` when nothing was stored.
    pub async fn resume(&self) -> Result<Option<QueryResponse>, HostError> {
        let Some(record) = ScheduleRecord::load_at(&self.home)? else {
            return Ok(None);
        };
        tracing::info!(
            config_id = record.config_id,
            world_index = record.world_index,
            interval_minutes = record.interval_minutes,
            "resuming stored auto-backup schedule",
        );
        let response = self.client.send(&record.command()).await;
        if !response.is_ok() {
            tracing::warn!(response = %response, "resuming auto-backup failed");
        }
        Ok(Some(response))
    }

    pub fn stored(&self) -> Result<Option<ScheduleRecord>, HostError> {
        Ok(ScheduleRecord::load_at(&self.home)?)
    }
}
