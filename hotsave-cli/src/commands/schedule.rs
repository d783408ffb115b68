//! `hotsave auto-backup` / `hotsave stop-auto-backup`.

use anyhow::{bail, Context, Result};
use clap::Args;

use hotsave_core::ScheduleRecord;
use hotsave_host::Scheduler;
use hotsave_link::QueryClient;

use super::{home, load_config, report, runtime};

#[derive(Args, Debug)]
pub struct AutoBackupArgs {
    pub config: u32,
    pub world: u32,
    /// Minutes between backups.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub minutes: u32,
}

impl AutoBackupArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let config = load_config(&home)?;
        let scheduler = Scheduler::new(QueryClient::from_config(&config), &home);
        let record = ScheduleRecord {
            config_id: self.config,
            world_index: self.world,
            interval_minutes: self.minutes,
        };

        let response = runtime()?
            .block_on(scheduler.start(record))
            .context("failed to store auto-backup schedule")?;
        report(&response)
    }
}

/// Without a target, stops the stored schedule.
#[derive(Args, Debug)]
pub struct StopAutoBackupArgs {
    #[arg(requires = "world")]
    pub config: Option<u32>,
    pub world: Option<u32>,
}

impl StopAutoBackupArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let config = load_config(&home)?;
        let scheduler = Scheduler::new(QueryClient::from_config(&config), &home);

        let (config_id, world_index) = match (self.config, self.world) {
            (Some(config_id), Some(world_index)) => (config_id, world_index),
            _ => match scheduler.stored().context("failed to read stored schedule")? {
                Some(record) => (record.config_id, record.world_index),
                None => bail!("no auto-backup schedule is stored; pass CONFIG and WORLD"),
            },
        };

        let response = runtime()?
            .block_on(scheduler.stop(config_id, world_index))
            .context("failed to clear auto-backup schedule")?;
        report(&response)
    }
}
