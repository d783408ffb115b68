//! One-shot daemon commands.

use anyhow::Result;
use clap::Args;

use hotsave_core::DaemonCommand;
use hotsave_link::QueryClient;

use super::{home, load_config, report, runtime};

#[derive(Args, Debug)]
pub struct WorldsArgs {
    /// Configuration id as listed by `hotsave configs`.
    pub config: u32,
}

impl WorldsArgs {
    pub fn command(&self) -> DaemonCommand {
        DaemonCommand::ListWorlds {
            config_id: self.config,
        }
    }
}

/// A world inside a configuration.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Configuration id.
    pub config: u32,
    /// World index inside the configuration.
    pub world: u32,
}

impl TargetArgs {
    pub fn list_backups(&self) -> DaemonCommand {
        DaemonCommand::ListBackups {
            config_id: self.config,
            world_index: self.world,
        }
    }
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    #[arg(long, requires = "world")]
    pub config: Option<u32>,
    #[arg(long, requires = "config")]
    pub world: Option<u32>,
    /// Free-text note stored with the backup.
    #[arg(long)]
    pub comment: Option<String>,
}

impl BackupArgs {
    pub fn command(self) -> DaemonCommand {
        match (self.config, self.world) {
            (Some(config_id), Some(world_index)) => DaemonCommand::Backup {
                config_id,
                world_index,
                comment: self.comment,
            },
            _ => DaemonCommand::BackupCurrent {
                comment: self.comment,
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Backup file name as listed by `hotsave backups`.
    pub file: String,
    #[arg(long, requires = "world")]
    pub config: Option<u32>,
    #[arg(long, requires = "config")]
    pub world: Option<u32>,
}

impl RestoreArgs {
    pub fn command(self) -> DaemonCommand {
        match (self.config, self.world) {
            (Some(config_id), Some(world_index)) => DaemonCommand::Restore {
                config_id,
                world_index,
                file: self.file,
            },
            _ => DaemonCommand::RestoreCurrent { file: self.file },
        }
    }
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = home()?;
    let config = load_config(&home)?;
    let client = QueryClient::from_config(&config);

    tracing::debug!(command = %command, addr = %config.query_addr(), "sending");
    let response = runtime()?.block_on(client.send(&command));
    report(&response)
}
