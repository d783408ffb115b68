//! hotsave: talk to the backup daemon and run the host-side agent.
//!
//! # Usage
//!
//! ```text
//! hotsave configs
//! hotsave worlds <config>
//! hotsave backups <config> <world>
//! hotsave backup [--config <id> --world <index>] [--comment <text>]
//! hotsave restore <file> [--config <id> --world <index>]
//! hotsave auto-backup <config> <world> <minutes>
//! hotsave stop-auto-backup [<config> <world>]
//! hotsave snapshot <config> <world> <file>
//! hotsave listen [--json]
//! hotsave agent [--multi-user] [--dataset <dir>] [--name <name>]
//! hotsave config show|init
//! ```

mod commands;
mod console;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    agent::AgentArgs,
    config::ConfigCommand,
    listen::ListenArgs,
    query::{BackupArgs, RestoreArgs, TargetArgs, WorldsArgs},
    schedule::{AutoBackupArgs, StopAutoBackupArgs},
};
use hotsave_core::DaemonCommand;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "hotsave",
    version,
    about = "Coordinate hot backup and restore with the backup daemon",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List backup configurations known to the daemon.
    Configs,

    /// List worlds under a configuration.
    Worlds(WorldsArgs),

    /// List backups of one world.
    Backups(TargetArgs),

    /// Back up a world, or the one currently open when no target is given.
    Backup(BackupArgs),

    /// Restore a world from a backup file.
    Restore(RestoreArgs),

    /// Start a recurring backup and remember it across restarts.
    AutoBackup(AutoBackupArgs),

    /// Stop the recurring backup and forget it.
    StopAutoBackup(StopAutoBackupArgs),

    /// Attach a backup to the external snapshot index.
    Snapshot(SnapshotArgs),

    /// Print every broadcast the daemon pushes.
    Listen(ListenArgs),

    /// Run the host-side agent with a console host.
    Agent(AgentArgs),

    /// Inspect or create ~/.hotsave/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(clap::Args, Debug)]
struct SnapshotArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Backup file name as listed by `hotsave backups`.
    file: String,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Configs => commands::query::run(DaemonCommand::ListConfigs),
        Commands::Worlds(args) => commands::query::run(args.command()),
        Commands::Backups(args) => commands::query::run(args.list_backups()),
        Commands::Backup(args) => commands::query::run(args.command()),
        Commands::Restore(args) => commands::query::run(args.command()),
        Commands::AutoBackup(args) => args.run(),
        Commands::StopAutoBackup(args) => args.run(),
        Commands::Snapshot(args) => commands::query::run(DaemonCommand::AddToSnapshot {
            config_id: args.target.config,
            world_index: args.target.world,
            file: args.file,
        }),
        Commands::Listen(args) => args.run(),
        Commands::Agent(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
