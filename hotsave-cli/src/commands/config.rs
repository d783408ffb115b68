//! `hotsave config`: inspect or create the local configuration.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tabled::{settings::Style, Table, Tabled};

use hotsave_core::paths::config_path;
use hotsave_core::HotsaveConfig;

use super::{home, load_config};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show {
        /// Raw YAML instead of a summary table.
        #[arg(long)]
        yaml: bool,
    },
    /// Write a configuration file with every default filled in.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "setting")]
    setting: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let home = home()?;

    match command {
        ConfigCommand::Show { yaml } => {
            let config = load_config(&home)?;
            if yaml {
                let text = serde_yaml::to_string(&config).context("failed to render config")?;
                print!("{text}");
                return Ok(());
            }
            println!("{}", config_path(&home).display());
            let mut table = Table::new(rows(&config));
            table.with(Style::rounded());
            println!("{table}");
        }
        ConfigCommand::Init { force } => {
            let path = config_path(&home);
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            HotsaveConfig::default()
                .save_at(&home)
                .context("failed to write config")?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}

fn rows(config: &HotsaveConfig) -> Vec<SettingRow> {
    let row = |setting, value: String| SettingRow { setting, value };
    vec![
        row("signal", config.signal_addr().to_string()),
        row("query", config.query_addr().to_string()),
        row("signal key", config.signal_key().to_string()),
        row("responder key", config.responder_key().to_string()),
        row("socket id", config.socket_id.clone()),
        row("framing", format!("{:?}", config.framing).to_lowercase()),
        row(
            "heartbeat",
            format!(
                "after {} ms, every {} ms",
                config.heartbeat_initial_delay_ms, config.heartbeat_interval_ms
            ),
        ),
        row("query timeout", format!("{} ms", config.query_timeout_ms)),
        row("query cooldown", format!("{} ms", config.query_cooldown_ms)),
        row("restore settle", format!("{} ms", config.restore_settle_ms)),
        row(
            "reconnect",
            format!(
                "{}..{} ms x{}",
                config.reconnect.initial_delay_ms,
                config.reconnect.max_delay_ms,
                config.reconnect.backoff_multiplier
            ),
        ),
        row(
            "rejoin",
            format!(
                "settle {} ticks, {} retries",
                config.rejoin.settle_ticks, config.rejoin.max_retries
            ),
        ),
    ]
}
