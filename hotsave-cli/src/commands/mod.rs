pub mod agent;
pub mod config;
pub mod listen;
pub mod query;
pub mod schedule;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use hotsave_core::{HotsaveConfig, QueryResponse};

pub fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub fn load_config(home: &std::path::Path) -> Result<HotsaveConfig> {
    HotsaveConfig::load_at(home).context("failed to load ~/.hotsave/config.yaml")
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// Print a successful answer; turn anything else into a failing exit.
pub fn report(response: &QueryResponse) -> Result<()> {
    if !response.is_ok() {
        bail!("daemon answered {}", response.as_str().red());
    }
    let body = response.body();
    if body.is_empty() {
        println!("{}", "ok".green());
    } else {
        println!("{body}");
    }
    Ok(())
}
