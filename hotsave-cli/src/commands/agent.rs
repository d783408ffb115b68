//! `hotsave agent`: the host-side stack with a console host.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::Notify;

use hotsave_host::{Agent, Host, HostContext, Topology};

use super::{home, load_config, runtime};
use crate::console::ConsoleHost;

#[derive(Args, Debug)]
pub struct AgentArgs {
    /// Act as a multi-user server: a restore stops the agent.
    #[arg(long)]
    pub multi_user: bool,

    /// Directory inside the live dataset, used to resolve its folder id.
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Display name of the dataset.
    #[arg(long)]
    pub name: Option<String>,
}

impl AgentArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let config = load_config(&home)?;
        let topology = if self.multi_user {
            Topology::MultiUser
        } else {
            Topology::SingleUser
        };
        let terminate = Arc::new(Notify::new());
        let host: Arc<dyn Host> = Arc::new(ConsoleHost::new(
            topology,
            self.dataset,
            self.name,
            terminate.clone(),
        ));

        runtime()?.block_on(async move {
            let context =
                HostContext::dedicated("hotsave-host").context("failed to start host thread")?;
            let mut agent = Agent::start(&config, &home, host, context);
            agent.drive_ticks();

            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("failed to listen for ctrl-c")?;
                }
                _ = terminate.notified() => {
                    tracing::info!("host terminated for restore");
                }
            }
            agent.shutdown().await;
            Ok(())
        })
    }
}
