//! `hotsave listen`: print every broadcast until interrupted.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tokio::sync::mpsc;

use hotsave_core::Broadcast;
use hotsave_link::{MessageListener, SignalChannel};

use super::{home, load_config, runtime};

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// One JSON object per broadcast.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct BroadcastJson<'a> {
    at: String,
    kind: &'static str,
    event: Option<&'a str>,
    fields: BTreeMap<&'a str, &'a str>,
}

impl ListenArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let config = load_config(&home)?;

        runtime()?.block_on(async move {
            let (tx, mut rx) = mpsc::unbounded_channel::<String>();
            let listener: MessageListener = Arc::new(move |message: String| {
                let _ = tx.send(message);
            });
            let channel = SignalChannel::from_config(&config, listener);
            channel.start();
            eprintln!(
                "listening on {} as {} (ctrl-c to stop)",
                config.signal_addr(),
                channel.key()
            );

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            let result = loop {
                tokio::select! {
                    message = rx.recv() => match message {
                        Some(message) => {
                            if let Err(err) = self.print(&message) {
                                break Err(err);
                            }
                        }
                        None => break Ok(()),
                    },
                    _ = &mut ctrl_c => break Ok(()),
                }
            };
            channel.stop().await;
            result
        })
    }

    fn print(&self, raw: &str) -> Result<()> {
        let broadcast = Broadcast::classify(raw);
        let (kind, event, fields) = match &broadcast {
            Broadcast::SaveTrigger => ("save_trigger", None, BTreeMap::new()),
            Broadcast::Event(event) => (
                "event",
                Some(event.kind.name()),
                sorted(event.fields().iter()),
            ),
            Broadcast::Unrouted(fields) => ("unrouted", None, sorted(fields.iter())),
        };

        if self.json {
            let line = serde_json::to_string(&BroadcastJson {
                at: Local::now().to_rfc3339(),
                kind,
                event,
                fields,
            })
            .context("failed to render broadcast JSON")?;
            println!("{line}");
            return Ok(());
        }

        let stamp = Local::now().format("%H:%M:%S").to_string();
        let label = match (kind, event) {
            ("save_trigger", _) => "save".yellow().bold().to_string(),
            (_, Some(name)) => name.cyan().bold().to_string(),
            _ => "-".bright_black().to_string(),
        };
        let pairs: Vec<String> = fields
            .iter()
            .filter(|(key, _)| **key != "event")
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        println!("{} {label} {}", stamp.bright_black(), pairs.join(" "));
        Ok(())
    }
}

fn sorted<'a>(
    fields: impl Iterator<Item = (&'a String, &'a String)>,
) -> BTreeMap<&'a str, &'a str> {
    fields.map(|(k, v)| (k.as_str(), v.as_str())).collect()
}
