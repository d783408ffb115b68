//! A [`Host`] that runs headless and reports every capability call.
//!
//! There is no embedded session to save or reopen, so each call is logged
//! and answered as if it succeeded.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::Colorize;
use tokio::sync::Notify;

use hotsave_core::FolderId;
use hotsave_host::{Host, HostError, Notice, Severity, Topology};

pub struct ConsoleHost {
    topology: Topology,
    dataset: Option<PathBuf>,
    name: Option<String>,
    session_open: AtomicBool,
    terminate: Arc<Notify>,
}

impl ConsoleHost {
    pub fn new(
        topology: Topology,
        dataset: Option<PathBuf>,
        name: Option<String>,
        terminate: Arc<Notify>,
    ) -> Self {
        Self {
            topology,
            dataset,
            name,
            session_open: AtomicBool::new(true),
            terminate,
        }
    }
}

impl Host for ConsoleHost {
    fn topology(&self) -> Topology {
        self.topology
    }

    fn flush_all(&self) -> Result<(), HostError> {
        tracing::info!("flush requested");
        Ok(())
    }

    fn participants(&self) -> Vec<String> {
        Vec::new()
    }

    fn disconnect_participant(&self, participant: &str, reason: &str) -> Result<(), HostError> {
        tracing::info!(participant, reason, "disconnect requested");
        Ok(())
    }

    fn terminate(&self) {
        tracing::warn!("host termination requested");
        self.terminate.notify_one();
    }

    fn dataset_root(&self) -> Option<PathBuf> {
        self.dataset.clone()
    }

    fn dataset_display_name(&self) -> Option<String> {
        self.name.clone()
    }

    fn is_session_open(&self) -> bool {
        self.session_open.load(Ordering::SeqCst)
    }

    fn close_session(&self) -> Result<(), HostError> {
        tracing::info!("session closed");
        self.session_open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn open_session(&self, folder: &FolderId) -> Result<(), HostError> {
        tracing::info!(folder = %folder, "session opened");
        self.session_open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn notify(&self, notice: &Notice) {
        let message = match notice.severity {
            Severity::Info => notice.message.normal(),
            Severity::Success => notice.message.green(),
            Severity::Warning => notice.message.yellow(),
            Severity::Error => notice.message.red(),
        };
        println!(
            "{} {message}",
            notice.at.format("%H:%M:%S").to_string().bright_black()
        );
    }

    fn offer_manual_selection(&self) {
        println!("{}", "automatic rejoin gave up; open the world manually".yellow());
    }
}
