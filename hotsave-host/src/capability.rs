//! The capability interface the embedding host implements.
//!
//! One implementation exists per host API generation; the coordinator only
//! ever talks to the host through this trait.

use std::path::PathBuf;

use hotsave_core::FolderId;

use crate::error::HostError;
use crate::notice::Notice;

/// Whether the host serves remote participants or one local session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Dedicated or shared server: vacating means stopping the process.
    MultiUser,
    /// Embedded session: vacating means leaving the session only.
    SingleUser,
}

pub trait Host: Send + Sync + 'static {
    fn topology(&self) -> Topology;

    /// Write every piece of durable state to disk. Blocking.
    fn flush_all(&self) -> Result<(), HostError>;

    /// Identifiers of every connected participant.
    fn participants(&self) -> Vec<String>;

    fn disconnect_participant(&self, participant: &str, reason: &str) -> Result<(), HostError>;

    /// Ask the embedding host process to exit.
    fn terminate(&self);

    /// A directory inside (or at) the live dataset, if one is open.
    fn dataset_root(&self) -> Option<PathBuf>;

    fn dataset_display_name(&self) -> Option<String>;

    fn is_session_open(&self) -> bool;

    /// Tear down the local session without exiting the application.
    fn close_session(&self) -> Result<(), HostError>;

    fn open_session(&self, folder: &FolderId) -> Result<(), HostError>;

    fn notify(&self, notice: &Notice);

    /// Fallback after automatic rejoin gives up.
    fn offer_manual_selection(&self) {}
}
