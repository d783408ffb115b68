//! Host-side half of hot backup/restore.
//!
//! The embedding application implements [`Host`] and hands it to an
//! [`Agent`]; everything else (event routing, the restore state machine,
//! automatic rejoin) lives here.

pub mod agent;
pub mod capability;
pub mod context;
pub mod coordinator;
pub mod dispatcher;
mod error;
pub mod notice;
pub mod rejoin;
pub mod requests;
pub mod schedule;

pub use agent::Agent;
pub use capability::{Host, Topology};
pub use context::{HostContext, HostJob};
pub use coordinator::{Coordinator, CoordinatorSettings, Snapshot, HOST_VERSION};
pub use dispatcher::Dispatcher;
pub use error::HostError;
pub use notice::{Notice, NoticeKind, Severity};
pub use rejoin::{RejoinAction, RejoinController, RejoinOutcome, RejoinState};
pub use requests::StatusRequests;
pub use schedule::Scheduler;
