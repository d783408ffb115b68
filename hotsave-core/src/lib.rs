//! hotsave core library: the data model shared by the control-plane link
//! and the host-side coordinator.
//!
//! - [`types`] / [`version`] / [`folder`]: identifiers and their validation
//! - [`payload`] / [`event`] / [`packet`] / [`command`]: wire grammar
//! - [`state`]: restore coordination state
//! - [`schedule`] / [`config`] / [`paths`]: persisted local records

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod folder;
pub mod packet;
pub mod paths;
pub mod payload;
pub mod schedule;
pub mod state;
pub mod types;
pub mod version;

pub use command::DaemonCommand;
pub use config::{Framing, HotsaveConfig, ReconnectSettings, RejoinSettings};
pub use error::CoreError;
pub use event::{Event, EventKind};
pub use folder::FolderId;
pub use packet::{QueryPacket, QueryResponse, ResponderPacket, PACKET_DELIMITER};
pub use payload::{parse_payload, Broadcast, SAVE_TRIGGER};
pub use schedule::ScheduleRecord;
pub use state::{Phase, RestoreState};
pub use types::SubscriptionKey;
pub use version::{is_compatible, Version};
