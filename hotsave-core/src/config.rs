//! Local configuration for the control-plane link and rejoin timings.
//!
//! Stored as YAML at `~/.hotsave/config.yaml`. Every field has a default,
//! so a missing or partial file is valid.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::paths::config_path;
use crate::types::SubscriptionKey;

/// How messages are delimited on the persistent channel and query socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// One read is one message; text is written verbatim. This is what the
    /// daemon speaks unless it was built with line framing.
    #[default]
    Raw,
    /// `\n`-terminated messages, reassembled across reads.
    Newline,
}

/// Backoff applied by the channel supervisor between reconnects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// 0 = unlimited.
    pub max_attempts: u32,
    pub jitter: bool,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            max_attempts: 0,
            jitter: true,
        }
    }
}

/// Tick-based timings for the client rejoin controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RejoinSettings {
    /// Length of one host scheduling tick.
    pub tick_millis: u64,
    /// Ticks to wait after arming before touching the session.
    pub settle_ticks: u32,
    /// Ticks to wait after teardown is observed before reopening.
    pub teardown_ticks: u32,
    /// Ticks after which a teardown that never completes counts as a failure.
    pub teardown_timeout_ticks: u32,
    pub max_retries: u32,
}

impl Default for RejoinSettings {
    fn default() -> Self {
        Self {
            tick_millis: 50,
            settle_ticks: 40,
            teardown_ticks: 20,
            teardown_timeout_ticks: 200,
            max_retries: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotsaveConfig {
    pub application_id: String,
    pub signal_id: String,
    pub socket_id: String,
    pub responder_signal_id: String,
    pub host: IpAddr,
    pub signal_port: u16,
    pub query_port: u16,
    pub framing: Framing,
    pub heartbeat_initial_delay_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub query_timeout_ms: u64,
    pub query_cooldown_ms: u64,
    /// Delay between vacating the dataset and acknowledging it.
    pub restore_settle_ms: u64,
    pub reconnect: ReconnectSettings,
    pub rejoin: RejoinSettings,
}

impl Default for HotsaveConfig {
    fn default() -> Self {
        Self {
            application_id: "0x00000020".to_string(),
            signal_id: "0x00000020".to_string(),
            socket_id: "0x00000010".to_string(),
            responder_signal_id: "0x00000030".to_string(),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            signal_port: 6372,
            query_port: 6376,
            framing: Framing::Raw,
            heartbeat_initial_delay_ms: 180_000,
            heartbeat_interval_ms: 180_000,
            query_timeout_ms: 5_000,
            query_cooldown_ms: 5_000,
            restore_settle_ms: 450,
            reconnect: ReconnectSettings::default(),
            rejoin: RejoinSettings::default(),
        }
    }
}

impl HotsaveConfig {
    pub fn signal_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.signal_port)
    }

    pub fn query_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.query_port)
    }

    pub fn signal_key(&self) -> SubscriptionKey {
        SubscriptionKey::new(&self.application_id, &self.signal_id)
    }

    pub fn responder_key(&self) -> SubscriptionKey {
        SubscriptionKey::new(&self.application_id, &self.responder_signal_id)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn query_cooldown(&self) -> Duration {
        Duration::from_millis(self.query_cooldown_ms)
    }

    pub fn restore_settle(&self) -> Duration {
        Duration::from_millis(self.restore_settle_ms)
    }

    /// Load `~/.hotsave/config.yaml` under `home`, or defaults when absent.
    pub fn load_at(home: &Path) -> Result<Self, CoreError> {
        let path = config_path(home);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| CoreError::ConfigParse { path, source })
    }

    /// Save atomically: serialize → `.yaml.tmp` sibling → rename.
    pub fn save_at(&self, home: &Path) -> Result<(), CoreError> {
        let path = config_path(home);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let tmp_path = path.with_extension("yaml.tmp");
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
        Ok(())
    }
}
