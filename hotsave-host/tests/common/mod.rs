//! Fake host and fake daemon query endpoint shared by the host tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hotsave_core::{parse_payload, Event, FolderId, Framing, RejoinSettings, PACKET_DELIMITER};
use hotsave_host::{
    Coordinator, CoordinatorSettings, Host, HostContext, HostError, Notice, NoticeKind, Topology,
};
use hotsave_link::framing::encode;
use hotsave_link::{FrameDecoder, QueryClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub flushes: usize,
    pub disconnects: Vec<String>,
    pub terminated: usize,
    pub closes: usize,
    pub opened: Vec<FolderId>,
    pub notices: Vec<NoticeKind>,
    pub manual_selections: usize,
}

impl Calls {
    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices.iter().filter(|k| **k == kind).count()
    }
}

pub struct FakeHost {
    pub topology: Topology,
    pub participants: Vec<String>,
    pub failing_participant: Option<String>,
    pub dataset_root: Option<PathBuf>,
    pub display_name: Option<String>,
    pub fail_flush: bool,
    pub fail_open: bool,
    pub session_open: AtomicBool,
    pub calls: Mutex<Calls>,
}

impl FakeHost {
    pub fn single_user(display_name: &str) -> Self {
        Self {
            topology: Topology::SingleUser,
            participants: Vec::new(),
            failing_participant: None,
            dataset_root: None,
            display_name: Some(display_name.to_string()),
            fail_flush: false,
            fail_open: false,
            session_open: AtomicBool::new(true),
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn multi_user(participants: &[&str]) -> Self {
        Self {
            topology: Topology::MultiUser,
            participants: participants.iter().map(|p| p.to_string()).collect(),
            ..Self::single_user("world")
        }
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().expect("calls").clone()
    }

    pub fn set_session_open(&self, open: bool) {
        self.session_open.store(open, Ordering::SeqCst);
    }

    fn record(&self, f: impl FnOnce(&mut Calls)) {
        f(&mut self.calls.lock().expect("calls"));
    }
}

impl Host for FakeHost {
    fn topology(&self) -> Topology {
        self.topology
    }

    fn flush_all(&self) -> Result<(), HostError> {
        self.record(|c| c.flushes += 1);
        if self.fail_flush {
            return Err(HostError::capability("flush_all", "disk full"));
        }
        Ok(())
    }

    fn participants(&self) -> Vec<String> {
        self.participants.clone()
    }

    fn disconnect_participant(&self, participant: &str, _reason: &str) -> Result<(), HostError> {
        self.record(|c| c.disconnects.push(participant.to_string()));
        if self.failing_participant.as_deref() == Some(participant) {
            return Err(HostError::capability("disconnect_participant", "already gone"));
        }
        Ok(())
    }

    fn terminate(&self) {
        self.record(|c| c.terminated += 1);
    }

    fn dataset_root(&self) -> Option<PathBuf> {
        self.dataset_root.clone()
    }

    fn dataset_display_name(&self) -> Option<String> {
        self.display_name.clone()
    }

    fn is_session_open(&self) -> bool {
        self.session_open.load(Ordering::SeqCst)
    }

    fn close_session(&self) -> Result<(), HostError> {
        self.record(|c| c.closes += 1);
        self.set_session_open(false);
        Ok(())
    }

    fn open_session(&self, folder: &FolderId) -> Result<(), HostError> {
        self.record(|c| c.opened.push(folder.clone()));
        if self.fail_open {
            return Err(HostError::capability("open_session", "level missing"));
        }
        self.set_session_open(true);
        Ok(())
    }

    fn notify(&self, notice: &Notice) {
        self.record(|c| c.notices.push(notice.kind));
    }

    fn offer_manual_selection(&self) {
        self.record(|c| c.manual_selections += 1);
    }
}

/// Query endpoint that records each command and answers `OK:ack`.
pub struct FakeDaemon {
    pub addr: SocketAddr,
    framing: Framing,
    commands: mpsc::UnboundedReceiver<String>,
}

impl FakeDaemon {
    /// Speaks the daemon's default unterminated format.
    pub async fn spawn() -> Self {
        Self::spawn_framed(Framing::Raw).await
    }

    pub async fn spawn_framed(framing: Framing) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (tx, commands) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut decoder = FrameDecoder::new(framing);
                    let mut buf = [0u8; 512];
                    loop {
                        let Ok(n) = socket.read(&mut buf).await else { return };
                        if n == 0 {
                            return;
                        }
                        if let Some(packet) = decoder.push(&buf[..n]).into_iter().next() {
                            let command = packet
                                .split_once(PACKET_DELIMITER)
                                .map(|(_, command)| command.to_string())
                                .unwrap_or(packet);
                            let _ = tx.send(command);
                            let _ = socket.write_all(&encode(framing, "OK:ack")).await;
                            return;
                        }
                    }
                });
            }
        });
        Self {
            addr,
            framing,
            commands,
        }
    }

    pub fn client(&self) -> QueryClient {
        QueryClient::new(self.addr, "0x00000020", "0x00000010")
            .with_framing(self.framing)
            .with_timeout(Duration::from_secs(1))
    }

    pub async fn next_command(&mut self) -> String {
        timeout(WAIT, self.commands.recv())
            .await
            .expect("command in time")
            .expect("daemon running")
    }

    pub async fn assert_quiet(&mut self, window: Duration) {
        if let Ok(Some(command)) = timeout(window, self.commands.recv()).await {
            panic!("unexpected command {command}");
        }
    }
}

pub fn rejoin_settings(settle_ticks: u32, max_retries: u32) -> RejoinSettings {
    RejoinSettings {
        tick_millis: 1,
        settle_ticks,
        teardown_ticks: 1,
        teardown_timeout_ticks: 20,
        max_retries,
    }
}

pub fn coordinator(
    host: &Arc<FakeHost>,
    daemon: &FakeDaemon,
    rejoin: RejoinSettings,
) -> Arc<Coordinator> {
    let host: Arc<dyn Host> = host.clone();
    Coordinator::new(
        host,
        HostContext::dedicated("test-host").expect("host context"),
        daemon.client(),
        CoordinatorSettings {
            host_version: "1.4.0".to_string(),
            restore_settle: Duration::from_millis(10),
            rejoin,
        },
    )
}

pub fn event(raw: &str) -> Event {
    Event::from_fields(parse_payload(raw)).expect("event key")
}

/// Poll `condition` until it holds or the wait runs out.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition in time");
}
