//! Framed heartbeat transport.
//!
//! A TCP client to a loopback endpoint with two background tasks: a read
//! loop that decodes frames and forwards them to a listener, and a
//! heartbeat that keeps the connection warm. End of stream is the only
//! disconnect signal; [`Transport::closed`] resolves when it happens.

use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use hotsave_core::{Framing, HotsaveConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

use crate::error::{io_err, LinkError};
use crate::framing::{encode, FrameDecoder, HEARTBEAT, HEARTBEAT_ACK};

const READ_BUFFER_BYTES: usize = 8 * 1024;

/// Callback receiving every decoded inbound message.
pub type MessageListener = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub framing: Framing,
    pub heartbeat_initial_delay: Duration,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::from_config(&HotsaveConfig::default())
    }
}

impl TransportOptions {
    pub fn from_config(config: &HotsaveConfig) -> Self {
        Self {
            framing: config.framing,
            heartbeat_initial_delay: Duration::from_millis(config.heartbeat_initial_delay_ms),
            heartbeat_interval: Duration::from_millis(config.heartbeat_interval_ms),
            connect_timeout: config.query_timeout(),
        }
    }
}

pub struct Transport {
    addr: SocketAddr,
    framing: Framing,
    writer: Mutex<Option<OwnedWriteHalf>>,
    shutdown_tx: broadcast::Sender<()>,
    alive_rx: watch::Receiver<bool>,
    closed: AtomicBool,
}

impl Transport {
    /// Connect and start the read loop and heartbeat.
    pub async fn connect(
        addr: SocketAddr,
        options: &TransportOptions,
        listener: MessageListener,
    ) -> Result<Arc<Self>, LinkError> {
        let stream = timeout(options.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| LinkError::ConnectTimeout(addr))?
            .map_err(|e| io_err(format!("connect {addr}"), e))?;
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!(error = %err, "could not set TCP_NODELAY");
        }

        let (reader, writer) = stream.into_split();
        let (shutdown_tx, _) = broadcast::channel::<()>(4);
        let (alive_tx, alive_rx) = watch::channel(true);

        let transport = Arc::new(Self {
            addr,
            framing: options.framing,
            writer: Mutex::new(Some(writer)),
            shutdown_tx: shutdown_tx.clone(),
            alive_rx,
            closed: AtomicBool::new(false),
        });

        tokio::spawn(read_loop(
            reader,
            addr,
            options.framing,
            listener,
            shutdown_tx.clone(),
            shutdown_tx.subscribe(),
            alive_tx,
        ));
        tokio::spawn(heartbeat_loop(
            Arc::downgrade(&transport),
            options.heartbeat_initial_delay,
            options.heartbeat_interval,
            shutdown_tx.subscribe(),
        ));

        tracing::debug!(%addr, framing = ?options.framing, "transport connected");
        Ok(transport)
    }

    /// Write one message and flush immediately.
    pub async fn send(&self, text: &str) -> Result<(), LinkError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(LinkError::Closed)?;
        let context = || format!("write {}", self.addr);
        writer
            .write_all(&encode(self.framing, text))
            .await
            .map_err(|e| io_err(context(), e))?;
        writer.flush().await.map_err(|e| io_err(context(), e))?;
        Ok(())
    }

    /// Stop the heartbeat and the read loop and close the socket. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        tracing::debug!(addr = %self.addr, "transport closed");
    }

    pub fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && *self.alive_rx.borrow()
    }

    /// Resolves once the read loop has terminated.
    pub async fn closed(&self) {
        let mut alive = self.alive_rx.clone();
        while *alive.borrow_and_update() {
            if alive.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    addr: SocketAddr,
    framing: Framing,
    listener: MessageListener,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    alive_tx: watch::Sender<bool>,
) {
    let mut decoder = FrameDecoder::new(framing);
    let mut buf = vec![0u8; READ_BUFFER_BYTES];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            read = reader.read(&mut buf) => {
                match read {
                    Ok(0) => {
                        if let Some(tail) = decoder.finish() {
                            deliver(&listener, tail);
                        }
                        tracing::info!(%addr, "transport reached end of stream");
                        break;
                    }
                    Ok(n) => {
                        for message in decoder.push(&buf[..n]) {
                            deliver(&listener, message);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%addr, error = %err, "transport read failed");
                        break;
                    }
                }
            }
        }
    }

    // Stops the heartbeat too when the peer went away first.
    let _ = shutdown_tx.send(());
    let _ = alive_tx.send(false);
}

fn deliver(listener: &MessageListener, message: String) {
    if message.trim() == HEARTBEAT_ACK {
        tracing::trace!("heartbeat acknowledged");
        return;
    }
    if catch_unwind(AssertUnwindSafe(|| listener(message))).is_err() {
        tracing::error!("message listener panicked; continuing read loop");
    }
}

async fn heartbeat_loop(
    transport: Weak<Transport>,
    initial_delay: Duration,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + initial_delay, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                let Some(transport) = transport.upgrade() else { break };
                if let Err(err) = transport.send(HEARTBEAT).await {
                    tracing::warn!(addr = %transport.addr(), error = %err, "heartbeat send failed");
                    break;
                }
                tracing::trace!("heartbeat sent");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    use super::*;

    fn fast_options() -> TransportOptions {
        TransportOptions {
            framing: Framing::Newline,
            heartbeat_initial_delay: Duration::from_millis(20),
            heartbeat_interval: Duration::from_millis(20),
            connect_timeout: Duration::from_secs(1),
        }
    }

    fn channel_listener() -> (MessageListener, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener: MessageListener = Arc::new(move |message| {
            let _ = tx.send(message);
        });
        (listener, rx)
    }

    #[tokio::test]
    async fn forwards_messages_and_drops_heartbeat_acks() {
        let server = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = server.local_addr().expect("addr");
        let (listener, mut rx) = channel_listener();

        let transport = Transport::connect(addr, &fast_options(), listener)
            .await
            .expect("connect");
        let (mut peer, _) = server.accept().await.expect("accept");

        peer.write_all(b"heartbeat_response\nevent=backup_started\n")
            .await
            .expect("write");
        assert_eq!(rx.recv().await.as_deref(), Some("event=backup_started"));

        transport.close().await;
        transport.close().await;
        assert!(!transport.is_alive());
    }

    #[tokio::test]
    async fn sends_heartbeats_after_initial_delay() {
        let server = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = server.local_addr().expect("addr");
        let (listener, _rx) = channel_listener();

        let transport = Transport::connect(addr, &fast_options(), listener)
            .await
            .expect("connect");
        let (mut peer, _) = server.accept().await.expect("accept");

        let mut decoder = FrameDecoder::new(Framing::Newline);
        let mut buf = [0u8; 256];
        let mut beats = 0;
        while beats < 2 {
            let n = peer.read(&mut buf).await.expect("read");
            assert!(n > 0, "transport closed early");
            beats += decoder
                .push(&buf[..n])
                .iter()
                .filter(|m| m.as_str() == HEARTBEAT)
                .count();
        }
        transport.close().await;
    }

    #[tokio::test]
    async fn peer_disconnect_resolves_closed() {
        let server = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = server.local_addr().expect("addr");
        let (listener, _rx) = channel_listener();

        let transport = Transport::connect(addr, &fast_options(), listener)
            .await
            .expect("connect");
        let (peer, _) = server.accept().await.expect("accept");
        drop(peer);

        tokio::time::timeout(Duration::from_secs(2), transport.closed())
            .await
            .expect("closed in time");
        assert!(!transport.is_alive());
    }

    #[tokio::test]
    async fn panicking_listener_does_not_stop_reads() {
        let server = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = server.local_addr().expect("addr");
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: MessageListener = Arc::new(move |message: String| {
            if message == "boom" {
                panic!("listener failure");
            }
            sink.lock().expect("lock").push(message);
        });

        let transport = Transport::connect(addr, &fast_options(), listener)
            .await
            .expect("connect");
        let (mut peer, _) = server.accept().await.expect("accept");
        peer.write_all(b"boom\nafter\n").await.expect("write");
        drop(peer);

        tokio::time::timeout(Duration::from_secs(2), transport.closed())
            .await
            .expect("closed in time");
        assert_eq!(*seen.lock().expect("lock"), vec!["after".to_string()]);
    }

    #[tokio::test]
    async fn connect_failure_is_an_error() {
        let server = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = server.local_addr().expect("addr");
        drop(server);

        let (listener, _rx) = channel_listener();
        let result = Transport::connect(addr, &fast_options(), listener).await;
        assert!(result.is_err());
    }
}
