//! Persistent channels against an in-process daemon socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hotsave_core::{Framing, HotsaveConfig, SubscriptionKey};
use hotsave_link::{
    FrameDecoder, MessageListener, QueryResponder, ReconnectPolicy, RequestHandler,
    SignalChannel, TransportOptions,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn options() -> TransportOptions {
    TransportOptions {
        framing: Framing::Newline,
        heartbeat_initial_delay: Duration::from_secs(60),
        heartbeat_interval: Duration::from_secs(60),
        connect_timeout: Duration::from_secs(1),
    }
}

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
        backoff_multiplier: 2.0,
        max_attempts: 0,
        jitter: false,
    }
}

fn key() -> SubscriptionKey {
    SubscriptionKey::new("0x00000020", "0x00000020")
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    (listener, addr)
}

/// Accept one subscriber and return it with its first frame.
async fn accept_subscriber(listener: &TcpListener) -> (TcpStream, String) {
    let (mut socket, _) = timeout(WAIT, listener.accept())
        .await
        .expect("accept in time")
        .expect("accept");
    let mut decoder = FrameDecoder::new(Framing::Newline);
    let mut buf = [0u8; 256];
    loop {
        let n = socket.read(&mut buf).await.expect("read");
        assert!(n > 0, "subscriber closed before sending its key");
        if let Some(first) = decoder.push(&buf[..n]).into_iter().next() {
            return (socket, first);
        }
    }
}

fn collecting_handler() -> (MessageListener, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: MessageListener = Arc::new(move |message| {
        let _ = tx.send(message);
    });
    (handler, rx)
}

#[tokio::test]
async fn subscribes_once_and_forwards_broadcasts() {
    let (listener, addr) = bind().await;
    let (handler, mut rx) = collecting_handler();
    let channel = SignalChannel::new(addr, key(), options(), fast_policy(), handler);
    channel.start();

    let (mut daemon, subscription) = accept_subscriber(&listener).await;
    assert_eq!(subscription, "0x00000020-0x00000020");

    daemon
        .write_all(b"event=backup_started;world=Alpha\nheartbeat_response\nminebackup save\n")
        .await
        .expect("write");
    assert_eq!(
        timeout(WAIT, rx.recv()).await.expect("in time").as_deref(),
        Some("event=backup_started;world=Alpha")
    );
    assert_eq!(
        timeout(WAIT, rx.recv()).await.expect("in time").as_deref(),
        Some("minebackup save")
    );
    assert!(channel.is_connected().await);

    channel.stop().await;
    assert!(!channel.is_connected().await);
}

#[tokio::test]
async fn default_config_subscribes_and_receives_unterminated_messages() {
    let (listener, addr) = bind().await;
    let (handler, mut rx) = collecting_handler();
    let config = HotsaveConfig {
        signal_port: addr.port(),
        ..HotsaveConfig::default()
    };
    let channel = SignalChannel::from_config(&config, handler);
    channel.start();

    let (mut daemon, _) = timeout(WAIT, listener.accept())
        .await
        .expect("accept in time")
        .expect("accept");
    let mut buf = [0u8; 256];
    let n = timeout(WAIT, daemon.read(&mut buf))
        .await
        .expect("key in time")
        .expect("read");
    assert_eq!(&buf[..n], b"0x00000020-0x00000020");

    daemon.write_all(b"minebackup save").await.expect("write");
    assert_eq!(
        timeout(WAIT, rx.recv()).await.expect("in time").as_deref(),
        Some("minebackup save")
    );
    channel.stop().await;
}

#[tokio::test]
async fn resubscribes_after_the_daemon_drops_the_link() {
    let (listener, addr) = bind().await;
    let (handler, mut rx) = collecting_handler();
    let channel = SignalChannel::new(addr, key(), options(), fast_policy(), handler);
    channel.start();

    let (first, _) = accept_subscriber(&listener).await;
    drop(first);

    let (mut second, subscription) = accept_subscriber(&listener).await;
    assert_eq!(subscription, key().to_string());

    second.write_all(b"event=restore_started\n").await.expect("write");
    assert_eq!(
        timeout(WAIT, rx.recv()).await.expect("in time").as_deref(),
        Some("event=restore_started")
    );
    channel.stop().await;
}

#[tokio::test]
async fn stop_without_start_is_harmless() {
    let (_listener, addr) = bind().await;
    let (handler, _rx) = collecting_handler();
    let channel = SignalChannel::new(addr, key(), options(), fast_policy(), handler);
    channel.stop().await;
    channel.stop().await;
    assert!(!channel.is_connected().await);
}

#[tokio::test]
async fn responder_answers_under_the_same_correlation_id() {
    let (listener, addr) = bind().await;
    let handler: Arc<dyn RequestHandler> = Arc::new(|data: &str| match data {
        "PING" => "OK:pong".to_string(),
        _ => "ERROR:UNKNOWN_COMMAND".to_string(),
    });
    let responder = QueryResponder::new(
        addr,
        SubscriptionKey::new("0x00000020", "0x00000030"),
        options(),
        fast_policy(),
        handler,
    );
    responder.start();

    let (mut daemon, subscription) = accept_subscriber(&listener).await;
    assert_eq!(subscription, "0x00000020-0x00000030");

    // Malformed packets are dropped; the session stays up.
    daemon
        .write_all(b"no-delimiter\nreq-1&*&PING\nreq-2&*&DANCE\n")
        .await
        .expect("write");

    let mut decoder = FrameDecoder::new(Framing::Newline);
    let mut replies = Vec::new();
    let mut buf = [0u8; 256];
    while replies.len() < 2 {
        let n = timeout(WAIT, daemon.read(&mut buf))
            .await
            .expect("reply in time")
            .expect("read");
        assert!(n > 0, "responder closed");
        replies.extend(decoder.push(&buf[..n]));
    }
    replies.sort();
    assert_eq!(
        replies,
        vec!["req-1&*&OK:pong", "req-2&*&ERROR:UNKNOWN_COMMAND"]
    );

    responder
        .send_back("OK:unsolicited", "req-3")
        .await
        .expect("send back");
    let n = timeout(WAIT, daemon.read(&mut buf))
        .await
        .expect("in time")
        .expect("read");
    assert_eq!(decoder.push(&buf[..n]), vec!["req-3&*&OK:unsolicited"]);

    responder.stop().await;
    assert!(responder.send_back("late", "req-4").await.is_err());
}
