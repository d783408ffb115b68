//! One-shot request/response client for the daemon's query endpoint.
//!
//! Every call opens its own connection, writes one packet, reads one
//! response and closes. Failures never surface as errors: they come back as
//! [`QueryResponse::COMMUNICATION_FAILED`] or [`QueryResponse::NO_RESPONSE`].

use std::net::SocketAddr;
use std::time::Duration;

use hotsave_core::{DaemonCommand, Framing, HotsaveConfig, QueryPacket, QueryResponse};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};

use crate::framing::{encode, FrameDecoder};

const RESPONSE_BUFFER_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct QueryClient {
    addr: SocketAddr,
    application_id: String,
    socket_id: String,
    framing: Framing,
    timeout: Duration,
}

impl QueryClient {
    pub fn new(
        addr: SocketAddr,
        application_id: impl Into<String>,
        socket_id: impl Into<String>,
    ) -> Self {
        Self {
            addr,
            application_id: application_id.into(),
            socket_id: socket_id.into(),
            framing: Framing::default(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn from_config(config: &HotsaveConfig) -> Self {
        Self::new(config.query_addr(), &config.application_id, &config.socket_id)
            .with_framing(config.framing)
            .with_timeout(config.query_timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub async fn send(&self, command: &DaemonCommand) -> QueryResponse {
        self.query(&command.to_string()).await
    }

    /// Query with this client's own application and socket ids.
    pub async fn query(&self, command: &str) -> QueryResponse {
        self.query_as(&self.application_id, &self.socket_id, command)
            .await
    }

    pub async fn query_as(
        &self,
        application_id: &str,
        socket_id: &str,
        command: &str,
    ) -> QueryResponse {
        let packet = QueryPacket {
            application_id,
            socket_id,
            command,
        };

        let mut stream = match timeout(self.timeout, TcpStream::connect(self.addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                tracing::warn!(addr = %self.addr, error = %err, command, "query connect failed");
                return QueryResponse::communication_failed();
            }
            Err(_) => {
                tracing::warn!(addr = %self.addr, command, "query connect timed out");
                return QueryResponse::communication_failed();
            }
        };

        let payload = encode(self.framing, &packet.to_string());
        if let Err(err) = write_packet(&mut stream, &payload).await {
            tracing::warn!(addr = %self.addr, error = %err, command, "query write failed");
            return QueryResponse::communication_failed();
        }

        let deadline = Instant::now() + self.timeout;
        let response = match read_response(&mut stream, self.framing, deadline).await {
            Ok(Some(text)) => QueryResponse::new(text),
            Ok(None) => {
                tracing::warn!(
                    addr = %self.addr,
                    timeout_ms = self.timeout.as_millis() as u64,
                    command,
                    "no response from daemon",
                );
                QueryResponse::no_response()
            }
            Err(err) => {
                tracing::warn!(addr = %self.addr, error = %err, command, "query read failed");
                QueryResponse::communication_failed()
            }
        };

        let _ = stream.shutdown().await;
        tracing::debug!(command, ok = response.is_ok(), "query finished");
        response
    }
}

async fn write_packet(stream: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
    stream.write_all(payload).await?;
    stream.flush().await
}

/// `Raw`: exactly one read. `Newline`: read until the first complete frame,
/// end of stream, or the deadline; an unterminated tail still counts as the
/// answer. `None` means nothing arrived.
async fn read_response(
    stream: &mut TcpStream,
    framing: Framing,
    deadline: Instant,
) -> std::io::Result<Option<String>> {
    let mut decoder = FrameDecoder::new(framing);
    let mut buf = vec![0u8; RESPONSE_BUFFER_BYTES];

    loop {
        let n = match timeout_at(deadline, stream.read(&mut buf)).await {
            Ok(read) => read?,
            Err(_) => return Ok(decoder.finish()),
        };
        if n == 0 {
            return Ok(decoder.finish());
        }
        if let Some(first) = decoder.push(&buf[..n]).into_iter().next() {
            return Ok(Some(first));
        }
        if framing == Framing::Raw {
            return Ok(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use tokio::net::TcpListener;

    use super::*;

    /// Accept one query, optionally answer, then keep the socket open for
    /// `hold` so only the client's own framing decides when the answer ends.
    async fn daemon_stub(
        reply: Option<&'static [u8]>,
        hold: Duration,
    ) -> (SocketAddr, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 1024];
            let n = socket.read(&mut buf).await.expect("read");
            let request = String::from_utf8_lossy(&buf[..n]).into_owned();
            if let Some(bytes) = reply {
                socket.write_all(bytes).await.expect("write");
            }
            tokio::time::sleep(hold).await;
            request
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn default_config_speaks_the_unterminated_protocol() {
        let (addr, server) = daemon_stub(Some(b"OK:Survival,Creative"), Duration::from_secs(2)).await;
        let config = HotsaveConfig {
            query_port: addr.port(),
            ..HotsaveConfig::default()
        };
        let client = QueryClient::from_config(&config);

        let started = Instant::now();
        let response = client.send(&DaemonCommand::ListConfigs).await;
        assert_eq!(response.as_str(), "OK:Survival,Creative");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(
            server.await.expect("join"),
            "0x00000020-0x00000010&*&LIST_CONFIGS"
        );
    }

    #[tokio::test]
    async fn newline_framing_terminates_packet_and_strips_reply() {
        let (addr, server) = daemon_stub(Some(b"OK:Survival,Creative\n"), Duration::ZERO).await;
        let client = QueryClient::new(addr, "0x00000020", "0x00000010").with_framing(Framing::Newline);

        let response = client.send(&DaemonCommand::ListConfigs).await;
        assert_eq!(response.as_str(), "OK:Survival,Creative");
        assert_eq!(
            server.await.expect("join"),
            "0x00000020-0x00000010&*&LIST_CONFIGS\n"
        );
    }

    #[tokio::test]
    async fn newline_framing_keeps_unterminated_reply_at_timeout() {
        let (addr, _server) = daemon_stub(Some(b"OK:done"), Duration::from_secs(2)).await;
        let client = QueryClient::new(addr, "app", "sock")
            .with_framing(Framing::Newline)
            .with_timeout(Duration::from_millis(200));

        let started = Instant::now();
        assert_eq!(client.query("WORLD_SAVED").await.as_str(), "OK:done");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn silent_daemon_yields_no_response_within_timeout() {
        let (addr, _server) = daemon_stub(None, Duration::from_secs(2)).await;
        let client = QueryClient::new(addr, "app", "sock").with_timeout(Duration::from_millis(200));

        let started = Instant::now();
        let response = client.query("LIST_CONFIGS").await;
        assert_eq!(response.as_str(), QueryResponse::NO_RESPONSE);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn closed_without_bytes_is_no_response() {
        let (addr, _server) = daemon_stub(None, Duration::ZERO).await;
        let client = QueryClient::new(addr, "app", "sock");
        assert_eq!(client.query("WORLD_SAVED").await.as_str(), QueryResponse::NO_RESPONSE);
    }

    #[tokio::test]
    async fn refused_connection_is_communication_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = QueryClient::new(addr, "app", "sock");
        let response = client.query("LIST_CONFIGS").await;
        assert_eq!(response.as_str(), QueryResponse::COMMUNICATION_FAILED);
    }

    #[tokio::test]
    async fn raw_framing_takes_a_single_read() {
        let (addr, server) = daemon_stub(Some(b"ERROR:No such world"), Duration::ZERO).await;
        let client = QueryClient::new(addr, "app", "sock");

        let response = client.query("LIST_BACKUPS 0 9").await;
        assert!(response.is_error());
        assert_eq!(response.body(), "No such world");
        assert_eq!(server.await.expect("join"), "app-sock&*&LIST_BACKUPS 0 9");
    }
}
