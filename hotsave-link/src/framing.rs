//! Message framing for the control-plane sockets.
//!
//! [`Framing::Raw`] is the daemon's native format: nothing terminates a
//! message, so whatever one read returns is one message. [`Framing::Newline`]
//! is opt-in; the decoder accumulates bytes across reads and yields one
//! message per `\n`, so coalesced or split reads never change boundaries.

use hotsave_core::Framing;

/// Periodic keep-alive sent by the client.
pub const HEARTBEAT: &str = "heartbeat";

/// Server acknowledgement of [`HEARTBEAT`]; never forwarded to listeners.
pub const HEARTBEAT_ACK: &str = "heartbeat_response";

/// Upper bound on an unterminated frame before the buffer is discarded.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Encode one outgoing message for the wire.
pub fn encode(framing: Framing, text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text.as_bytes());
    if framing == Framing::Newline {
        bytes.push(b'\n');
    }
    bytes
}

/// Accumulating decoder for inbound chunks.
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: Vec::new(),
        }
    }

    /// Feed one read's worth of bytes; returns every message it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }
        match self.framing {
            Framing::Raw => vec![String::from_utf8_lossy(chunk).into_owned()],
            Framing::Newline => self.push_lines(chunk),
        }
    }

    /// Flush an unterminated tail at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.buffer);
        let tail = trim_cr(&tail);
        (!tail.is_empty()).then(|| String::from_utf8_lossy(tail).into_owned())
    }

    /// Bytes received but not yet part of a complete message.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn push_lines(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = trim_cr(&line[..pos]);
            if !line.is_empty() {
                messages.push(String::from_utf8_lossy(line).into_owned());
            }
        }

        if self.buffer.len() > MAX_FRAME_BYTES {
            tracing::warn!(
                pending = self.buffer.len(),
                "discarding oversized unterminated frame"
            );
            self.buffer.clear();
        }
        messages
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
