//! Query and responder packets, plus the raw-text query response.

use std::fmt;

use crate::error::CoreError;

/// Separator between header and body in query and responder packets.
pub const PACKET_DELIMITER: &str = "&*&";

/// One host-initiated request: `"{applicationId}-{socketId}&*&{command}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPacket<'a> {
    pub application_id: &'a str,
    pub socket_id: &'a str,
    pub command: &'a str,
}

impl fmt::Display for QueryPacket<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}{PACKET_DELIMITER}{}",
            self.application_id, self.socket_id, self.command
        )
    }
}

/// `"{correlationId}&*&{data}"`, used both ways on a responder session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderPacket {
    pub correlation_id: String,
    pub data: String,
}

impl ResponderPacket {
    pub fn new(correlation_id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            data: data.into(),
        }
    }

    /// Split on [`PACKET_DELIMITER`]; anything but exactly two parts is rejected.
    pub fn decode(raw: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = raw.split(PACKET_DELIMITER).collect();
        match parts.as_slice() {
            [correlation_id, data] => Ok(Self::new(*correlation_id, *data)),
            _ => Err(CoreError::MalformedPacket { parts: parts.len() }),
        }
    }
}

impl fmt::Display for ResponderPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PACKET_DELIMITER}{}", self.correlation_id, self.data)
    }
}

/// Raw text answer to a query. Success starts with `OK:`, failure with
/// `ERROR:`; transport failures are folded into the two sentinels below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse(String);

impl QueryResponse {
    pub const COMMUNICATION_FAILED: &'static str = "ERROR:COMMUNICATION_FAILED";
    pub const NO_RESPONSE: &'static str = "ERROR:NO_RESPONSE";

    const OK_PREFIX: &'static str = "OK:";
    const ERROR_PREFIX: &'static str = "ERROR:";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn communication_failed() -> Self {
        Self(Self::COMMUNICATION_FAILED.to_string())
    }

    pub fn no_response() -> Self {
        Self(Self::NO_RESPONSE.to_string())
    }

    pub fn ok(body: impl fmt::Display) -> Self {
        Self(format!("{}{body}", Self::OK_PREFIX))
    }

    pub fn error(body: impl fmt::Display) -> Self {
        Self(format!("{}{body}", Self::ERROR_PREFIX))
    }

    pub fn is_ok(&self) -> bool {
        self.0.starts_with(Self::OK_PREFIX)
    }

    pub fn is_error(&self) -> bool {
        self.0.starts_with(Self::ERROR_PREFIX)
    }

    /// `true` for either transport sentinel.
    pub fn is_transport_failure(&self) -> bool {
        self.0 == Self::COMMUNICATION_FAILED || self.0 == Self::NO_RESPONSE
    }

    /// Text after the `OK:`/`ERROR:` prefix, or the whole text without one.
    pub fn body(&self) -> &str {
        self.0
            .strip_prefix(Self::OK_PREFIX)
            .or_else(|| self.0.strip_prefix(Self::ERROR_PREFIX))
            .unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
