use std::net::SocketAddr;

use thiserror::Error;

/// Error surface for the transport and the persistent channels.
///
/// The query path never returns these; it folds failures into sentinel
/// responses instead.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("I/O error on {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to {0}")]
    ConnectTimeout(SocketAddr),

    #[error("channel is not connected")]
    NotConnected,

    #[error("transport already closed")]
    Closed,
}

pub(crate) fn io_err(context: impl Into<String>, source: std::io::Error) -> LinkError {
    LinkError::Io {
        context: context.into(),
        source,
    }
}
