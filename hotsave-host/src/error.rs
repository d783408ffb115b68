use thiserror::Error;

/// Error surface for host capabilities and the coordinator.
#[derive(Debug, Error)]
pub enum HostError {
    /// A host capability call failed; the message comes from the host.
    #[error("host capability '{operation}' failed: {message}")]
    Capability {
        operation: &'static str,
        message: String,
    },

    #[error("host execution context is closed")]
    ContextClosed,

    #[error("host job panicked")]
    JobPanicked,

    #[error("failed to spawn host context thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Core(#[from] hotsave_core::CoreError),
}

impl HostError {
    pub fn capability(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Capability {
            operation,
            message: message.into(),
        }
    }
}
