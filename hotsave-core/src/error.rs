//! Error types for hotsave-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from parsing or persisting core records.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (config save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A version string that is not `major[.minor[.patch]]`.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    /// A dataset folder identifier that is blank, `.`/`..`, or a path.
    #[error("invalid folder identifier '{0}'")]
    InvalidFolderId(String),

    /// A responder packet without exactly one delimiter.
    #[error("malformed responder packet: expected 2 parts, found {parts}")]
    MalformedPacket { parts: usize },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
