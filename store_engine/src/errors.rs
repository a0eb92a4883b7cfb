use std::{io, path::PathBuf, str::Utf8Error};
use thiserror::Error;

/// Byte-level failures on the stdio channel. These are never turned into an
/// error envelope; the process gives up on the peer instead.
#[derive(Error, Debug)]
pub enum FramingError {
    /// Reading stdin or writing stdout failed.
    #[error("stdio error: {0}")]
    Io(#[from] io::Error),

    /// The input ended in the middle of a length prefix or frame content.
    #[error("input ended after {received} of {expected} bytes")]
    Truncated { expected: usize, received: usize },

    /// The declared (or produced) content length is over the frame limit.
    #[error("frame of {0} bytes exceeds the size limit")]
    FrameTooLarge(usize),

    #[error("frame content is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),

    #[error("frame content is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The reply could not be serialized.
    #[error("failed to encode reply: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failures while turning a request into a command or running it. All of
/// these end up in an error envelope.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The request is not an object with a string `op`.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown operation '{0}'")]
    UnknownOp(String),

    /// `args` does not carry exactly the fields the operation needs.
    #[error("invalid arguments for '{op}': {source}")]
    InvalidArgs {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The save name cannot be used as a file stem inside the store directory.
    #[error("invalid name {0:?}: must be a plain file name")]
    InvalidName(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where in the request lifecycle a [`CommandError`] happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Dispatch,
    Construction,
    Operation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Dispatch => "dispatch",
            ErrorKind::Construction => "construction",
            ErrorKind::Operation => "operation",
        }
    }
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::InvalidRequest(_) | CommandError::UnknownOp(_) => ErrorKind::Dispatch,
            CommandError::InvalidArgs { .. } | CommandError::InvalidName(_) => {
                ErrorKind::Construction
            }
            CommandError::Io { .. } | CommandError::Serialize { .. } => ErrorKind::Operation,
        }
    }

    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CommandError::Io {
            path: path.into(),
            source,
        }
    }
}
