use std::fmt;
use std::path::PathBuf;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use crate::native::OpenMode;

pub type Result<T> = std::result::Result<T, Error>;

/// The per-file operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileOp {
    Seek,
    Tell,
    Read,
    Write,
    Available,
    Flush,
    Close,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileOp::Seek => "seek",
            FileOp::Tell => "tell",
            FileOp::Read => "read",
            FileOp::Write => "write",
            FileOp::Available => "get available bytes",
            FileOp::Flush => "flush",
            FileOp::Close => "close",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot {op} on {path}: {detail}")]
    Failure {
        op: FileOp,
        path: String,
        detail: String,
    },

    #[error("cannot {op} on {path}: caller buffer is not usable contiguous memory")]
    Buffer { op: FileOp, path: String },

    #[error("file {path} is already closed")]
    Closed { path: String },

    #[error("cannot open {path} for {mode:?}: {detail}")]
    Open {
        path: String,
        mode: OpenMode,
        detail: String,
    },

    #[error("failed to connect to filesystem `{0}`")]
    Connect(String),

    #[error("failed to load config file `{path}`")]
    LoadConfig {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to parse config file `{path}`")]
    ParseConfig {
        #[source]
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("failed to read configuration from environment")]
    EnvConfig(#[from] envy::Error),
}

impl Error {
    /// The failing file operation, if this error came from one.
    pub fn op(&self) -> Option<FileOp> {
        match self {
            Error::Failure { op, .. } | Error::Buffer { op, .. } => Some(*op),
            _ => None,
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        let kind = match &err {
            Error::Buffer { .. } => ErrorKind::InvalidInput,
            Error::Closed { .. } => ErrorKind::NotConnected,
            Error::Open { .. } => ErrorKind::NotFound,
            Error::Connect(_) => ErrorKind::ConnectionRefused,
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}
