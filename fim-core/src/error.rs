use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path vanished before it could be read: {0}")]
    VanishedPath(String),

    #[error("Root path not found or not a directory: {0}")]
    RootNotFound(PathBuf),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    #[error("Invalid permissions: {0}")]
    InvalidPermissions(String),
}

impl Error {
    /// Classifies a failed content read: a missing file is a vanished path,
    /// everything else is a read error.
    pub fn from_read(path: impl Into<String>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::VanishedPath(path)
        } else {
            Error::ReadError { path, source: err }
        }
    }

    /// The file this error is about, if it is a file-level error.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::ReadError { path, .. } | Error::VanishedPath(path) => Some(path),
            _ => None,
        }
    }
}
