//! Error types for frame loading, output sinks, configuration and serving.

use std::path::PathBuf;

pub type LoadResult<T> = Result<T, LoadError>;
pub type SinkResult<T> = Result<T, SinkError>;

/// Failure while discovering or reading frame assets.
///
/// Never surfaced to clients: the frame store substitutes the sentinel frame.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to list frame directory {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read frame {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no frames found in {0}")]
    Empty(PathBuf),
}

/// Failure writing to a stream sink. Fatal for the session that hit it.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("stream already closed")]
    Closed,

    #[error("write to client failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("palette must contain at least one color")]
    EmptyPalette,

    #[error("unknown color {0:?}")]
    UnknownColor(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
