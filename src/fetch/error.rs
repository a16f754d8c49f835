//! Fetch error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before any request is sent. Never retried.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("cannot open destination: {0}")]
    Destination(#[source] io::Error),

    #[error("impossible to parse url: '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("url has no host: '{0}'")]
    MissingHost(String),

    #[error("no transport session open for repository '{0}'")]
    NoSession(String),
}

/// Terminal failure of a fetch operation.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("{url}: not found")]
    NotFound { url: String },

    #[error("an error occurred while fetching {url} ({attempts} attempt(s)): {reason}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("cannot write destination: {0}")]
    Write(#[source] io::Error),
}

/// Failure inside one transport execution. Always retryable.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport error: {0}")]
    Connect(String),

    #[error("read error: {0}")]
    Read(#[source] io::Error),

    #[error("write error: {0}")]
    Write(#[source] io::Error),
}

/// Errors while loading configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("unknown repository '{0}'")]
    UnknownRepository(String),
}
