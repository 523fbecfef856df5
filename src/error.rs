use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures that stop a run. Per-event and per-batch problems never show up
/// here; they are absorbed where they happen.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to connect to event stream at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("event stream connection not established within {0:?}")]
    ConnectTimeout(Duration),
    #[error("event stream transport failed: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("no pong received within {0:?} of keepalive ping")]
    KeepaliveTimeout(Duration),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document {path}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
