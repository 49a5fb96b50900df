//! Startup errors. Any of these aborts before ingestion begins.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no feeds configured")]
    NoFeeds,

    #[error("no detectors configured")]
    NoDetectors,

    #[error("unknown detector type: {0}")]
    UnknownDetector(String),

    #[error("unknown listener type: {0}")]
    UnknownListener(String),

    #[error("unknown feed kind '{kind}' for feed {feed}")]
    UnknownFeedKind { feed: String, kind: String },

    #[error("invalid value '{value}' for parameter '{key}' of {owner}")]
    InvalidParam {
        owner: String,
        key: String,
        value: String,
    },

    #[error("cannot build {kind} listener: {message}")]
    InvalidListener { kind: String, message: String },

    #[error("missing parameter '{key}' for {owner}")]
    MissingParam { owner: String, key: String },

    #[error("reading config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {path}: {message}")]
    Parse { path: String, message: String },
}
