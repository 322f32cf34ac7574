use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("checkpoint file {path} is corrupt: {source}")]
    Corrupt {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode checkpoint {path}: {source}")]
    Encode {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Fs(#[from] packmirror_fs::Error),
}

pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum SinkError {
    #[cfg(feature = "redis")]
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("failed to encode fields for {key}: {source}")]
    Encode {
        key:    String,
        #[source]
        source: serde_json::Error,
    },

    #[error("sink rejected {key}: {reason}")]
    Rejected { key: String, reason: String },
}
