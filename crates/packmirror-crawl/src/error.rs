use packmirror_fetch::FetchError;
use packmirror_registry::RegistryError;
use packmirror_state::StateError;
use packmirror_verify::VerificationError;
use thiserror::Error;

/// Failures that end a run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("failed to load checkpoint: {0}")]
    LoadCheckpoint(#[source] StateError),

    #[error("failed to fetch root index: {0}")]
    RootFetch(#[source] FetchError),

    #[error("root index {url} answered HTTP {status}")]
    RootStatus { url: String, status: u16 },

    #[error("root index is not valid: {0}")]
    RootDecode(#[source] RegistryError),

    #[error("failed to save checkpoint: {0}")]
    SaveCheckpoint(#[source] StateError),

    #[error("failed to encode mirror index: {0}")]
    EncodeMirrorIndex(#[source] RegistryError),

    #[error("failed to write mirror index: {0}")]
    WriteMirrorIndex(#[source] packmirror_fs::Error),
}

pub type Result<T> = std::result::Result<T, CrawlError>;

/// Failures that abandon one shard and leave the rest of the run alone.
#[derive(Debug, Error)]
pub enum ShardError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("HTTP {0}")]
    Status(u16),

    #[error(transparent)]
    Checksum(#[from] VerificationError),

    #[error(transparent)]
    Decode(#[from] RegistryError),
}
