//! Error types for packmirror-fetch.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url:      String,
        attempts: u32,
        #[source]
        source:   BoxError,
    },

    #[error("failed to decompress response from {url}: {source}")]
    Decompress {
        url:    String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid proxy URL {url}: {source}")]
    Proxy {
        url:    String,
        #[source]
        source: BoxError,
    },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] BoxError),
}

pub type Result<T> = std::result::Result<T, FetchError>;
