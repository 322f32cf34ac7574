//! Registry document fetching.
//!
//! [`Fetcher`] is the only network primitive the crawler uses. It issues a
//! single GET, advertising gzip support and attaching conditional-request
//! headers from previously stored [`CacheTokens`]. Transport failures
//! (connect, DNS, timeout, truncated body) are retried with [`backoff_delay`];
//! any HTTP status that actually arrives is handed back to the caller as a
//! [`Response`], since 304/404/5xx are policy decisions made upstream.

mod backoff;
mod client;
mod decompress;
mod error;
mod fetcher;
mod response;
mod tokens;

pub use backoff::{BACKOFF_CAP, backoff_delay};
pub use client::HttpClient;
pub use decompress::gunzip;
pub use error::{FetchError, Result};
pub use fetcher::{FetchOptions, Fetcher};
pub use response::Response;
pub use tokens::CacheTokens;

#[cfg(feature = "reqwest")]
pub use client::{ClientSettings, ReqwestClient};
