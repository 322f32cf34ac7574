use std::future::Future;

use crate::response::Response;

/// Asynchronous HTTP transport.
///
/// Implementations perform exactly one GET and report any response that
/// arrived, whatever its status, as `Ok`. `Err` is reserved for transport
/// failures, which are the only thing [`Fetcher`](crate::Fetcher) retries.
/// The body is returned as received; gzip decoding happens in the fetcher.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = std::result::Result<Response, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use super::*;
    use crate::error::{FetchError, Result};

    /// Transport settings for [`ReqwestClient`].
    #[derive(Clone, Debug, Default)]
    pub struct ClientSettings {
        pub timeout:    Option<Duration>,
        pub proxy:      Option<String>,
        pub user_agent: Option<String>,
    }

    impl ClientSettings {
        pub fn build(self) -> Result<ReqwestClient> {
            let mut cb = reqwest::Client::builder();

            if let Some(timeout) = self.timeout {
                cb = cb.timeout(timeout);
            }

            if let Some(url) = self.proxy.filter(|p| !p.is_empty()) {
                let proxy = reqwest::Proxy::all(&url).map_err(|source| FetchError::Proxy {
                    url: url.clone(),
                    source: Box::new(source),
                })?;
                cb = cb.proxy(proxy);
            }

            let user_agent = self
                .user_agent
                .unwrap_or_else(|| concat!("packmirror/", env!("CARGO_PKG_VERSION")).to_string());
            cb = cb.user_agent(user_agent);

            let client = cb.build().map_err(|e| FetchError::ClientBuild(Box::new(e)))?;
            Ok(ReqwestClient { client })
        }
    }

    /// Production HTTP client implementation using reqwest.
    ///
    /// reqwest is built without its own decompression features, so a gzip
    /// body reaches [`Fetcher`](crate::Fetcher) untouched.
    #[derive(Clone, Debug)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new() -> Result<Self> { ClientSettings::default().build() }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn get(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> std::result::Result<Response, Self::Error> {
            let mut request = self.client.get(url);
            for (key, value) in headers {
                request = request.header(key.as_str(), value.as_str());
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
                .collect();
            let body = response.bytes().await?;

            Ok(Response {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::{ClientSettings, ReqwestClient};
