use crate::backoff::backoff_delay;
use crate::client::HttpClient;
use crate::decompress::{gunzip, is_gzip};
use crate::error::{FetchError, Result};
use crate::response::Response;
use crate::tokens::CacheTokens;

/// Configuration for [`Fetcher`].
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Total attempts per fetch, including the first. Zero is treated as one.
    ///
    /// Default: 5
    pub attempts: u32,
}

impl Default for FetchOptions {
    fn default() -> Self { Self { attempts: 5 } }
}

impl FetchOptions {
    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// GET with gzip negotiation, conditional headers and transport retry.
pub struct Fetcher<C: HttpClient> {
    client:  C,
    options: FetchOptions,
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: C, options: FetchOptions) -> Self { Self { client, options } }

    pub fn client(&self) -> &C { &self.client }

    pub fn options(&self) -> FetchOptions { self.options }

    /// Fetch `url`, attaching `If-None-Match`/`If-Modified-Since` from
    /// `tokens` when present.
    ///
    /// Only transport errors are retried. Every received status, including
    /// 304, 404 and 5xx, comes back as `Ok`.
    pub async fn fetch(&self, url: &str, tokens: Option<&CacheTokens>) -> Result<Response> {
        let mut headers = vec![("Accept-Encoding".to_string(), "gzip".to_string())];
        if let Some(tokens) = tokens {
            headers.extend(tokens.conditional_headers());
        }

        let attempts = self.options.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url, &headers).await {
                Ok(response) => return decode_body(url, response),
                Err(e) if attempt >= attempts => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        attempts,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        url,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "request failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn decode_body(url: &str, mut response: Response) -> Result<Response> {
    let gzipped = response.header_value("content-encoding").is_some_and(is_gzip);
    if gzipped && !response.body.is_empty() {
        let inflated = gunzip(&response.body).map_err(|source| FetchError::Decompress {
            url: url.to_string(),
            source,
        })?;
        response.body = inflated.into();
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::Mutex;

    use flate2::{Compression, write::GzEncoder};

    use super::*;

    #[derive(Debug)]
    struct MockError(String);

    impl std::fmt::Display for MockError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
    }

    impl std::error::Error for MockError {}

    /// Replays a fixed script of results and records request headers.
    #[derive(Default)]
    struct ScriptedClient {
        script: Mutex<VecDeque<std::result::Result<Response, MockError>>>,
        calls:  Mutex<Vec<Vec<(String, String)>>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<std::result::Result<Response, MockError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls:  Mutex::default(),
            }
        }

        fn call_count(&self) -> usize { self.calls.lock().unwrap().len() }
    }

    impl HttpClient for ScriptedClient {
        type Error = MockError;

        async fn get(
            &self,
            _url: &str,
            headers: &[(String, String)],
        ) -> std::result::Result<Response, Self::Error> {
            self.calls.lock().unwrap().push(headers.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(MockError("script exhausted".into())))
        }
    }

    fn refused() -> std::result::Result<Response, MockError> { Err(MockError("connection refused".into())) }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transport_errors_then_succeeds() {
        let client = ScriptedClient::new(vec![refused(), refused(), Ok(Response::new(200).body("{}"))]);
        let fetcher = Fetcher::new(client, FetchOptions::default().attempts(5));

        let start = tokio::time::Instant::now();
        let response = fetcher.fetch("https://repo.example/packages.json", None).await.unwrap();

        assert!(response.is_ok());
        assert_eq!(fetcher.client().call_count(), 3);
        assert!(start.elapsed() >= backoff_delay(1) + backoff_delay(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_attempts() {
        let client = ScriptedClient::new(vec![refused(), refused(), refused(), refused()]);
        let fetcher = Fetcher::new(client, FetchOptions::default().attempts(3));

        let start = tokio::time::Instant::now();
        let err = fetcher.fetch("https://repo.example/x.json", None).await.unwrap_err();

        assert!(matches!(err, FetchError::Transport { attempts: 3, .. }));
        assert_eq!(fetcher.client().call_count(), 3);
        // no sleep after the final attempt
        assert!(start.elapsed() < backoff_delay(1) + backoff_delay(2) + backoff_delay(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let client = ScriptedClient::new(vec![refused()]);
        let fetcher = Fetcher::new(client, FetchOptions::default().attempts(0));

        let err = fetcher.fetch("https://repo.example/x.json", None).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { attempts: 1, .. }));
        assert_eq!(fetcher.client().call_count(), 1);
    }

    #[tokio::test]
    async fn test_http_statuses_are_not_retried() {
        for status in [404, 500, 503] {
            let client = ScriptedClient::new(vec![Ok(Response::new(status)), Ok(Response::new(200))]);
            let fetcher = Fetcher::new(client, FetchOptions::default());

            let response = fetcher.fetch("https://repo.example/x.json", None).await.unwrap();
            assert_eq!(response.status, status);
            assert_eq!(fetcher.client().call_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_sends_accept_encoding_and_conditional_headers() {
        let client = ScriptedClient::new(vec![Ok(Response::new(304))]);
        let fetcher = Fetcher::new(client, FetchOptions::default());
        let tokens = CacheTokens::new("\"e1\"", "Wed, 21 Oct 2015 07:28:00 GMT");

        let response = fetcher.fetch("https://repo.example/x.json", Some(&tokens)).await.unwrap();
        assert!(response.is_not_modified());

        let calls = fetcher.client().calls.lock().unwrap();
        let sent = &calls[0];
        assert!(sent.contains(&("Accept-Encoding".to_string(), "gzip".to_string())));
        assert!(sent.contains(&("If-None-Match".to_string(), "\"e1\"".to_string())));
        assert!(sent.contains(&(
            "If-Modified-Since".to_string(),
            "Wed, 21 Oct 2015 07:28:00 GMT".to_string()
        )));
    }

    #[tokio::test]
    async fn test_gzip_body_is_decoded() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"packages":{}}"#).unwrap();
        let gz = encoder.finish().unwrap();

        let client = ScriptedClient::new(vec![Ok(Response::new(200)
            .header("Content-Encoding", "gzip")
            .header("Content-Type", "application/json")
            .body(gz))]);
        let fetcher = Fetcher::new(client, FetchOptions::default());

        let response = fetcher.fetch("https://repo.example/x.json", None).await.unwrap();
        assert_eq!(&response.body[..], br#"{"packages":{}}"#);
    }

    #[tokio::test]
    async fn test_corrupt_gzip_is_an_error() {
        let client = ScriptedClient::new(vec![Ok(Response::new(200)
            .header("Content-Encoding", "gzip")
            .body(&b"definitely not gzip"[..]))]);
        let fetcher = Fetcher::new(client, FetchOptions::default());

        let err = fetcher.fetch("https://repo.example/x.json", None).await.unwrap_err();
        assert!(matches!(err, FetchError::Decompress { .. }));
    }

    #[test]
    fn test_default_options() {
        assert_eq!(FetchOptions::default().attempts, 5);
    }
}
