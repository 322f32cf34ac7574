use bytes::Bytes;

use crate::tokens::CacheTokens;

/// A completed HTTP exchange. The body is already decompressed when it
/// comes out of [`Fetcher::fetch`](crate::Fetcher::fetch).
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status:  u16,
    pub headers: Vec<(String, String)>,
    pub body:    Bytes,
}

impl Response {
    pub const OK: u16 = 200;
    pub const NOT_MODIFIED: u16 = 304;
    pub const NOT_FOUND: u16 = 404;

    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of header `name`, matched case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_ok(&self) -> bool { self.status == Self::OK }

    pub fn is_not_modified(&self) -> bool { self.status == Self::NOT_MODIFIED }

    pub fn is_not_found(&self) -> bool { self.status == Self::NOT_FOUND }

    pub fn content_type(&self) -> &str { self.header_value("content-type").unwrap_or_default() }

    /// `application/json`, or any `+json` structured syntax suffix.
    pub fn is_json(&self) -> bool {
        let media = self
            .content_type()
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        media == "application/json" || media.ends_with("+json")
    }

    pub fn etag(&self) -> &str { self.header_value("etag").unwrap_or_default() }

    pub fn last_modified(&self) -> &str { self.header_value("last-modified").unwrap_or_default() }

    /// Validators to store for the next conditional request.
    pub fn tokens(&self) -> CacheTokens { CacheTokens::new(self.etag(), self.last_modified()) }
}
