use serde::{Deserialize, Serialize};

/// Validators from a previous successful fetch of one document.
///
/// Serialized as `{"etag": "...", "lastModified": "..."}`; an empty string
/// means the server did not send that header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTokens {
    #[serde(default)]
    pub etag:          String,
    #[serde(default, rename = "lastModified")]
    pub last_modified: String,
}

impl CacheTokens {
    pub fn new(etag: impl Into<String>, last_modified: impl Into<String>) -> Self {
        Self {
            etag:          etag.into(),
            last_modified: last_modified.into(),
        }
    }

    pub fn is_empty(&self) -> bool { self.etag.is_empty() && self.last_modified.is_empty() }

    /// `If-None-Match` / `If-Modified-Since` for the non-empty tokens.
    pub fn conditional_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(2);
        if !self.etag.is_empty() {
            headers.push(("If-None-Match".to_string(), self.etag.clone()));
        }
        if !self.last_modified.is_empty() {
            headers.push(("If-Modified-Since".to_string(), self.last_modified.clone()));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditional_headers_skip_empty_tokens() {
        assert!(CacheTokens::default().conditional_headers().is_empty());

        let only_etag = CacheTokens::new("\"e1\"", "");
        assert_eq!(
            only_etag.conditional_headers(),
            vec![("If-None-Match".to_string(), "\"e1\"".to_string())]
        );

        let both = CacheTokens::new("\"e1\"", "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(both.conditional_headers().len(), 2);
    }

    #[test]
    fn test_tokens_serde_shape() {
        let tokens = CacheTokens::new("\"e1\"", "");
        let json = serde_json::to_string(&tokens).unwrap();
        assert_eq!(json, r#"{"etag":"\"e1\"","lastModified":""}"#);

        let partial: CacheTokens = serde_json::from_str(r#"{"etag":"x"}"#).unwrap();
        assert_eq!(partial, CacheTokens::new("x", ""));
    }
}
