use std::collections::BTreeMap;

use packmirror_fetch::CacheTokens;
use packmirror_registry::{DistRef, DocumentKind};
use serde::{Deserialize, Serialize};

/// What is known about one package.
///
/// `dists` only grows: references are added or overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Tokens from the last 200 for each document kind.
    #[serde(default)]
    pub cached: BTreeMap<DocumentKind, CacheTokens>,
    /// content reference -> where the artifact lives upstream
    #[serde(default)]
    pub dists:  BTreeMap<String, DistRef>,
}

impl CacheRecord {
    pub fn tokens(&self, kind: DocumentKind) -> Option<&CacheTokens> { self.cached.get(&kind) }

    /// Replace the tokens for `kind` and fold `refs` into `dists`.
    pub fn merge(
        &mut self,
        kind: DocumentKind,
        tokens: CacheTokens,
        refs: impl IntoIterator<Item = (String, DistRef)>,
    ) {
        self.cached.insert(kind, tokens);
        self.dists.extend(refs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(url: &str) -> DistRef {
        DistRef {
            url:  url.to_string(),
            kind: "zip".to_string(),
        }
    }

    #[test]
    fn test_merge_accumulates_references() {
        let mut record = CacheRecord::default();
        record.merge(DocumentKind::Metadata, CacheTokens::new("\"e1\"", ""), [(
            "r1".to_string(),
            dist("u1"),
        )]);
        record.merge(DocumentKind::Metadata, CacheTokens::new("\"e2\"", ""), [(
            "r2".to_string(),
            dist("u2"),
        )]);

        assert_eq!(record.dists.len(), 2);
        assert_eq!(record.tokens(DocumentKind::Metadata).unwrap().etag, "\"e2\"");
        assert!(record.tokens(DocumentKind::Provider).is_none());
    }

    #[test]
    fn test_merge_overwrites_same_reference() {
        let mut record = CacheRecord::default();
        record.merge(DocumentKind::Provider, CacheTokens::default(), [(
            "r1".to_string(),
            dist("old"),
        )]);
        record.merge(DocumentKind::Provider, CacheTokens::default(), [(
            "r1".to_string(),
            dist("new"),
        )]);

        assert_eq!(record.dists["r1"].url, "new");
    }

    #[test]
    fn test_wire_format() {
        let mut record = CacheRecord::default();
        record.merge(DocumentKind::Metadata, CacheTokens::new("\"e1\"", ""), [(
            "abc123".to_string(),
            dist("https://x/a.zip"),
        )]);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["cached"]["metadata"]["etag"], "\"e1\"");
        assert_eq!(value["cached"]["metadata"]["lastModified"], "");
        assert_eq!(value["dists"]["abc123"]["type"], "zip");

        let back: CacheRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
