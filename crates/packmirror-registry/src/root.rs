use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RegistryError, Result};
use crate::package::lenient_time;
use crate::template::render;

/// `{"sha256": "..."}` as used by `provider-includes` and shard entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRef {
    #[serde(default)]
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mirror {
    #[serde(rename = "dist-url")]
    pub dist_url:  String,
    #[serde(default)]
    pub preferred: bool,
}

/// A provider shard to fetch: its registry-relative path with `%hash%`
/// already substituted, and the digest its body must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardRef {
    pub path:   String,
    pub sha256: String,
}

/// URL templates the generated mirror index advertises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTemplates {
    pub dist_url:      String,
    pub metadata_url:  String,
    pub providers_url: String,
}

impl Default for MirrorTemplates {
    fn default() -> Self {
        Self {
            dist_url:      "/dists/%package%/%reference%.%type%".to_string(),
            metadata_url:  "/p2/%package%.json".to_string(),
            providers_url: "/p/%package%$%hash%.json".to_string(),
        }
    }
}

/// The registry's `packages.json`.
///
/// Keys packmirror does not interpret (`notify`, `search`, `list`,
/// `providers-api`, ...) are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootIndex {
    #[serde(default, deserialize_with = "lenient_time", skip_serializing_if = "Option::is_none")]
    pub time:              Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mirrors:           Vec<Mirror>,
    #[serde(rename = "metadata-url", default, skip_serializing_if = "Option::is_none")]
    pub metadata_url:      Option<String>,
    #[serde(rename = "providers-url", default, skip_serializing_if = "Option::is_none")]
    pub providers_url:     Option<String>,
    #[serde(rename = "provider-includes", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provider_includes: BTreeMap<String, HashRef>,
    #[serde(flatten)]
    pub extra:             Map<String, Value>,
}

impl RootIndex {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|source| RegistryError::Decode {
            document: "root index",
            source,
        })
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| RegistryError::Encode {
            document: "mirror index",
            source,
        })
    }

    /// One entry per `provider-includes` key, in key order.
    pub fn provider_include_urls(&self) -> Vec<ShardRef> {
        self.provider_includes
            .iter()
            .map(|(template, hash)| {
                let path = render(template, &[("hash", hash.sha256.as_str())]);
                let path = if path.starts_with('/') { path } else { format!("/{path}") };
                ShardRef {
                    path,
                    sha256: hash.sha256.clone(),
                }
            })
            .collect()
    }

    /// Per-package metadata path, when the registry publishes `metadata-url`.
    pub fn metadata_path(&self, package: &str) -> Option<String> {
        self.metadata_url
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| render(t, &[("package", package)]))
    }

    /// Per-package provider document path, when the registry publishes
    /// `providers-url` and the shard declared a digest for the package.
    pub fn provider_path(&self, package: &str, sha256: &str) -> Option<String> {
        if sha256.is_empty() {
            return None;
        }
        self.providers_url
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| render(t, &[("package", package), ("hash", sha256)]))
    }

    /// Rewrite this index to point consumers at the mirror.
    pub fn into_mirror_index(mut self, templates: &MirrorTemplates, now: DateTime<Utc>) -> Self {
        self.mirrors = vec![Mirror {
            dist_url:  templates.dist_url.clone(),
            preferred: true,
        }];
        self.metadata_url = Some(templates.metadata_url.clone());
        self.providers_url = Some(templates.providers_url.clone());
        self.time = Some(now);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGES_JSON: &str = r#"{
        "packages": [],
        "notify": "https://packagist.org/downloads/%package%",
        "notify-batch": "https://packagist.org/downloads/",
        "providers-url": "/p/%package%$%hash%.json",
        "metadata-url": "/p2/%package%.json",
        "search": "https://packagist.org/search.json?q=%query%&type=%type%",
        "mirrors": [
            {"dist-url": "https://mirror.example/dists/%package%/%version%/r%reference%.%type%", "preferred": true}
        ],
        "provider-includes": {
            "p/provider-2013$%hash%.json": {"sha256": "aaa"},
            "p/provider-latest$%hash%.json": {"sha256": "bbb"}
        }
    }"#;

    #[test]
    fn test_decode_root_index() {
        let root = RootIndex::from_slice(PACKAGES_JSON.as_bytes()).unwrap();
        assert_eq!(root.metadata_url.as_deref(), Some("/p2/%package%.json"));
        assert_eq!(root.providers_url.as_deref(), Some("/p/%package%$%hash%.json"));
        assert_eq!(root.mirrors.len(), 1);
        assert!(root.mirrors[0].preferred);
        assert_eq!(root.provider_includes.len(), 2);
        assert!(root.time.is_none());
        assert!(root.extra.contains_key("notify-batch"));
    }

    #[test]
    fn test_provider_include_urls() {
        let root = RootIndex::from_slice(PACKAGES_JSON.as_bytes()).unwrap();
        let shards = root.provider_include_urls();
        assert_eq!(shards, vec![
            ShardRef {
                path:   "/p/provider-2013$aaa.json".into(),
                sha256: "aaa".into(),
            },
            ShardRef {
                path:   "/p/provider-latest$bbb.json".into(),
                sha256: "bbb".into(),
            },
        ]);
    }

    #[test]
    fn test_package_paths() {
        let root = RootIndex::from_slice(PACKAGES_JSON.as_bytes()).unwrap();
        assert_eq!(root.metadata_path("acme/widget").as_deref(), Some("/p2/acme/widget.json"));
        assert_eq!(
            root.provider_path("acme/widget", "ff00").as_deref(),
            Some("/p/acme/widget$ff00.json")
        );
        assert_eq!(root.provider_path("acme/widget", ""), None);

        let bare = RootIndex::default();
        assert_eq!(bare.metadata_path("acme/widget"), None);
        assert_eq!(bare.provider_path("acme/widget", "ff00"), None);
    }

    #[test]
    fn test_into_mirror_index_preserves_unknown_keys() {
        let root = RootIndex::from_slice(PACKAGES_JSON.as_bytes()).unwrap();
        let templates = MirrorTemplates {
            dist_url:      "/dists/%package%/%reference%.%type%".into(),
            metadata_url:  "/p2/%package%.json".into(),
            providers_url: "/p/%package%$%hash%.json".into(),
        };
        let now = Utc::now();
        let mirror = root.into_mirror_index(&templates, now);

        assert_eq!(mirror.mirrors, vec![Mirror {
            dist_url:  "/dists/%package%/%reference%.%type%".into(),
            preferred: true,
        }]);
        assert_eq!(mirror.time, Some(now));

        let json: Value = serde_json::from_slice(&mirror.to_vec().unwrap()).unwrap();
        assert_eq!(json["notify"], "https://packagist.org/downloads/%package%");
        assert_eq!(json["provider-includes"]["p/provider-2013$%hash%.json"]["sha256"], "aaa");
        assert!(json["time"].is_string());
    }
}
