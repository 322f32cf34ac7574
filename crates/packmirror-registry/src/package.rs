use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{RegistryError, Result};

const UNSET: &str = "__unset";

/// Which per-package document a fetch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// `metadata-url` (`/p2/%package%.json`): flat version list.
    Metadata,
    /// `providers-url` (`/p/%package%$%hash%.json`): version-keyed map,
    /// content-addressed by the digest its shard declares.
    Provider,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Metadata => write!(f, "metadata"),
            DocumentKind::Provider => write!(f, "provider"),
        }
    }
}

/// Where one built artifact lives upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistRef {
    pub url:  String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistInfo {
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub kind:      String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url:       String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum:    Option<String>,
}

impl DistInfo {
    pub fn to_ref(&self) -> DistRef {
        DistRef {
            url:  self.url.clone(),
            kind: self.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name:               String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub version:            String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub version_normalized: String,
    #[serde(default, deserialize_with = "lenient_time", skip_serializing_if = "Option::is_none")]
    pub time:               Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_dist", skip_serializing_if = "Option::is_none")]
    pub dist:               Option<DistInfo>,
}

impl VersionRecord {
    /// The dist worth mirroring: present and with a non-empty type.
    /// Source-only and dev releases yield `None`.
    pub fn mirrorable_dist(&self) -> Option<&DistInfo> {
        self.dist.as_ref().filter(|d| !d.kind.is_empty())
    }
}

/// reference -> (url, type) for every mirrorable dist in `versions`.
/// Later versions overwrite earlier ones that share a reference.
pub fn dist_refs(versions: &[VersionRecord]) -> BTreeMap<String, DistRef> {
    versions
        .iter()
        .filter_map(VersionRecord::mirrorable_dist)
        .map(|dist| (dist.reference.clone(), dist.to_ref()))
        .collect()
}

#[derive(Debug, Deserialize)]
struct DirectShape {
    #[serde(default)]
    packages: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    minified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderShape {
    #[serde(default)]
    packages: BTreeMap<String, BTreeMap<String, Value>>,
}

/// A decoded per-package document, resolved to its shape at decode time.
#[derive(Debug, Clone)]
pub enum PackageDocument {
    /// name -> versions, already expanded if the document was minified.
    Direct(BTreeMap<String, Vec<Value>>),
    /// name -> version string -> version.
    Provider(BTreeMap<String, BTreeMap<String, Value>>),
}

impl PackageDocument {
    pub fn decode(kind: DocumentKind, body: &[u8]) -> Result<Self> {
        match kind {
            DocumentKind::Metadata => {
                let shape: DirectShape =
                    serde_json::from_slice(body).map_err(|source| RegistryError::Decode {
                        document: "package metadata",
                        source,
                    })?;
                let packages = if shape.minified.is_some() {
                    shape
                        .packages
                        .into_iter()
                        .map(|(name, versions)| (name, expand_minified(versions)))
                        .collect()
                } else {
                    shape.packages
                };
                Ok(PackageDocument::Direct(packages))
            }
            DocumentKind::Provider => {
                let shape: ProviderShape =
                    serde_json::from_slice(body).map_err(|source| RegistryError::Decode {
                        document: "provider document",
                        source,
                    })?;
                Ok(PackageDocument::Provider(shape.packages))
            }
        }
    }

    /// Normalized versions for `name`, or `None` if the document does not
    /// mention it. Entries that are not version objects are dropped.
    pub fn into_versions(self, name: &str) -> Option<Vec<VersionRecord>> {
        let raw: Vec<Value> = match self {
            PackageDocument::Direct(mut packages) => packages.remove(name)?,
            PackageDocument::Provider(mut packages) => packages.remove(name)?.into_values().collect(),
        };
        Some(
            raw.into_iter()
                .filter_map(|v| serde_json::from_value::<VersionRecord>(v).ok())
                .collect(),
        )
    }
}

/// Undo Composer 2 metadata minification.
///
/// Each entry after the first lists only the keys that changed relative to
/// the previous (expanded) entry; a value of `"__unset"` deletes the key.
pub fn expand_minified(versions: Vec<Value>) -> Vec<Value> {
    let mut expanded = Vec::with_capacity(versions.len());
    let mut current = Map::new();
    for entry in versions {
        let Value::Object(entry) = entry else {
            continue;
        };
        for (key, value) in entry {
            if value.as_str() == Some(UNSET) {
                current.remove(&key);
            } else {
                current.insert(key, value);
            }
        }
        expanded.push(Value::Object(current.clone()));
    }
    expanded
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `dist` is sometimes `null`, `"__unset"` or otherwise not an object;
/// all of those mean "no dist" rather than a broken document.
fn lenient_dist<'de, D>(deserializer: D) -> std::result::Result<Option<DistInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

pub(crate) fn lenient_time<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc)))
}
