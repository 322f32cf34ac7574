use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::root::HashRef;

/// One `provider-includes` document: package name to provider-document digest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderShard {
    #[serde(default)]
    pub providers: BTreeMap<String, HashRef>,
}

impl ProviderShard {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|source| RegistryError::Decode {
            document: "provider shard",
            source,
        })
    }

    /// `(name, sha256)` pairs in name order.
    pub fn packages(&self) -> impl Iterator<Item = (&str, &str)> {
        self.providers.iter().map(|(name, hash)| (name.as_str(), hash.sha256.as_str()))
    }
}
