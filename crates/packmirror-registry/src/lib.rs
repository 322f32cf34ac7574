//! Typed views of the three document levels a Composer repository exposes.
//!
//! - [`RootIndex`]: `packages.json`, the entry point with URL templates and
//!   the list of provider shards (`provider-includes`).
//! - [`ProviderShard`]: one shard, mapping package names to the digest of
//!   their provider document.
//! - [`PackageDocument`]: per-package metadata, in either the flat `p2`
//!   shape or the nested provider shape, normalized to [`VersionRecord`]s.

mod error;
mod package;
mod root;
mod shard;
mod template;

pub use error::{RegistryError, Result};
pub use package::{
    DistInfo, DistRef, DocumentKind, PackageDocument, VersionRecord, dist_refs, expand_minified,
};
pub use root::{HashRef, Mirror, MirrorTemplates, RootIndex, ShardRef};
pub use shard::ProviderShard;
pub use template::{RegistryBase, render};
