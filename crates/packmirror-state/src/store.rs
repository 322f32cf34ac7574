use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use packmirror_fetch::CacheTokens;
use packmirror_fs::AtomicWriteOptions;
use packmirror_registry::{DistRef, DocumentKind};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, SinkError, StateError};
use crate::record::CacheRecord;
use crate::sink::RecordSink;

const MISSING_FILE: &str = "404.json";
const RECORDS_FILE: &str = "dist.json";

/// Directory holding `404.json` and `dist.json`.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    dir: PathBuf,
}

impl Checkpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn missing_path(&self) -> PathBuf { self.dir.join(MISSING_FILE) }

    pub fn records_path(&self) -> PathBuf { self.dir.join(RECORDS_FILE) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub published: usize,
    /// Packages with no dist references; nothing is written for them.
    pub skipped:   usize,
    pub failed:    usize,
}

/// Shared crawl state. Cheap to query from many tasks; wrap in an `Arc`.
///
/// Each map sits behind its own mutex and no lock is held across an await.
#[derive(Debug, Default)]
pub struct StateStore {
    missing: Mutex<BTreeSet<String>>,
    records: Mutex<BTreeMap<String, CacheRecord>>,
}

impl StateStore {
    pub fn new() -> Self { Self::default() }

    pub fn is_known_missing(&self, name: &str) -> bool {
        self.missing.lock().unwrap_or_else(PoisonError::into_inner).contains(name)
    }

    /// Returns `true` if `name` was not already known missing.
    pub fn mark_missing(&self, name: &str) -> bool {
        self.missing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string())
    }

    pub fn conditional_tokens(&self, name: &str, kind: DocumentKind) -> Option<CacheTokens> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .and_then(|record| record.tokens(kind))
            .cloned()
    }

    pub fn upsert_package(
        &self,
        name: &str,
        kind: DocumentKind,
        tokens: CacheTokens,
        refs: BTreeMap<String, DistRef>,
    ) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .merge(kind, tokens, refs);
    }

    pub fn record(&self, name: &str) -> Option<CacheRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }

    pub fn missing_count(&self) -> usize {
        self.missing.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Load both checkpoint files. A file that does not exist yet yields an
    /// empty map; one that exists but does not decode is an error.
    pub fn load(checkpoint: &Checkpoint) -> Result<Self> {
        let missing: BTreeMap<String, bool> =
            read_json(&checkpoint.missing_path())?.unwrap_or_default();
        let records: BTreeMap<String, CacheRecord> =
            read_json(&checkpoint.records_path())?.unwrap_or_default();

        tracing::info!(
            dir = %checkpoint.dir().display(),
            missing = missing.len(),
            records = records.len(),
            "loaded checkpoint"
        );

        Ok(Self {
            missing: Mutex::new(
                missing.into_iter().filter(|(_, gone)| *gone).map(|(name, _)| name).collect(),
            ),
            records: Mutex::new(records),
        })
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let missing: BTreeMap<String, bool> = self
            .missing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|name| (name.clone(), true))
            .collect();
        write_json(&checkpoint.missing_path(), &missing)?;

        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner).clone();
        write_json(&checkpoint.records_path(), &records)?;

        tracing::info!(
            dir = %checkpoint.dir().display(),
            missing = missing.len(),
            records = records.len(),
            "saved checkpoint"
        );
        Ok(())
    }

    /// Push every package's dist references to `sink`, one full overwrite
    /// per package. Failures are counted and logged, not returned.
    pub async fn publish(&self, sink: &dyn RecordSink) -> PublishReport {
        let snapshot: Vec<(String, BTreeMap<String, DistRef>)> = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, record)| (name.clone(), record.dists.clone()))
            .collect();

        let mut report = PublishReport::default();
        for (name, dists) in snapshot {
            if dists.is_empty() {
                report.skipped += 1;
                continue;
            }
            let result = match encode_fields(&name, &dists) {
                Ok(fields) => sink.replace(&name, &fields).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => report.published += 1,
                Err(e) => {
                    tracing::error!(package = %name, error = %e, "publish failed");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            published = report.published,
            skipped = report.skipped,
            failed = report.failed,
            "published dist references"
        );
        report
    }
}

fn encode_fields(
    key: &str,
    dists: &BTreeMap<String, DistRef>,
) -> std::result::Result<BTreeMap<String, String>, SinkError> {
    dists
        .iter()
        .map(|(reference, dist)| {
            serde_json::to_string(dist)
                .map(|json| (reference.clone(), json))
                .map_err(|source| SinkError::Encode {
                    key: key.to_string(),
                    source,
                })
        })
        .collect()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let Some(bytes) = packmirror_fs::read_if_exists(path)? else {
        tracing::debug!(path = %path.display(), "no checkpoint file, starting empty");
        return Ok(None);
    };
    serde_json::from_slice(&bytes).map(Some).map_err(|source| StateError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|source| StateError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    packmirror_fs::atomic_write(path, &bytes, AtomicWriteOptions::default())?;
    Ok(())
}
