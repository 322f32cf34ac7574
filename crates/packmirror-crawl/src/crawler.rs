use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use packmirror_fetch::{Fetcher, HttpClient};
use packmirror_fs::AtomicWriteOptions;
use packmirror_registry::{MirrorTemplates, RegistryBase, RootIndex};
use packmirror_state::{Checkpoint, PublishReport, RecordSink, StateStore};
use tokio::task::JoinSet;

use crate::error::{CrawlError, Result};
use crate::outcome::OutcomeCounts;
use crate::progress::{InFlight, ProgressReporter};
use crate::task::{Context, ShardSummary, crawl_shard};

const MIRROR_INDEX_FILE: &str = "packages.json";

/// Settings for one [`Crawler`].
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Upstream registry base URL.
    pub registry:            String,
    /// Checkpoint, mirror index and dump location.
    pub data_dir:            PathBuf,
    /// Package fetch workers per shard.
    ///
    /// Default: 30
    pub concurrency:         usize,
    /// Packages taken from each shard; `None` takes them all.
    pub shard_package_limit: Option<usize>,
    /// Write every fetched shard and package body under `data_dir`.
    pub dump:                bool,
    /// Log every package fetch at info instead of debug.
    pub verbose:             bool,
    /// URL templates advertised by the generated mirror index.
    pub templates:           MirrorTemplates,
    /// Period of the in-flight progress log.
    ///
    /// Default: 5s
    pub progress_every:      Duration,
}

impl CrawlConfig {
    pub fn new(registry: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry:            registry.into(),
            data_dir:            data_dir.into(),
            concurrency:         30,
            shard_package_limit: None,
            dump:                false,
            verbose:             false,
            templates:           MirrorTemplates::default(),
            progress_every:      Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn shard_package_limit(mut self, limit: Option<usize>) -> Self {
        self.shard_package_limit = limit;
        self
    }

    #[must_use]
    pub fn dump(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn templates(mut self, templates: MirrorTemplates) -> Self {
        self.templates = templates;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Init,
    RootFetched,
    ShardsInFlight,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrawlPhase::Init => "init",
            CrawlPhase::RootFetched => "root-fetched",
            CrawlPhase::ShardsInFlight => "shards-in-flight",
            CrawlPhase::Finalizing => "finalizing",
            CrawlPhase::Done => "done",
            CrawlPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub shards:        usize,
    pub shards_failed: usize,
    /// Packages taken from shards (each may be one or two fetches).
    pub packages:      usize,
    pub outcomes:      OutcomeCounts,
    /// `None` when no sink is configured.
    pub publish:       Option<PublishReport>,
    pub missing:       usize,
    pub records:       usize,
    pub elapsed:       Duration,
}

/// Drives one crawl per [`run`](Crawler::run) call.
///
/// State is loaded from and saved to the configured data directory on every
/// run, so repeated runs are incremental.
pub struct Crawler<C: HttpClient> {
    fetcher: Arc<Fetcher<C>>,
    config:  Arc<CrawlConfig>,
    sink:    Option<Arc<dyn RecordSink>>,
    phase:   Mutex<CrawlPhase>,
}

impl<C: HttpClient + 'static> Crawler<C> {
    pub fn new(fetcher: Fetcher<C>, config: CrawlConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config:  Arc::new(config),
            sink:    None,
            phase:   Mutex::new(CrawlPhase::Init),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &CrawlConfig { &self.config }

    /// Phase reached by the current or most recent run.
    pub fn phase(&self) -> CrawlPhase { *self.phase.lock().unwrap_or_else(PoisonError::into_inner) }

    pub async fn run(&self) -> Result<CrawlReport> {
        let started = Instant::now();
        self.enter(CrawlPhase::Init);

        match self.run_phases().await {
            Ok(mut report) => {
                report.elapsed = started.elapsed();
                self.enter(CrawlPhase::Done);
                tracing::info!(
                    shards = report.shards,
                    shards_failed = report.shards_failed,
                    packages = report.packages,
                    updated = report.outcomes.updated,
                    not_modified = report.outcomes.not_modified,
                    not_found = report.outcomes.not_found,
                    skipped = report.outcomes.skipped,
                    checksum = report.outcomes.checksum,
                    transient = report.outcomes.transient,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "crawl finished"
                );
                Ok(report)
            }
            Err(e) => {
                self.enter(CrawlPhase::Failed);
                Err(e)
            }
        }
    }

    async fn run_phases(&self) -> Result<CrawlReport> {
        let checkpoint = Checkpoint::new(&self.config.data_dir);
        let store = StateStore::load(&checkpoint).map_err(CrawlError::LoadCheckpoint)?;

        let base = RegistryBase::new(self.config.registry.as_str());
        let root = self.fetch_root(&base).await?;
        self.enter(CrawlPhase::RootFetched);

        let shards = root.provider_include_urls();
        let ctx = Arc::new(Context {
            fetcher: Arc::clone(&self.fetcher),
            store,
            base,
            root,
            config: Arc::clone(&self.config),
            in_flight: InFlight::new(),
        });

        self.enter(CrawlPhase::ShardsInFlight);
        let mut report = CrawlReport {
            shards: shards.len(),
            ..Default::default()
        };
        let reporter = ProgressReporter::spawn(ctx.in_flight.clone(), self.config.progress_every);

        let mut running = JoinSet::new();
        for shard in shards {
            let ctx = Arc::clone(&ctx);
            running.spawn(async move {
                let path = shard.path.clone();
                (path, crawl_shard(ctx, shard).await)
            });
        }
        while let Some(joined) = running.join_next().await {
            match joined {
                Ok((_, Ok(ShardSummary { packages, counts }))) => {
                    report.packages += packages;
                    report.outcomes.merge(counts);
                }
                Ok((path, Err(e))) => {
                    tracing::error!(shard = %path, error = %e, "shard failed");
                    report.shards_failed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "shard task panicked");
                    report.shards_failed += 1;
                }
            }
        }
        drop(reporter);

        self.enter(CrawlPhase::Finalizing);
        if let Some(sink) = &self.sink {
            report.publish = Some(ctx.store.publish(sink.as_ref()).await);
        }
        ctx.store.save(&checkpoint).map_err(CrawlError::SaveCheckpoint)?;
        self.write_mirror_index(&ctx.root)?;

        report.missing = ctx.store.missing_count();
        report.records = ctx.store.record_count();
        Ok(report)
    }

    async fn fetch_root(&self, base: &RegistryBase) -> Result<RootIndex> {
        let url = base.root_url();
        let response = self.fetcher.fetch(&url, None).await.map_err(CrawlError::RootFetch)?;
        if !response.is_ok() {
            return Err(CrawlError::RootStatus {
                url,
                status: response.status,
            });
        }
        let root = RootIndex::from_slice(&response.body).map_err(CrawlError::RootDecode)?;
        tracing::info!(url = %url, shards = root.provider_includes.len(), "fetched root index");
        Ok(root)
    }

    fn write_mirror_index(&self, root: &RootIndex) -> Result<()> {
        let index = root.clone().into_mirror_index(&self.config.templates, Utc::now());
        let bytes = index.to_vec().map_err(CrawlError::EncodeMirrorIndex)?;
        let path = self.config.data_dir.join(MIRROR_INDEX_FILE);
        packmirror_fs::atomic_write(&path, &bytes, AtomicWriteOptions::default())
            .map_err(CrawlError::WriteMirrorIndex)?;
        tracing::info!(path = %path.display(), "wrote mirror index");
        Ok(())
    }

    fn enter(&self, next: CrawlPhase) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        let from = *phase;
        tracing::info!(%from, to = %next, "crawl phase");
        *phase = next;
    }
}
