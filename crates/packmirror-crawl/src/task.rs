use std::sync::Arc;
use std::time::Instant;

use packmirror_fetch::{FetchError, Fetcher, HttpClient, Response};
use packmirror_registry::{
    DocumentKind, PackageDocument, ProviderShard, RegistryBase, RootIndex, ShardRef, dist_refs,
};
use packmirror_state::StateStore;

use crate::crawler::CrawlConfig;
use crate::dump::dump;
use crate::error::ShardError;
use crate::outcome::{FetchOutcome, OutcomeCounts, SkipReason};
use crate::pool::WorkerPool;
use crate::progress::InFlight;

/// Everything a shard or package task needs, shared for one run.
pub(crate) struct Context<C: HttpClient> {
    pub fetcher:   Arc<Fetcher<C>>,
    pub store:     StateStore,
    pub base:      RegistryBase,
    pub root:      RootIndex,
    pub config:    Arc<CrawlConfig>,
    pub in_flight: InFlight,
}

#[derive(Debug, Default)]
pub(crate) struct ShardSummary {
    pub packages: usize,
    pub counts:   OutcomeCounts,
}

/// Fetch, verify and decode one provider shard, then fetch every package it
/// lists through a pool of `concurrency` workers.
pub(crate) async fn crawl_shard<C>(
    ctx: Arc<Context<C>>,
    shard: ShardRef,
) -> Result<ShardSummary, ShardError>
where
    C: HttpClient + 'static,
{
    let url = ctx.base.resolve(&shard.path);
    let response = ctx.fetcher.fetch(&url, None).await?;
    if !response.is_ok() {
        return Err(ShardError::Status(response.status));
    }

    if shard.sha256.is_empty() {
        tracing::debug!(shard = %url, "no digest declared, skipping validation");
    } else {
        packmirror_verify::check(&response.body, &shard.sha256)?;
    }

    let providers = ProviderShard::from_slice(&response.body)?;
    if ctx.config.dump {
        dump(&ctx.config.data_dir, &url, &response.body);
    }

    let limit = ctx.config.shard_package_limit.unwrap_or(usize::MAX);
    let mut pool = WorkerPool::new(ctx.config.concurrency);
    let mut packages = 0;
    for (name, sha256) in providers
        .packages()
        .filter(|(name, _)| !ctx.store.is_known_missing(name))
        .take(limit)
    {
        packages += 1;
        for task in PackageTask::plan(&ctx.root, &ctx.base, name, sha256) {
            let guard = ctx.in_flight.enter();
            let task_ctx = Arc::clone(&ctx);
            pool.submit(async move {
                let _guard = guard;
                task.run(&task_ctx).await
            })
            .await;
        }
    }

    let counts: OutcomeCounts = pool.join_all().await.into_iter().collect();
    tracing::info!(
        shard = %url,
        packages,
        updated = counts.updated,
        not_modified = counts.not_modified,
        not_found = counts.not_found,
        "shard done"
    );
    Ok(ShardSummary { packages, counts })
}

/// One per-package document fetch.
#[derive(Debug, Clone)]
pub(crate) struct PackageTask {
    pub name:            String,
    pub kind:            DocumentKind,
    pub url:             String,
    /// Digest the shard declared for this document, if any.
    pub expected_sha256: Option<String>,
}

impl PackageTask {
    /// The documents to fetch for `name`: its metadata document when the
    /// root publishes `metadata-url`, and its provider document when the root
    /// publishes `providers-url` and the shard gave a digest.
    pub fn plan(root: &RootIndex, base: &RegistryBase, name: &str, sha256: &str) -> Vec<Self> {
        let mut tasks = Vec::with_capacity(2);
        if let Some(path) = root.metadata_path(name) {
            tasks.push(Self {
                name:            name.to_string(),
                kind:            DocumentKind::Metadata,
                url:             base.resolve(&path),
                expected_sha256: None,
            });
        }
        if let Some(path) = root.provider_path(name, sha256) {
            tasks.push(Self {
                name:            name.to_string(),
                kind:            DocumentKind::Provider,
                url:             base.resolve(&path),
                expected_sha256: Some(sha256.to_string()),
            });
        }
        tasks
    }

    /// Fetch and apply one document. The outcome depends only on the
    /// response, never on what sibling tasks for the same package saw.
    pub async fn run<C: HttpClient>(self, ctx: &Context<C>) -> FetchOutcome {
        let tokens = ctx.store.conditional_tokens(&self.name, self.kind);
        let started = Instant::now();
        let outcome = match ctx.fetcher.fetch(&self.url, tokens.as_ref()).await {
            Ok(response) => self.apply(ctx, &response),
            Err(e @ FetchError::Decompress { .. }) => {
                tracing::debug!(package = %self.name, error = %e, "undecodable body");
                FetchOutcome::Skipped(SkipReason::Undecodable)
            }
            Err(e) => {
                tracing::warn!(package = %self.name, error = %e, "fetch failed");
                FetchOutcome::TransientFailure
            }
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        if ctx.config.verbose {
            tracing::info!(url = %self.url, latency_ms, %outcome, "fetched");
        } else {
            tracing::debug!(url = %self.url, latency_ms, %outcome, "fetched");
        }
        outcome
    }

    fn apply<C: HttpClient>(&self, ctx: &Context<C>, response: &Response) -> FetchOutcome {
        if response.is_not_found() {
            if ctx.store.mark_missing(&self.name) {
                tracing::info!(package = %self.name, "package not found, suppressing");
            }
            return FetchOutcome::NotFound;
        }
        if response.is_not_modified() {
            return FetchOutcome::NotModified;
        }
        if !response.is_ok() {
            return FetchOutcome::Skipped(SkipReason::Status(response.status));
        }
        if !response.is_json() {
            return FetchOutcome::Skipped(SkipReason::ContentType);
        }
        if let Some(expected) = &self.expected_sha256 {
            if let Err(e) = packmirror_verify::check(&response.body, expected) {
                tracing::warn!(package = %self.name, url = %self.url, error = %e, "checksum mismatch");
                return FetchOutcome::Skipped(SkipReason::ChecksumMismatch);
            }
        }

        if ctx.config.dump {
            dump(&ctx.config.data_dir, &self.url, &response.body);
        }

        let document = match PackageDocument::decode(self.kind, &response.body) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!(package = %self.name, error = %e, "undecodable document");
                return FetchOutcome::Skipped(SkipReason::Undecodable);
            }
        };
        let Some(versions) = document.into_versions(&self.name) else {
            return FetchOutcome::Skipped(SkipReason::MissingPackage);
        };

        let refs = dist_refs(&versions);
        let count = refs.len();
        ctx.store.upsert_package(&self.name, self.kind, response.tokens(), refs);
        FetchOutcome::Updated { refs: count }
    }
}
