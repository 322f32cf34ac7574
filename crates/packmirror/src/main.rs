//! packmirror binary.

mod cli;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use packmirror_crawl::Crawler;
use packmirror_fetch::{Fetcher, ReqwestClient};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::Args;
use crate::config::MirrorConfig;

const VERBOSE_FILTER: &str =
    "info,packmirror=debug,packmirror_crawl=debug,packmirror_fetch=debug,packmirror_state=debug";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = MirrorConfig::load(&args)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if config.verbose { VERBOSE_FILTER.into() } else { "info".into() }
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        mirror = %config.mirror,
        data_dir = %config.data_dir.display(),
        "packmirror starting"
    );

    let crawler = build_crawler(&config).await?;
    if !args.watch {
        crawler.run().await?;
        return Ok(());
    }

    watch(&crawler, &config).await
}

async fn build_crawler(config: &MirrorConfig) -> Result<Crawler<ReqwestClient>> {
    let client = config.client_settings().build().context("failed to build HTTP client")?;
    let fetcher = Fetcher::new(client, config.fetch_options());
    let crawler = Crawler::new(fetcher, config.crawl_config());

    if !config.redis.enabled {
        tracing::info!("redis disabled, dist references will not be published");
        return Ok(crawler);
    }

    let sink = config
        .redis_settings()
        .connect()
        .await
        .context("failed to connect to redis")?;
    Ok(crawler.with_sink(Arc::new(sink)))
}

/// Crawl, sleep `interval`, repeat. A failed run is logged and the loop
/// carries on; Ctrl-C while sleeping exits.
async fn watch(crawler: &Crawler<ReqwestClient>, config: &MirrorConfig) -> Result<()> {
    loop {
        if let Err(e) = crawler.run().await {
            tracing::error!(error = %e, "crawl failed");
        }

        tracing::info!(seconds = config.interval, "sleeping until next run");
        tokio::select! {
            () = tokio::time::sleep(config.interval()) => {}
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                tracing::info!("interrupted, exiting");
                return Ok(());
            }
        }
    }
}
