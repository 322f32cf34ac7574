//! The crawl engine.
//!
//! A run walks the registry's three document levels:
//!
//! 1. `packages.json`, which lists provider shards and their digests;
//! 2. every shard, concurrently and without a bound, verified against the
//!    root's digest;
//! 3. every package named in a shard, through a per-shard [`WorkerPool`]
//!    capped at the configured concurrency.
//!
//! Package fetches never fail the run. Each produces a [`FetchOutcome`] that
//! is tallied into the [`CrawlReport`]. Only root-level and persistence
//! failures surface as [`CrawlError`].

mod crawler;
mod dump;
mod error;
mod outcome;
mod pool;
mod progress;
mod task;

pub use crawler::{CrawlConfig, CrawlPhase, CrawlReport, Crawler};
pub use error::{CrawlError, Result, ShardError};
pub use outcome::{FetchOutcome, OutcomeCounts, SkipReason};
pub use pool::WorkerPool;
pub use progress::{InFlight, InFlightGuard, ProgressReporter};
