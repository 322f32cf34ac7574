//! Everything the crawler remembers between (and during) runs.
//!
//! [`StateStore`] owns two maps: the permanent set of package names the
//! registry answered 404 for, and one [`CacheRecord`] per package holding
//! conditional-request tokens and the dist references seen so far. Both are
//! loaded from a [`Checkpoint`] directory at startup, mutated by concurrent
//! crawl tasks and written back at the end of a run. [`StateStore::publish`]
//! pushes the dist references to a [`RecordSink`].

mod error;
mod record;
mod sink;
mod store;

pub use error::{Result, SinkError, StateError};
pub use record::CacheRecord;
pub use sink::{MemorySink, RecordSink};
pub use store::{Checkpoint, PublishReport, StateStore};

#[cfg(feature = "redis")]
pub use sink::{RedisSettings, RedisSink};
