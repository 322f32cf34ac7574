//! Atomic file primitives.
//!
//! Every file packmirror persists (checkpoints, the generated mirror index,
//! raw document dumps) goes through [`atomic_write`], so a reader never
//! observes a half-written document and a crash mid-write leaves the
//! previous version in place.

mod atomic;
mod error;

pub use atomic::{AtomicWriteOptions, atomic_read, atomic_write, ensure_dir, read_if_exists};
pub use error::{Error, Result};
