//! Disk-backed memoization for exploratory data analysis.
//!
//! Expensive computations in analysis scripts rarely change between runs,
//! yet they rerun every time. This crate caches a computation's result on
//! disk, keyed by a fingerprint of the computation's identity: its source
//! text, its bound arguments (including tables and numeric arrays, which
//! are identified by content, not by memory layout) and its defining
//! context. A repeated invocation with an identical fingerprint replays the
//! persisted result instead of recomputing.
//!
//! # Memoizing a function
//!
//! ```no_run
//! use restash::memoize;
//!
//! #[memoize]
//! fn train(seed: u64, epochs: u32) -> Vec<f64> {
//!     // hours of work...
//!     vec![seed as f64; epochs as usize]
//! }
//!
//! let first = train(7, 100); // executes and persists
//! let again = train(7, 100); // loads from disk, does not execute
//! ```
//!
//! Parameters can be excluded from the fingerprint with
//! `#[memoize(ignore(verbose))]`, and a [`recompute`] scope forces fresh
//! execution.
//!
//! # Memoizing a block
//!
//! ```no_run
//! # fn expensive(seed: u64) -> u64 { seed }
//! let seed = 7u64;
//! let model;
//! restash::checkpoint! {
//!     watch(seed),
//!     produce(model),
//!     {
//!         model = expensive(seed);
//!     }
//! }
//! ```
//!
//! The block body is skipped entirely when every produced binding already
//! has a persisted artifact for the current fingerprint; the bindings are
//! then restored from disk instead.
//!
//! Artifacts live in `.restash-checkpoint/` in the working directory (see
//! [`set_checkpoint_dir`]) and are never pruned automatically: the only
//! invalidation is fingerprint mismatch.

mod block;
mod caveat;
mod content;
mod error;
mod frame;
mod hash;
mod identity;
mod memoize;
mod reader;
mod saver;
mod stash;
mod testing;

pub use crate::caveat::{Caveat, drain_caveats};
pub use crate::content::{Array2, ContentHash, Layout};
pub use crate::error::{Error, Result};
pub use crate::frame::{Frame, Series, Value};
pub use crate::identity::{Identity, identity, opaque};
pub use crate::memoize::recompute;
pub use crate::reader::{DataReader, ReadFn, ReadOptions};
pub use crate::saver::{AsFrame, AutoSaver, WriteOptions};
pub use crate::stash::{DEFAULT_DIR, Stash, checkpoint_dir, set_checkpoint_dir};

#[cfg(feature = "macros")]
pub use restash_macros::{Identity, checkpoint, memoize};

/// These are implementation details. Do not rely on them!
#[doc(hidden)]
pub mod internal {
    pub use crate::block::{Block, BlockSpec};
    pub use crate::hash::{hash, hash_bytes};
    pub use crate::identity::write_labeled;
    pub use crate::memoize::{CallSpec, assert_persistable, memoized, origin};
    pub use crate::testing::{hit_count, miss_count};
}
