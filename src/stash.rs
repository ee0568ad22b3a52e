//! Disk persistence of cache artifacts.
//!
//! A [`Stash`] owns the checkpoint directory and maps digests to artifact
//! paths. Function entries live at `<digest>.bin`, block outputs at
//! `<digest>-<output>.bin` (one artifact per produced output, so producers
//! can add or remove outputs without invalidating unrelated ones). Entries
//! are created on miss and overwritten only by forced recomputation; they
//! are never pruned automatically.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// The checkpoint directory used when none is configured.
pub const DEFAULT_DIR: &str = ".restash-checkpoint";

/// Process-wide override of the checkpoint directory.
static ROOT: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Redirect the default checkpoint directory for this process.
///
/// Without an override, artifacts go to [`DEFAULT_DIR`] in the current
/// working directory.
pub fn set_checkpoint_dir(path: impl Into<PathBuf>) {
    *ROOT.write() = Some(path.into());
}

/// The currently configured checkpoint directory.
pub fn checkpoint_dir() -> PathBuf {
    ROOT.read().clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DIR))
}

/// A handle on one checkpoint directory.
pub struct Stash {
    root: PathBuf,
}

impl Stash {
    /// The stash at the configured default directory.
    pub fn new() -> Self {
        Self::at(checkpoint_dir())
    }

    /// A stash at an explicit directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory artifacts are stored in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The artifact path for a function-cache entry.
    pub fn entry_path(&self, digest: u128) -> PathBuf {
        self.root.join(format!("{digest:032x}.bin"))
    }

    /// The artifact path for one produced output of a block.
    pub fn output_path(&self, digest: u128, output: &str) -> PathBuf {
        self.root.join(format!("{digest:032x}-{output}.bin"))
    }

    /// Serialize a value to the given artifact path.
    ///
    /// Creates the checkpoint directory on first use.
    pub fn save<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(Error::io(&self.root))?;
        let bytes = bincode::serialize(value)?;
        fs::write(path, bytes).map_err(Error::io(path))
    }

    /// Deserialize a value from the given artifact path.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let bytes = fs::read(path).map_err(Error::io(path))?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

impl Default for Stash {
    fn default() -> Self {
        Self::new()
    }
}
