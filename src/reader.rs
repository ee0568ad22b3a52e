//! The table-reading front-end.
//!
//! A [`DataReader`] is a process-wide singleton per logical id: the first
//! `get` for an id constructs it, later calls return the same instance.
//! Construction and lookup happen under a single registry lock. All
//! configuration fields are set-once: re-setting a field to the identical
//! value is an informational no-op, re-setting it to a different value is a
//! fatal conflict (use another id instead).

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::info;

use crate::error::{Error, Result};
use crate::frame::Frame;

/// The registry of configured readers, keyed by id.
static REGISTRY: LazyLock<Mutex<FxHashMap<String, Arc<DataReader>>>> =
    LazyLock::new(|| Mutex::new(FxHashMap::default()));

/// How delimited files are parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// The field delimiter.
    pub delimiter: u8,
    /// Whether the first line carries column labels.
    pub has_header: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { delimiter: b',', has_header: true }
    }
}

/// A custom reading function replacing the built-in delimited parser.
pub type ReadFn = fn(&Path) -> Result<Frame>;

/// Configured access to the train/test/val splits of a dataset.
pub struct DataReader {
    id: String,
    train: Mutex<Option<PathBuf>>,
    test: Mutex<Option<PathBuf>>,
    val: Mutex<Option<PathBuf>>,
    options: Mutex<Option<ReadOptions>>,
    read_fn: Mutex<Option<ReadFn>>,
}

impl DataReader {
    /// Fetch the reader for an id, constructing it on first access.
    pub fn get(id: &str) -> Arc<Self> {
        let mut registry = REGISTRY.lock();
        registry
            .entry(id.to_string())
            .or_insert_with(|| {
                Arc::new(Self {
                    id: id.to_string(),
                    train: Mutex::new(None),
                    test: Mutex::new(None),
                    val: Mutex::new(None),
                    options: Mutex::new(None),
                    read_fn: Mutex::new(None),
                })
            })
            .clone()
    }

    /// The reader for the default id.
    pub fn default_reader() -> Arc<Self> {
        Self::get("default")
    }

    /// The logical id this reader is registered under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Configure the training-split path.
    pub fn set_train_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.set_path(&self.train, "train_path", path.into())
    }

    /// Configure the test-split path.
    pub fn set_test_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.set_path(&self.test, "test_path", path.into())
    }

    /// Configure the validation-split path.
    pub fn set_val_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.set_path(&self.val, "val_path", path.into())
    }

    /// Configure how delimited files are parsed.
    pub fn set_options(&self, options: ReadOptions) -> Result<()> {
        let mut slot = self.options.lock();
        match &*slot {
            Some(existing) if *existing == options => {
                info!(
                    id = self.id,
                    "reading configuration is already set, \
                     it's unnecessary to set it again"
                );
                Ok(())
            }
            Some(_) => Err(Error::Conflict { field: "options" }),
            None => {
                *slot = Some(options);
                Ok(())
            }
        }
    }

    /// Replace the built-in parser with a custom reading function.
    pub fn set_read_fn(&self, read_fn: ReadFn) -> Result<()> {
        let mut slot = self.read_fn.lock();
        match &*slot {
            Some(existing) if std::ptr::fn_addr_eq(*existing, read_fn) => {
                info!(
                    id = self.id,
                    "reading function is already set, \
                     it's unnecessary to set it again"
                );
                Ok(())
            }
            Some(_) => Err(Error::Conflict { field: "read_fn" }),
            None => {
                *slot = Some(read_fn);
                Ok(())
            }
        }
    }

    /// Read the training split.
    pub fn train(&self) -> Result<Frame> {
        self.read(&self.train, "train_path")
    }

    /// Read the test split.
    pub fn test(&self) -> Result<Frame> {
        self.read(&self.test, "test_path")
    }

    /// Read the validation split.
    pub fn val(&self) -> Result<Frame> {
        self.read(&self.val, "val_path")
    }

    fn set_path(
        &self,
        slot: &Mutex<Option<PathBuf>>,
        field: &'static str,
        path: PathBuf,
    ) -> Result<()> {
        if !path.exists() {
            return Err(Error::InvalidPath { path });
        }
        let mut slot = slot.lock();
        match &*slot {
            Some(existing) if *existing == path => {
                info!(
                    id = self.id,
                    field, "path is already set, it's unnecessary to set it again"
                );
                Ok(())
            }
            Some(_) => Err(Error::Conflict { field }),
            None => {
                *slot = Some(path);
                Ok(())
            }
        }
    }

    fn read(&self, slot: &Mutex<Option<PathBuf>>, field: &'static str) -> Result<Frame> {
        let path = slot.lock().clone().ok_or(Error::Unconfigured { field })?;
        if let Some(read_fn) = *self.read_fn.lock() {
            return read_fn(&path);
        }
        let options = self.options.lock().clone().unwrap_or_default();
        Frame::read_delimited(&path, options.delimiter, options.has_header)
    }
}
