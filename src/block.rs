//! The block memoizer.
//!
//! `checkpoint!` guards a lexical block: its fingerprint combines the
//! execution context, the identity of every watched value and the literal
//! text of the block body. When every produced output already has a
//! persisted artifact for that fingerprint, the body is skipped entirely
//! and the outputs are restored into their bindings; otherwise the body
//! runs and each output is persisted individually.
//!
//! The skip is a plain branch: the macro captures the body as the second
//! arm of an `if`, so a hit never evaluates a single statement of it. The
//! body text is captured at expansion time from the macro's own tokens, not
//! recovered from the source at run time.

use std::fmt::Write;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::hash::hash;
use crate::identity::write_labeled;
use crate::memoize::origin;
use crate::stash::Stash;
use crate::testing;

/// The compile-time description of a guarded block.
///
/// Generated by the `checkpoint!` macro.
pub struct BlockSpec<'a> {
    /// The defining source file.
    pub context: &'static str,
    /// Watched name and derived identity, in watch order.
    pub watches: &'a [(&'static str, String)],
    /// The names of the produced outputs.
    pub produces: &'a [&'static str],
    /// The whitespace-stripped body text.
    pub source: &'static str,
    /// Disambiguates otherwise identical blocks.
    pub tag: Option<&'static str>,
}

impl BlockSpec<'_> {
    /// Hash the status fingerprint and decide whether to skip the body.
    ///
    /// Watch identities are length-prefixed, as is the body text, so no
    /// combination of watched values, body and tag can assemble into
    /// another block's status string.
    pub fn resolve(&self) -> Block {
        let mut status = String::new();
        write!(status, "{}-", origin(self.context)).unwrap();
        for (name, id) in self.watches {
            write_labeled(&mut status, name, id);
        }
        write!(status, "{}:{}", self.source.len(), self.source).unwrap();
        if let Some(tag) = self.tag {
            write!(status, "-{tag}").unwrap();
        }

        let digest = hash(&status);
        let stash = Stash::new();

        // Skip only if every produced output is already persisted for this
        // status digest.
        let skip = self
            .produces
            .iter()
            .all(|output| stash.output_path(digest, output).exists());

        if skip {
            testing::register_hit();
        } else {
            testing::register_miss();
        }

        Block { digest, stash, skip }
    }
}

/// A resolved block guard.
pub struct Block {
    digest: u128,
    stash: Stash,
    skip: bool,
}

impl Block {
    /// Whether the body must be skipped and the outputs restored.
    pub fn skip(&self) -> bool {
        self.skip
    }

    /// Load one produced output from its artifact.
    pub fn restore<T: DeserializeOwned>(&self, output: &str) -> T {
        let path = self.stash.output_path(self.digest, output);
        match self.stash.load(&path) {
            Ok(value) => value,
            Err(err) => panic!("restash: failed to restore `{output}`: {err}"),
        }
    }

    /// Persist one produced output to its artifact.
    pub fn persist<T: Serialize>(&self, output: &str, value: &T) {
        let path = self.stash.output_path(self.digest, output);
        if let Err(err) = self.stash.save(&path, value) {
            panic!("restash: failed to persist `{output}`: {err}");
        }
    }
}
