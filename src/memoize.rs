//! The function memoizer.
//!
//! `#[memoize]` rewrites a function so that each call routes through
//! [`memoized`]: the call's fingerprint is assembled from the function's
//! origin, qualified name, per-argument identities and stripped source
//! text, hashed into a digest, and looked up in the stash. On a miss the
//! function executes and its result is persisted; on a hit the persisted
//! result is loaded and returned without executing.

use std::cell::Cell;
use std::fmt::Write;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::hash::hash;
use crate::identity::write_labeled;
use crate::stash::Stash;
use crate::testing;

thread_local! {
    /// Nesting depth of [`recompute`] scopes.
    static FORCED: Cell<usize> = const { Cell::new(0) };
}

/// Force every memoized call inside the scope to recompute.
///
/// Cached entries are overwritten with the fresh results. This replaces a
/// reserved keyword argument: scoping the flag keeps it out of the wrapped
/// function's signature, and passing anything but a closure is a compile
/// error.
pub fn recompute<R>(scope: impl FnOnce() -> R) -> R {
    struct Guard;
    impl Drop for Guard {
        fn drop(&mut self) {
            FORCED.with(|cell| cell.set(cell.get() - 1));
        }
    }

    FORCED.with(|cell| cell.set(cell.get() + 1));
    let _guard = Guard;
    scope()
}

/// Whether a [`recompute`] scope is active on this thread.
fn forced() -> bool {
    FORCED.with(|cell| cell.get() > 0)
}

/// Ensure a result type can be persisted.
pub fn assert_persistable<T: Serialize + DeserializeOwned>() {}

/// The compile-time identity of a memoized function.
///
/// Generated by the `#[memoize]` macro; the fields come from `file!`,
/// `module_path!` and the function's own body tokens.
pub struct CallSpec {
    /// The defining source file.
    pub origin: &'static str,
    /// The function's qualified name.
    pub qualname: &'static str,
    /// The whitespace-stripped body text, so that edits to the function's
    /// own code invalidate the cache even with unchanged arguments.
    pub source: &'static str,
}

impl CallSpec {
    /// Assemble the fingerprint for one call.
    ///
    /// `parts` holds one entry per declared parameter in declaration order:
    /// the parameter name and its derived identity, or `None` for ignored
    /// parameters. Each identity is length-prefixed (see
    /// [`write_labeled`](crate::identity::write_labeled)) so the assembly
    /// is injective over the parts.
    pub fn fingerprint(&self, parts: &[(&'static str, Option<String>)]) -> String {
        let mut full = String::new();
        write!(full, "{}-{}-", origin(self.origin), self.qualname).unwrap();
        for (name, id) in parts {
            if let Some(id) = id {
                write_labeled(&mut full, name, id);
            }
        }
        full.push_str(self.source);
        full
    }
}

/// Reduce a `file!()` path to its stem.
pub fn origin(file: &'static str) -> &'static str {
    let base = file
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file);
    base.strip_suffix(".rs").unwrap_or(base)
}

/// Execute a function or replay its persisted result.
pub fn memoized<Out, F>(
    spec: &CallSpec,
    parts: &[(&'static str, Option<String>)],
    func: F,
) -> Out
where
    Out: Serialize + DeserializeOwned,
    F: FnOnce() -> Out,
{
    let stash = Stash::new();
    let digest = hash(&spec.fingerprint(parts));
    let path = stash.entry_path(digest);

    if !forced() && path.exists() {
        match stash.load(&path) {
            Ok(output) => {
                testing::register_hit();
                return output;
            }
            Err(err) => panic!(
                "restash: failed to load the cache entry of `{}`: {err}",
                spec.qualname
            ),
        }
    }

    let output = func();
    if let Err(err) = stash.save(&path, &output) {
        panic!(
            "restash: failed to persist the result of `{}`: {err}",
            spec.qualname
        );
    }
    testing::register_miss();
    output
}
