extern crate proc_macro;

macro_rules! bail {
    ($item:expr, $fmt:literal $($tts:tt)*) => {
        return Err(Error::new_spanned(
            &$item,
            format!(concat!("restash: ", $fmt) $($tts)*)
        ))
    }
}

mod checkpoint;
mod identity;
mod memoize;
mod utils;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Error, Result, parse_quote};

/// Memoize a function to disk.
///
/// Each call is fingerprinted from the function's defining file, qualified
/// name, argument identities and body text. A call whose fingerprint
/// already has a persisted entry loads the result instead of executing.
///
/// ```ignore
/// #[restash::memoize]
/// fn summarize(values: Vec<f64>, digits: u32) -> String {
///     format!("{:.1$?}", values, digits as usize)
/// }
/// ```
///
/// Parameters named in `ignore(...)` do not participate in the
/// fingerprint:
///
/// ```ignore
/// #[restash::memoize(ignore(verbose))]
/// fn fit(data: Vec<f64>, verbose: bool) -> f64 {
///     data.iter().sum()
/// }
/// ```
///
/// Async functions are rejected: they have no single deterministic result
/// to persist. Argument types must implement `restash::Identity` and the
/// return type must be serde-serializable.
#[proc_macro_attribute]
pub fn memoize(attr: TokenStream, stream: TokenStream) -> TokenStream {
    let config = syn::parse_macro_input!(attr as memoize::Config);
    let func = syn::parse_macro_input!(stream as syn::ItemFn);
    memoize::expand(config, func)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Guard a block of statements with a checkpoint.
///
/// The block's fingerprint combines the identities of the `watch`ed values
/// with the literal body text. If every `produce`d binding has a persisted
/// artifact for that fingerprint, the body is skipped entirely and the
/// bindings are restored from disk; otherwise the body runs and each
/// binding is persisted.
///
/// ```ignore
/// # fn expensive(seed: u64) -> u64 { seed }
/// let seed = 7u64;
/// let model;
/// restash::checkpoint! {
///     watch(seed),
///     produce(model),
///     {
///         model = expensive(seed);
///     }
/// }
/// ```
///
/// Produced names may be dotted field paths (`model.bias`). A binding
/// produced fresh must be declared (`let model;`) before the block so that
/// both the replay and the execute arm can initialize it. An optional
/// `tag = "..."` disambiguates otherwise identical blocks.
#[proc_macro]
pub fn checkpoint(stream: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(stream as checkpoint::CheckpointInput);
    checkpoint::expand(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Derive an identity from a struct's fields.
///
/// The identity concatenates `name:identity` pairs of the fields in
/// declaration order. Fields marked `#[identity(skip)]` are left out.
#[proc_macro_derive(Identity, attributes(identity))]
pub fn derive_identity(stream: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(stream as syn::DeriveInput);
    identity::expand(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
