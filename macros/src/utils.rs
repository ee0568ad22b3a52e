use proc_macro2::TokenStream;
use quote::ToTokens;

/// Render syntax with all whitespace removed.
///
/// Fingerprints use this form of source text so that formatting-only edits
/// do not invalidate the cache.
pub fn strip_whitespace(item: &impl ToTokens) -> String {
    let tokens: TokenStream = item.to_token_stream();
    tokens.to_string().chars().filter(|c| !c.is_whitespace()).collect()
}
