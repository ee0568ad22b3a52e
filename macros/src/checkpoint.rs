use syn::parse::{Parse, ParseStream};

use super::*;
use crate::utils::strip_whitespace;

/// The parsed form of a `checkpoint!` invocation:
///
/// ```text
/// watch(<expr>, ...), produce(<path>, ...), [tag = "...",] { <body> }
/// ```
pub struct CheckpointInput {
    watch: Vec<syn::Expr>,
    produce: Vec<syn::Expr>,
    tag: Option<syn::LitStr>,
    body: syn::Block,
}

impl Parse for CheckpointInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let watch = parse_list(input, "watch")?;
        input.parse::<syn::Token![,]>()?;
        let produce = parse_list(input, "produce")?;
        input.parse::<syn::Token![,]>()?;

        for path in &produce {
            check_produce_path(path)?;
        }

        let mut tag = None;
        if input.peek(syn::Ident) {
            let keyword: syn::Ident = input.parse()?;
            if keyword != "tag" {
                return Err(Error::new(keyword.span(), "restash: expected `tag = \"...\"`"));
            }
            input.parse::<syn::Token![=]>()?;
            tag = Some(input.parse()?);
            input.parse::<syn::Token![,]>()?;
        }

        let body = input.parse()?;
        Ok(Self { watch, produce, tag, body })
    }
}

/// Parse `<keyword>(<expr>, ...)`.
fn parse_list(input: ParseStream, keyword: &str) -> Result<Vec<syn::Expr>> {
    let ident: syn::Ident = input.parse()?;
    if ident != keyword {
        return Err(Error::new(
            ident.span(),
            format!("restash: expected `{keyword}(...)`"),
        ));
    }
    let content;
    syn::parenthesized!(content in input);
    let exprs = content.parse_terminated(syn::Expr::parse, syn::Token![,])?;
    Ok(exprs.into_iter().collect())
}

/// A produced name must be an identifier, optionally extended by a chain of
/// named field accesses. The final segment is about to be created, so only
/// the root and the intermediate segments must name existing bindings; the
/// compiler enforces that when the expansion resolves.
fn check_produce_path(expr: &syn::Expr) -> Result<()> {
    match expr {
        syn::Expr::Path(path)
            if path.qself.is_none() && path.path.get_ident().is_some() =>
        {
            Ok(())
        }
        syn::Expr::Field(field) => {
            if !matches!(field.member, syn::Member::Named(_)) {
                bail!(field.member, "produced fields must be named");
            }
            check_produce_path(&field.base)
        }
        expr => bail!(
            expr,
            "produce entries must be identifiers or dotted field paths"
        ),
    }
}

/// Render an expression the way it appears in artifact names: its token
/// form without whitespace, e.g. `model.bias`.
fn entry_name(expr: &syn::Expr) -> String {
    strip_whitespace(expr)
}

/// Expand a `checkpoint!` invocation.
pub fn expand(input: CheckpointInput) -> Result<proc_macro2::TokenStream> {
    let watch_count = input.watch.len();
    let watch_entries = input.watch.iter().map(|expr| {
        let name = entry_name(expr);
        quote! { (#name, ::restash::identity(&(#expr))) }
    });

    let produce_names: Vec<String> = input.produce.iter().map(entry_name).collect();
    let produce_exprs = &input.produce;

    let source = strip_whitespace(&input.body);
    let tag = match &input.tag {
        Some(tag) => quote! { ::core::option::Option::Some(#tag) },
        None => quote! { ::core::option::Option::None },
    };
    let body = &input.body;

    Ok(quote! { {
        let __restash_watches: [(&'static str, ::std::string::String); #watch_count] =
            [#(#watch_entries),*];
        let __restash_spec = ::restash::internal::BlockSpec {
            context: file!(),
            watches: &__restash_watches,
            produces: &[#(#produce_names),*],
            source: #source,
            tag: #tag,
        };
        let __restash_block = __restash_spec.resolve();
        if __restash_block.skip() {
            #(#produce_exprs = __restash_block.restore(#produce_names);)*
        } else {
            #body
            #(__restash_block.persist(#produce_names, &#produce_exprs);)*
        }
    } })
}
