use syn::parse::{Parse, ParseStream};

use super::*;
use crate::utils::strip_whitespace;

/// The `#[memoize(...)]` attribute arguments.
pub struct Config {
    /// Parameters excluded from the fingerprint.
    ignore: Vec<syn::Ident>,
}

impl Parse for Config {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut ignore = vec![];
        if !input.is_empty() {
            let keyword: syn::Ident = input.parse()?;
            if keyword != "ignore" {
                return Err(Error::new(
                    keyword.span(),
                    "restash: expected `ignore(...)`",
                ));
            }
            let content;
            syn::parenthesized!(content in input);
            let names =
                content.parse_terminated(syn::Ident::parse, syn::Token![,])?;
            ignore = names.into_iter().collect();
        }
        Ok(Self { ignore })
    }
}

/// Memoize a function.
pub fn expand(config: Config, mut func: syn::ItemFn) -> Result<proc_macro2::TokenStream> {
    if let Some(asyncness) = func.sig.asyncness {
        bail!(
            asyncness,
            "async functions cannot be memoized; \
             they have no single result to persist"
        );
    }

    let mut args = vec![];
    for input in &func.sig.inputs {
        let typed = match input {
            syn::FnArg::Typed(typed) => typed,
            syn::FnArg::Receiver(_) => {
                bail!(input, "methods are not supported")
            }
        };

        let name = match typed.pat.as_ref() {
            syn::Pat::Ident(syn::PatIdent {
                by_ref: None,
                mutability: None,
                ident,
                subpat: None,
                ..
            }) => ident,
            pat => bail!(pat, "only simple identifiers are supported"),
        };

        args.push(name.clone());
    }

    for ignored in &config.ignore {
        if !args.contains(ignored) {
            bail!(ignored, "unknown parameter `{}`", ignored);
        }
    }

    // One fingerprint part per declared parameter, in declaration order.
    // Ignored parameters stay in the list so the layout is stable.
    let parts = args.iter().map(|arg| {
        let name = arg.to_string();
        if config.ignore.contains(arg) {
            quote! { (#name, ::core::option::Option::None) }
        } else {
            quote! { (#name, ::core::option::Option::Some(::restash::identity(&#arg))) }
        }
    });
    let count = args.len();

    let ret: syn::Type = match &func.sig.output {
        syn::ReturnType::Default => parse_quote! { () },
        syn::ReturnType::Type(_, ty) => (**ty).clone(),
    };

    let name = func.sig.ident.to_string();
    let source = strip_whitespace(&func.block);

    // Construct the inner closure.
    let body = &func.block;
    let closure = quote! { move || #body };

    func.block = parse_quote! { {
        ::restash::internal::assert_persistable::<#ret>();
        static __RESTASH_SPEC: ::restash::internal::CallSpec =
            ::restash::internal::CallSpec {
                origin: file!(),
                qualname: concat!(module_path!(), "::", #name),
                source: #source,
            };
        let __restash_parts: [(&'static str, ::core::option::Option<::std::string::String>); #count] =
            [#(#parts),*];
        ::restash::internal::memoized(&__RESTASH_SPEC, &__restash_parts, #closure)
    } };

    Ok(quote! { #func })
}
