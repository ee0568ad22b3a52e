use super::*;

/// Derive `Identity` for a struct with named fields.
pub fn expand(input: syn::DeriveInput) -> Result<proc_macro2::TokenStream> {
    let syn::Data::Struct(data) = &input.data else {
        bail!(input, "only structs can derive `Identity`");
    };
    let syn::Fields::Named(fields) = &data.fields else {
        bail!(input, "only structs with named fields can derive `Identity`");
    };

    let mut writes = vec![];
    for field in &fields.named {
        if skipped(field)? {
            continue;
        }
        let ident = field.ident.as_ref().expect("named field");
        let name = ident.to_string();
        // Length-prefixed pairs, so field identities containing the
        // separators cannot collide across field boundaries.
        writes.push(quote! {
            ::restash::internal::write_labeled(
                out,
                #name,
                &::restash::identity(&self.#ident),
            );
        });
    }

    // Every type parameter must itself have an identity.
    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote! { ::restash::Identity });
    }
    let (impl_generics, _, _) = generics.split_for_impl();
    let (_, ty_generics, where_clause) = input.generics.split_for_impl();

    let ty = &input.ident;
    Ok(quote! {
        impl #impl_generics ::restash::Identity for #ty #ty_generics #where_clause {
            fn write_identity(&self, out: &mut ::std::string::String) {
                #(#writes)*
            }
        }
    })
}

/// Whether a field carries `#[identity(skip)]`.
fn skipped(field: &syn::Field) -> Result<bool> {
    let mut skip = false;
    for attr in &field.attrs {
        if attr.path().is_ident("identity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    Ok(())
                } else {
                    Err(meta.error("restash: unknown `identity` attribute"))
                }
            })?;
        }
    }
    Ok(skip)
}
