use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, punctuated::Punctuated, Attribute, ImplItem, ItemImpl,
    MetaNameValue, Token,
};

/// One `key = value, ...` block
type Declaration = Punctuated<MetaNameValue, Token![,]>;

pub fn layer_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let first = parse_macro_input!(attr with Declaration::parse_terminated);
    let mut input = parse_macro_input!(item as ItemImpl);

    match expand(first, &mut input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(first: Declaration, input: &mut ItemImpl) -> syn::Result<TokenStream2> {
    // The outermost attribute expands first and sees the rest of the stack
    // still attached to the impl block. Collect them here so every
    // declaration lands in a single `metadata` method.
    let mut declarations = vec![first];
    let mut remaining = Vec::with_capacity(input.attrs.len());

    for attr in input.attrs.drain(..) {
        if is_layer_attribute(&attr) {
            declarations.push(attr.parse_args_with(Declaration::parse_terminated)?);
        } else {
            remaining.push(attr);
        }
    }
    input.attrs = remaining;

    let records = declarations
        .iter()
        .map(record_tokens)
        .collect::<syn::Result<Vec<_>>>()?;

    let method: ImplItem = parse_quote! {
        fn metadata(&self) -> ::std::vec::Vec<::onion::Metadata> {
            ::std::vec![#(#records),*]
        }
    };
    input.items.push(method);

    Ok(quote! {
        #input
    })
}

/// `#[layer]`, `#[onion::layer]`, or `#[crate::layer]` from inside the onion crate
fn is_layer_attribute(attr: &Attribute) -> bool {
    let segments: Vec<String> = attr
        .path()
        .segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect();

    match segments.as_slice() {
        [name] => name == "layer",
        [root, name] => (root == "onion" || root == "crate") && name == "layer",
        _ => false,
    }
}

fn record_tokens(declaration: &Declaration) -> syn::Result<TokenStream2> {
    let entries = declaration
        .iter()
        .map(|pair| {
            let key = pair.path.get_ident().ok_or_else(|| {
                syn::Error::new_spanned(&pair.path, "metadata keys must be plain identifiers")
            })?;
            let key = key.to_string();
            let value = &pair.value;

            Ok(quote! {
                record.insert(
                    ::std::string::String::from(#key),
                    ::onion::serde_json::json!(#value),
                );
            })
        })
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        {
            #[allow(unused_mut)]
            let mut record = ::onion::Metadata::new();
            #(#entries)*
            record
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_own_attribute_paths() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[layer(stage = "parse")]),
            parse_quote!(#[onion::layer(stage = "parse")]),
            parse_quote!(#[::onion::layer(stage = "parse")]),
            parse_quote!(#[crate::layer(stage = "parse")]),
        ];

        assert!(attrs.iter().all(is_layer_attribute));
    }

    #[test]
    fn test_leaves_foreign_layer_attributes_alone() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[tower::layer]),
            parse_quote!(#[other::nested::layer(kind = "x")]),
            parse_quote!(#[layers(stage = "parse")]),
        ];

        assert!(!attrs.iter().any(is_layer_attribute));
    }

    #[test]
    fn test_foreign_attribute_stays_on_impl() {
        let mut input: ItemImpl = parse_quote! {
            #[onion::layer(three = "Three")]
            #[tower::layer]
            impl Layer<String> for Checkout {
                fn invoke(&self, value: String) -> LayerResult<String> {
                    Ok(value)
                }
            }
        };

        let first: Declaration = parse_quote!(one = "One");
        expand(first, &mut input).unwrap();

        assert_eq!(input.attrs.len(), 1);
        assert!(input.attrs[0].path().segments[0].ident == "tower");
        assert_eq!(input.items.len(), 2);
    }
}
