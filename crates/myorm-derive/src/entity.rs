//! Entity derive macro implementation

use crate::syn_types::{box_inner, option_inner};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

enum Mapping {
    Column(String),
    Embed,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let mut steps = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let Some(mapping) = parse_mapping(field)? else {
            continue;
        };
        let ty = &field.ty;

        let step = match mapping {
            Mapping::Column(column) => quote! {
                .column(#column, |e: &#name| &e.#ident, |e: &mut #name| &mut e.#ident)
            },
            Mapping::Embed => match option_inner(ty) {
                Some(inner) => match box_inner(inner) {
                    Some(boxed) => quote! {
                        .embed_opt::<#boxed>(
                            |e: &#name| e.#ident.as_deref(),
                            |e: &mut #name| &mut **e.#ident.get_or_insert_with(::core::default::Default::default),
                        )
                    },
                    None => quote! {
                        .embed_opt::<#inner>(
                            |e: &#name| e.#ident.as_ref(),
                            |e: &mut #name| e.#ident.get_or_insert_with(::core::default::Default::default),
                        )
                    },
                },
                None => quote! {
                    .embed::<#ty>(|e: &#name| &e.#ident, |e: &mut #name| &mut e.#ident)
                },
            },
        };
        steps.push(step);
    }

    Ok(quote! {
        impl ::myorm::Entity for #name {
            fn descriptor() -> &'static ::myorm::EntityDescriptor<Self> {
                static DESCRIPTOR: ::std::sync::OnceLock<::myorm::EntityDescriptor<#name>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    ::myorm::EntityDescriptor::<#name>::builder()
                        #(#steps)*
                        .build()
                })
            }
        }
    })
}

fn parse_mapping(field: &syn::Field) -> Result<Option<Mapping>> {
    let mut mapping = None;

    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let parsed = if meta.path.is_ident("column") {
                if meta.input.peek(syn::Token![=]) {
                    let lit: LitStr = meta.value()?.parse()?;
                    Mapping::Column(lit.value())
                } else {
                    let ident = field
                        .ident
                        .as_ref()
                        .ok_or_else(|| meta.error("column needs a named field"))?;
                    Mapping::Column(ident.to_string().trim_start_matches("r#").to_string())
                }
            } else if meta.path.is_ident("embed") {
                Mapping::Embed
            } else {
                return Err(meta.error("expected `column`, `column = \"...\"` or `embed`"));
            };

            if mapping.is_some() {
                return Err(meta.error("a field takes either one `column` or `embed`"));
            }
            mapping = Some(parsed);
            Ok(())
        })?;
    }

    Ok(mapping)
}
