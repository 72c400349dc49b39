//! `#[derive(MultiKey)]` expansion

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DataStruct, DeriveInput, Fields, LitInt};

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "MultiKey can only be derived for structs with named fields",
            ));
        }
    };

    // (order, field ident, field type)
    let mut components = Vec::new();
    let mut skipped = Vec::new();
    for field in fields {
        let Some(ident) = &field.ident else {
            continue;
        };
        let mut order: Option<u32> = None;
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("key")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("order") {
                    let lit: LitInt = meta.value()?.parse()?;
                    order = Some(lit.base10_parse()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `order = n`"))
                }
            })?;
        }
        match order {
            Some(order) => components.push((order, ident, &field.ty)),
            None => skipped.push(ident),
        }
    }
    // Orders are checked when the key is parsed; expansion only sorts them.
    components.sort_by_key(|(order, ..)| *order);

    let count = components.len();
    let key_components = components.iter().map(|(order, ident, ty)| {
        let component_name = ident.to_string();
        quote! {
            cfmap_core::value::KeyComponent {
                name: #component_name.to_string(),
                order: #order,
                kind: <#ty as cfmap_core::value::ValueType>::kind(),
            }
        }
    });
    let into_values = components.iter().map(|(_, ident, ty)| {
        quote! { <#ty as cfmap_core::value::ValueType>::into_value(self.#ident)? }
    });
    let bindings: Vec<_> = (0..count).map(|i| format_ident!("component_{}", i)).collect();
    let from_values = components.iter().zip(&bindings).map(|((_, ident, ty), binding)| {
        quote! { #ident: <#ty as cfmap_core::value::ValueType>::from_value(#binding)? }
    });
    let type_name = name.to_string();

    Ok(quote! {
        impl cfmap_core::value::ValueType for #name {
            fn kind() -> cfmap_core::value::ValueKind {
                cfmap_core::value::ValueKind::MultiKey(#type_name.to_string())
            }

            fn into_value(self) -> cfmap_core::error::CfmapResult<cfmap_core::value::Value> {
                Ok(cfmap_core::value::Value::Components(vec![#(#into_values),*]))
            }

            fn from_value(value: cfmap_core::value::Value) -> cfmap_core::error::CfmapResult<Self> {
                let parts = match value {
                    cfmap_core::value::Value::Components(parts) => parts,
                    other => {
                        return Err(cfmap_core::error::CfmapError::type_mismatch(#type_name, other.kind_name()));
                    }
                };
                let [#(#bindings),*]: [cfmap_core::value::Value; #count] = parts.try_into().map_err(
                    |parts: Vec<cfmap_core::value::Value>| {
                        cfmap_core::error::CfmapError::type_mismatch(
                            format!("{} with {} components", #type_name, #count),
                            format!("{} components", parts.len()),
                        )
                    },
                )?;
                Ok(Self {
                    #(#from_values,)*
                    #(#skipped: ::core::default::Default::default(),)*
                })
            }

            fn key_components() -> Option<Vec<cfmap_core::value::KeyComponent>> {
                Some(vec![#(#key_components),*])
            }
        }
    })
}
