//! `#[derive(Entity)]` expansion

use crate::attrs::{Consistency, EntityAttrs, FieldAttrs, FieldRole};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DataStruct, DeriveInput, Fields, GenericArgument, Ident, PathArguments, Type};

/// Container shape of a field type.
enum TypeShape<'a> {
    Scalar(&'a Type),
    Optional(&'a Type),
    List(&'a Type),
    Set(&'a Type),
    Map(&'a Type, &'a Type),
    WideMap(&'a Type, &'a Type),
}

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic types",
        ));
    }
    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Entity can only be derived for structs with named fields",
            ));
        }
    };

    let attrs = EntityAttrs::parse(&input.attrs)?;
    let mut descriptor = quote! {
        cfmap_core::parser::EntityDescriptor::new(<Self as cfmap_core::parser::Entity>::CLASS_NAME)
    };
    if let Some(table) = &attrs.table {
        descriptor.extend(quote! { .table(#table) });
    }
    if attrs.column_family {
        descriptor.extend(quote! { .column_family() });
    }
    if let Some(uid) = &attrs.serial_version_uid {
        descriptor.extend(quote! { .serial_version_uid(#uid) });
    }
    if let Some(consistency) = &attrs.consistency {
        let levels = levels_tokens(consistency);
        descriptor.extend(quote! { .consistency(#levels) });
    }

    for field in fields {
        let Some(ident) = &field.ident else {
            continue;
        };
        let Some(field_attrs) = FieldAttrs::parse(&field.attrs)? else {
            continue;
        };
        if let FieldRole::Inherit = field_attrs.role {
            let base = &field.ty;
            descriptor.extend(quote! {
                .parent(
                    <#base as cfmap_core::parser::Entity>::descriptor()
                        .lift::<#name, #base>(|e| &e.#ident, |e| &mut e.#ident)
                )
            });
            continue;
        }
        let field_tokens = field_descriptor(name, ident, &field.ty, &field_attrs)?;
        descriptor.extend(quote! { .field(#field_tokens) });
    }

    Ok(quote! {
        impl cfmap_core::parser::Entity for #name {
            const CLASS_NAME: &'static str = concat!(module_path!(), "::", stringify!(#name));

            fn descriptor() -> cfmap_core::parser::EntityDescriptor {
                #descriptor
            }
        }
    })
}

fn field_descriptor(entity: &Ident, ident: &Ident, ty: &Type, attrs: &FieldAttrs) -> syn::Result<TokenStream> {
    let field_name = ident.to_string();
    let shape = classify(ty);

    let mut tokens = match &attrs.role {
        FieldRole::Id => {
            let shape_tokens = column_shape(&shape);
            quote! { cfmap_core::parser::FieldDescriptor::id(#field_name, #shape_tokens) }
        }
        FieldRole::Column { name, table } => {
            let shape_tokens = column_shape(&shape);
            let mut t = quote! { cfmap_core::parser::FieldDescriptor::column(#field_name, #shape_tokens) };
            if let Some(name) = name {
                t.extend(quote! { .named(#name) });
            }
            if let Some(table) = table {
                t.extend(quote! { .table(#table) });
            }
            t
        }
        FieldRole::JoinColumn { name, table, cascade } => {
            let shape_tokens = join_shape(ty, &shape)?;
            let mut t = quote! { cfmap_core::parser::FieldDescriptor::join_column(#field_name, #shape_tokens) };
            if let Some(name) = name {
                t.extend(quote! { .named(#name) });
            }
            if let Some(table) = table {
                t.extend(quote! { .table(#table) });
            }
            if !cascade.is_empty() {
                t.extend(quote! {
                    .cascade([#(cfmap_core::metadata::CascadeType::#cascade),*])
                });
            }
            t
        }
        FieldRole::Inherit => {
            return Err(syn::Error::new_spanned(ident, "inherited fields are not columns"));
        }
    };

    if attrs.lazy {
        tokens.extend(quote! { .lazy() });
    }
    if attrs.counter {
        tokens.extend(quote! { .counter() });
    }
    if let Some(consistency) = &attrs.consistency {
        let levels = levels_tokens(consistency);
        tokens.extend(quote! { .consistency(#levels) });
    }
    if !matches!(attrs.role, FieldRole::JoinColumn { .. })
        && let Some(accessors) = accessors(entity, ident, &shape)
    {
        tokens.extend(quote! { .accessors(#accessors) });
    }
    Ok(tokens)
}

fn column_shape(shape: &TypeShape<'_>) -> TokenStream {
    match shape {
        TypeShape::Scalar(t) | TypeShape::Optional(t) => {
            quote! { cfmap_core::parser::FieldShape::scalar::<#t>() }
        }
        TypeShape::List(t) => quote! { cfmap_core::parser::FieldShape::list::<#t>() },
        TypeShape::Set(t) => quote! { cfmap_core::parser::FieldShape::set::<#t>() },
        TypeShape::Map(k, v) => quote! { cfmap_core::parser::FieldShape::map::<#k, #v>() },
        TypeShape::WideMap(k, v) => quote! { cfmap_core::parser::FieldShape::wide_map::<#k, #v>() },
    }
}

fn join_shape(ty: &Type, shape: &TypeShape<'_>) -> syn::Result<TokenStream> {
    match shape {
        TypeShape::Scalar(t) | TypeShape::Optional(t) => {
            let target = peel_pointer(t);
            Ok(quote! { cfmap_core::parser::FieldShape::join::<#target>() })
        }
        TypeShape::WideMap(k, v) => {
            let target = peel_pointer(v);
            Ok(quote! { cfmap_core::parser::FieldShape::join_wide_map::<#k, #target>() })
        }
        _ => Err(syn::Error::new_spanned(
            ty,
            "join_column fields should be an entity, an Option of an entity or a WideMap of entities",
        )),
    }
}

/// Getter/setter closures over the field. Wide maps hold no data and get none.
fn accessors(entity: &Ident, ident: &Ident, shape: &TypeShape<'_>) -> Option<TokenStream> {
    let (get, set) = match shape {
        TypeShape::Scalar(_) => (quote!(get_simple), quote!(set_simple)),
        TypeShape::Optional(_) => (quote!(get_option), quote!(set_option)),
        TypeShape::List(_) => (quote!(get_list), quote!(set_list)),
        TypeShape::Set(_) => (quote!(get_set), quote!(set_set)),
        TypeShape::Map(..) => (quote!(get_map), quote!(set_map)),
        TypeShape::WideMap(..) => return None,
    };
    Some(quote! {
        cfmap_core::metadata::Accessors::of(
            |e: &#entity| cfmap_core::value::access::#get(&e.#ident),
            |e: &mut #entity, v| cfmap_core::value::access::#set(&mut e.#ident, v),
        )
    })
}

fn levels_tokens(consistency: &Consistency) -> TokenStream {
    let read = &consistency.read;
    let write = &consistency.write;
    quote! {
        cfmap_core::consistency::ConsistencyLevels::new(
            cfmap_core::consistency::ConsistencyLevel::#read,
            cfmap_core::consistency::ConsistencyLevel::#write,
        )
    }
}

fn classify(ty: &Type) -> TypeShape<'_> {
    let Some((ident, args)) = last_segment(ty) else {
        return TypeShape::Scalar(ty);
    };
    match (ident.to_string().as_str(), args.as_slice()) {
        ("Vec", &[inner]) if is_u8(inner) => TypeShape::Scalar(ty),
        ("Vec", &[inner]) => TypeShape::List(inner),
        ("Option", &[inner]) => TypeShape::Optional(inner),
        ("HashSet", &[inner, ..]) => TypeShape::Set(inner),
        ("HashMap", &[k, v, ..]) => TypeShape::Map(k, v),
        ("WideMap", &[k, v]) => TypeShape::WideMap(k, v),
        _ => TypeShape::Scalar(ty),
    }
}

/// `Box<T>` and `Arc<T>` join targets resolve to `T`.
fn peel_pointer(ty: &Type) -> &Type {
    match last_segment(ty) {
        Some((ident, args)) if (ident == "Box" || ident == "Arc") && args.len() == 1 => args[0],
        _ => ty,
    }
}

fn last_segment(ty: &Type) -> Option<(&Ident, Vec<&Type>)> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let args = match &segment.arguments {
        PathArguments::AngleBracketed(generic) => generic
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(t) => Some(t),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Some((&segment.ident, args))
}

fn is_u8(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.qself.is_none() && p.path.is_ident("u8"))
}
