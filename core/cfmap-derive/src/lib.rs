//! cfmap derive: procedural macros for the cfmap mapping layer.
//!
//! Provides `#[derive(Entity)]`, which builds an `EntityDescriptor` from
//! `#[cfmap(..)]` attributes, and `#[derive(MultiKey)]` for multi-component
//! wide map keys.

mod attrs;
mod entity;
mod multi_key;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derive macro for entity mapping.
///
/// # Example
///
/// ```ignore
/// #[derive(Entity, Default)]
/// #[cfmap(table = "users", consistency(read = "ONE", write = "QUORUM"))]
/// pub struct User {
///     #[cfmap(id)]
///     id: i64,
///     #[cfmap(column(name = "age_in_year"))]
///     age: i64,
///     #[cfmap(column, lazy)]
///     friends: Vec<String>,
///     #[cfmap(column(table = "user_tweets"))]
///     tweets: WideMap<TimeUuid, String>,
///     #[cfmap(join_column(cascade = "persist, merge"))]
///     referrer: Option<User>,
///     // no attribute: transient
///     cache: Vec<u8>,
/// }
/// ```
///
/// Generates:
/// - `Entity::CLASS_NAME` (module path + type name)
/// - `Entity::descriptor()` with shapes inferred from field types and
///   getter/setter closures for stored fields
#[proc_macro_derive(Entity, attributes(cfmap))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive macro for multi-component wide map keys.
///
/// ```ignore
/// #[derive(MultiKey, Clone, Default)]
/// pub struct TweetKey {
///     #[key(order = 1)]
///     author: String,
///     #[key(order = 2)]
///     posted_at: i64,
/// }
/// ```
#[proc_macro_derive(MultiKey, attributes(key))]
pub fn derive_multi_key(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    multi_key::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
