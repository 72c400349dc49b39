//! `#[cfmap(..)]` attribute parsing

use proc_macro2::{Ident, Span};
use syn::meta::ParseNestedMeta;
use syn::{Attribute, LitInt, LitStr};

/// Struct-level `#[cfmap(..)]` options.
#[derive(Default)]
pub struct EntityAttrs {
    pub table: Option<LitStr>,
    pub column_family: bool,
    pub serial_version_uid: Option<LitInt>,
    pub consistency: Option<Consistency>,
}

impl EntityAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("cfmap")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    parsed.table = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("column_family") {
                    parsed.column_family = true;
                } else if meta.path.is_ident("serial_version_uid") {
                    parsed.serial_version_uid = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("consistency") {
                    parsed.consistency = Some(Consistency::parse(&meta)?);
                } else {
                    return Err(meta.error("unknown cfmap entity attribute"));
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}

/// `consistency(read = "..", write = "..")`, each side defaulting to ONE.
pub struct Consistency {
    pub read: Ident,
    pub write: Ident,
}

impl Consistency {
    fn parse(meta: &ParseNestedMeta<'_>) -> syn::Result<Self> {
        let mut read = None;
        let mut write = None;
        meta.parse_nested_meta(|inner| {
            let target = if inner.path.is_ident("read") {
                &mut read
            } else if inner.path.is_ident("write") {
                &mut write
            } else {
                return Err(inner.error("expected `read` or `write`"));
            };
            let lit: LitStr = inner.value()?.parse()?;
            *target = Some(level_variant(&lit)?);
            Ok(())
        })?;
        let one = || Ident::new("One", Span::call_site());
        Ok(Self {
            read: read.unwrap_or_else(one),
            write: write.unwrap_or_else(one),
        })
    }
}

fn level_variant(lit: &LitStr) -> syn::Result<Ident> {
    let variant = match lit.value().to_ascii_uppercase().as_str() {
        "ANY" => "Any",
        "ONE" => "One",
        "TWO" => "Two",
        "THREE" => "Three",
        "QUORUM" => "Quorum",
        "LOCAL_QUORUM" => "LocalQuorum",
        "EACH_QUORUM" => "EachQuorum",
        "ALL" => "All",
        other => {
            return Err(syn::Error::new(
                lit.span(),
                format!("unknown consistency level '{other}'"),
            ));
        }
    };
    Ok(Ident::new(variant, lit.span()))
}

/// Mapping role of a field after precedence (id > column > join column).
pub enum FieldRole {
    Id,
    Column { name: Option<LitStr>, table: Option<LitStr> },
    JoinColumn { name: Option<LitStr>, table: Option<LitStr>, cascade: Vec<Ident> },
    Inherit,
}

/// Field-level `#[cfmap(..)]` options.
pub struct FieldAttrs {
    pub role: FieldRole,
    pub lazy: bool,
    pub counter: bool,
    pub consistency: Option<Consistency>,
}

#[derive(Default)]
struct RawFieldAttrs {
    id: bool,
    column: Option<(Option<LitStr>, Option<LitStr>)>,
    join_column: Option<(Option<LitStr>, Option<LitStr>, Vec<Ident>)>,
    inherit: bool,
    lazy: bool,
    counter: bool,
    consistency: Option<Consistency>,
}

impl FieldAttrs {
    /// `None` for fields without a mapping attribute (transient fields).
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Option<Self>> {
        let mut raw = RawFieldAttrs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("cfmap")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    raw.id = true;
                } else if meta.path.is_ident("column") {
                    let mut name = None;
                    let mut table = None;
                    if meta.input.peek(syn::token::Paren) {
                        meta.parse_nested_meta(|inner| {
                            if inner.path.is_ident("name") {
                                name = Some(inner.value()?.parse()?);
                            } else if inner.path.is_ident("table") {
                                table = Some(inner.value()?.parse()?);
                            } else {
                                return Err(inner.error("expected `name` or `table`"));
                            }
                            Ok(())
                        })?;
                    }
                    raw.column = Some((name, table));
                } else if meta.path.is_ident("join_column") {
                    let mut name = None;
                    let mut table = None;
                    let mut cascade = Vec::new();
                    if meta.input.peek(syn::token::Paren) {
                        meta.parse_nested_meta(|inner| {
                            if inner.path.is_ident("name") {
                                name = Some(inner.value()?.parse()?);
                            } else if inner.path.is_ident("table") {
                                table = Some(inner.value()?.parse()?);
                            } else if inner.path.is_ident("cascade") {
                                let lit: LitStr = inner.value()?.parse()?;
                                cascade = cascade_variants(&lit)?;
                            } else {
                                return Err(inner.error("expected `name`, `table` or `cascade`"));
                            }
                            Ok(())
                        })?;
                    }
                    raw.join_column = Some((name, table, cascade));
                } else if meta.path.is_ident("inherit") {
                    raw.inherit = true;
                } else if meta.path.is_ident("lazy") {
                    raw.lazy = true;
                } else if meta.path.is_ident("counter") {
                    raw.counter = true;
                } else if meta.path.is_ident("consistency") {
                    raw.consistency = Some(Consistency::parse(&meta)?);
                } else {
                    return Err(meta.error("unknown cfmap field attribute"));
                }
                Ok(())
            })?;
        }

        let role = if raw.id {
            FieldRole::Id
        } else if let Some((name, table)) = raw.column {
            FieldRole::Column { name, table }
        } else if let Some((name, table, cascade)) = raw.join_column {
            FieldRole::JoinColumn { name, table, cascade }
        } else if raw.inherit {
            FieldRole::Inherit
        } else {
            return Ok(None);
        };
        Ok(Some(Self {
            role,
            lazy: raw.lazy,
            counter: raw.counter,
            consistency: raw.consistency,
        }))
    }
}

fn cascade_variants(lit: &LitStr) -> syn::Result<Vec<Ident>> {
    lit.value()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let variant = match s.to_ascii_lowercase().as_str() {
                "persist" => "Persist",
                "merge" => "Merge",
                "remove" => "Remove",
                "refresh" => "Refresh",
                "all" => "All",
                other => {
                    return Err(syn::Error::new(
                        lit.span(),
                        format!("unknown cascade type '{other}'"),
                    ));
                }
            };
            Ok(Ident::new(variant, lit.span()))
        })
        .collect()
}
