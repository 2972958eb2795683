//! Helper functions for retrieving and parsing `#[serde(...)]` and
//! `#[papaya(...)]` attributes.

use syn::{ Attribute, Expr, Lit, LitStr, Path, Token, Type };
use syn::meta::ParseNestedMeta;
use crate::{
    case::RenameRule,
    error::{ Error, Result },
};

/// Attributes of the derived type.
#[derive(Debug, Default)]
pub struct ContainerAttrs {
    /// `#[serde(rename = "...")]`, the serialized name of the type.
    pub rename: Option<String>,
    /// `#[serde(rename_all = "...")]`
    pub rename_all: Option<RenameRule>,
    /// `#[papaya(collection = "...")]`, overrides `rename` as the collection name.
    pub collection: Option<String>,
    /// `#[papaya(aggregate_options = "path::to::function")]`
    pub aggregate_options: Option<Path>,
}

/// How the property table of an embedded document is found.
#[derive(Debug)]
pub enum Embedded {
    /// From the field type, looking through `Option`, `Vec`, `Box` and friends.
    Inferred,
    /// `#[papaya(embedded = "Type")]`
    Explicit(Type),
}

/// Attributes of a single field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// `#[serde(rename = "...")]`
    pub rename: Option<String>,
    /// `#[serde(skip)]` or `#[serde(skip_serializing)]`
    pub skip: bool,
    /// `#[serde(flatten)]`
    pub flatten: bool,
    /// `#[papaya(embedded)]`
    pub embedded: Option<Embedded>,
}

/// Collects the attributes of the derived type.
pub fn container_attrs(attrs: &[Attribute]) -> Result<ContainerAttrs> {
    let mut result = ContainerAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("serde") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    result.rename = serialized_value(&meta)?;
                } else if meta.path.is_ident("rename_all") {
                    result.rename_all = match serialized_value(&meta)? {
                        Some(rule) => Some(rule.parse().map_err(|e: Error| meta.error(e))?),
                        None => None,
                    };
                } else {
                    skip_value(&meta)?;
                }
                Ok(())
            })?;
        } else if attr.path().is_ident("papaya") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("collection") {
                    result.collection = Some(string_value(&meta)?);
                    Ok(())
                } else if meta.path.is_ident("aggregate_options") {
                    let path: LitStr = meta.value()?.parse()?;
                    result.aggregate_options = Some(path.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("unknown papaya attribute, expected `collection` or `aggregate_options`"))
                }
            })?;
        }
    }

    Ok(result)
}

/// Collects the attributes of a field.
pub fn field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("serde") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    result.rename = serialized_value(&meta)?;
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                    result.skip = true;
                } else if meta.path.is_ident("flatten") {
                    result.flatten = true;
                } else {
                    skip_value(&meta)?;
                }
                Ok(())
            })?;
        } else if attr.path().is_ident("papaya") {
            attr.parse_nested_meta(|meta| {
                if !meta.path.is_ident("embedded") {
                    return Err(meta.error("unknown papaya attribute, expected `embedded`"));
                }

                result.embedded = if meta.input.peek(Token![=]) {
                    let ty: LitStr = meta.value()?.parse()?;
                    Some(Embedded::Explicit(ty.parse()?))
                } else {
                    Some(Embedded::Inferred)
                };
                Ok(())
            })?;
        }
    }

    Ok(result)
}

/// The value of `key = "..."` or the `serialize` half of
/// `key(serialize = "...", deserialize = "...")`.
fn serialized_value(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(Token![=]) {
        return string_value(meta).map(Some);
    }

    let mut value = None;

    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("serialize") {
            value = Some(string_value(&inner)?);
        } else {
            skip_value(&inner)?;
        }
        Ok(())
    })?;

    Ok(value)
}

fn string_value(meta: &ParseNestedMeta) -> syn::Result<String> {
    match meta.value()?.parse::<Lit>()? {
        Lit::Str(lit) => Ok(lit.value()),
        other => Err(syn::Error::new(other.span(), "expected a string literal")),
    }
}

/// Consumes the value of an attribute this crate doesn't care about.
fn skip_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.input.parse::<proc_macro2::Group>()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use syn::{ parse_quote, DeriveInput };
    use super::*;

    #[test]
    fn serde_renaming_is_collected() {
        let input: DeriveInput = parse_quote! {
            #[derive(Serialize)]
            #[serde(rename = "people", rename_all(serialize = "camelCase"), deny_unknown_fields)]
            #[papaya(collection = "persons", aggregate_options = "defaults::people")]
            struct Person {
                #[serde(rename(serialize = "_id", deserialize = "id"), default)]
                id: u32,
                #[serde(skip_serializing_if = "Option::is_none")]
                nick_name: Option<String>,
            }
        };

        let attrs = container_attrs(&input.attrs).unwrap();
        assert_eq!(attrs.rename.as_deref(), Some("people"));
        assert_eq!(attrs.rename_all, Some(RenameRule::CamelCase));
        assert_eq!(attrs.collection.as_deref(), Some("persons"));
        assert!(attrs.aggregate_options.is_some());
    }

    #[test]
    fn field_attributes() {
        let field: syn::Field = parse_quote! {
            #[serde(rename(serialize = "_id"), default)]
            #[papaya(embedded = "Address")]
            pub id: Vec<Address>
        };
        let attrs = field_attrs(&field.attrs).unwrap();

        assert_eq!(attrs.rename.as_deref(), Some("_id"));
        assert!(!attrs.skip);
        assert!(matches!(attrs.embedded, Some(Embedded::Explicit(_))));
    }

    #[test]
    fn unknown_papaya_attribute() {
        let field: syn::Field = parse_quote! {
            #[papaya(index)]
            id: u32
        };
        assert!(field_attrs(&field.attrs).is_err());

        let input: DeriveInput = parse_quote! {
            #[papaya(collection = 42)]
            struct Person;
        };
        assert!(container_attrs(&input.attrs).is_err());
    }
}
