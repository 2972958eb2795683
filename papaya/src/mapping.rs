//! Mapping metadata: which Rust property is stored under which document field.
//!
//! Usually derived with `#[derive(Mapped)]` and `#[derive(Entity)]` from the
//! `papaya_derive` crate, which honour Serde's renaming attributes. The
//! metadata can also be written by hand:
//!
//! ```
//! # use papaya::mapping::{ Mapped, Property };
//! #
//! struct Address;
//!
//! impl Mapped for Address {
//!     fn properties() -> &'static [Property] {
//!         static PROPERTIES: &[Property] = &[
//!             Property::new("zip_code", "zip"),
//!         ];
//!         PROPERTIES
//!     }
//! }
//!
//! struct Customer;
//!
//! impl Mapped for Customer {
//!     fn properties() -> &'static [Property] {
//!         static PROPERTIES: &[Property] = &[
//!             Property::new("id", "_id"),
//!             Property::new("full_name", "name"),
//!             Property::embedded("addresses", "addr", Address::properties),
//!         ];
//!         PROPERTIES
//!     }
//! }
//!
//! assert_eq!(Customer::resolve_path("full_name", true).unwrap(), "name");
//! assert_eq!(Customer::resolve_path("addresses.0.zip_code", true).unwrap(), "addr.0.zip");
//! assert_eq!(Customer::resolve_path("nickname", false).unwrap(), "nickname");
//! assert!(Customer::resolve_path("nickname", true).is_err());
//! ```

use crate::fields::ID;
use crate::options::AggregationOptions;
use crate::error::{ Error, ErrorKind, Result };

/// A persistent property of a mapped type.
#[derive(Debug, Clone, Copy)]
pub struct Property {
    /// The name of the property in Rust.
    pub name: &'static str,
    /// The name of the field the property is stored under.
    pub field: &'static str,
    /// The property table of the embedded document type, if any.
    pub nested: Option<fn() -> &'static [Property]>,
}

impl Property {
    /// A property holding a plain value.
    pub const fn new(name: &'static str, field: &'static str) -> Self {
        Property { name, field, nested: None }
    }

    /// A property holding an embedded document, or a collection of them.
    pub const fn embedded(
        name: &'static str,
        field: &'static str,
        nested: fn() -> &'static [Property],
    ) -> Self {
        Property { name, field, nested: Some(nested) }
    }
}

/// Types whose properties can be resolved to stored document paths.
pub trait Mapped {
    /// The persistent properties of this type, in declaration order.
    fn properties() -> &'static [Property];

    /// Resolves a dotted property path to the stored document path.
    ///
    /// Each segment matches a property by its Rust name first, then by its
    /// stored name. Numeric segments (array indexes) and `$`-prefixed
    /// segments are kept without descending. Segments below a property that
    /// has no nested table are kept verbatim. An unknown segment is an
    /// `UnknownProperty` error if `strict` is set; otherwise it and the rest
    /// of the path are kept verbatim.
    fn resolve_path(path: &str, strict: bool) -> Result<String> {
        resolve_in(Self::properties(), path, strict)
    }
}

/// Mapped types that are stored in their own collection.
pub trait Entity: Mapped {
    /// The name of the collection.
    const NAME: &'static str;

    /// Default options for aggregations over this collection.
    fn aggregate_options() -> AggregationOptions {
        AggregationOptions::default()
    }
}

/// Resolves `path` against a property table.
pub fn resolve_in(properties: &[Property], path: &str, strict: bool) -> Result<String> {
    let mut table = Some(properties);
    let mut resolved: Vec<&str> = Vec::new();
    let mut segments = path.split('.');

    while let Some(segment) = segments.next() {
        if segment.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidField,
                format!("empty segment in property path '{}'", path)
            ));
        }

        if segment.starts_with('$') || segment.bytes().all(|b| b.is_ascii_digit()) {
            resolved.push(segment);
            continue;
        }

        let props = match table {
            Some(props) => props,
            None => {
                resolved.push(segment);
                continue;
            }
        };

        let property = props
            .iter()
            .find(|p| p.name == segment)
            .or_else(|| props.iter().find(|p| p.field == segment));

        match property {
            Some(property) => {
                resolved.push(property.field);
                table = property.nested.map(|nested| nested());
            }
            None if segment == ID => {
                resolved.push(segment);
                table = None;
            }
            None if strict => {
                return Err(Error::new(
                    ErrorKind::UnknownProperty,
                    format!("no property '{}' in path '{}'", segment, path)
                ));
            }
            None => {
                resolved.push(segment);
                resolved.extend(&mut segments);
                break;
            }
        }
    }

    Ok(resolved.join("."))
}

/// The property table of the embedded document found at `path`. Array
/// indexes are skipped. `None` if the path ends at a plain value or at an
/// unknown property.
pub fn nested_in(properties: &[Property], path: &str) -> Option<&'static [Property]> {
    let mut table = properties;
    let mut nested = None;

    for segment in path.split('.') {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        let property = table
            .iter()
            .find(|p| p.name == segment)
            .or_else(|| table.iter().find(|p| p.field == segment))?;
        let inner = (property.nested?)();

        table = inner;
        nested = Some(inner);
    }

    nested
}

#[cfg(test)]
mod tests {
    use super::*;

    static LINE_ITEM: &[Property] = &[
        Property::new("product_id", "pid"),
        Property::new("qty", "quantity"),
    ];

    fn line_items() -> &'static [Property] {
        LINE_ITEM
    }

    static ORDER: &[Property] = &[
        Property::new("id", "_id"),
        Property::embedded("items", "lineItems", line_items),
        Property::new("meta", "metadata"),
    ];

    #[test]
    fn embedded_and_indexed_paths() {
        assert_eq!(resolve_in(ORDER, "items.qty", true).unwrap(), "lineItems.quantity");
        assert_eq!(resolve_in(ORDER, "items.2.product_id", true).unwrap(), "lineItems.2.pid");
        assert_eq!(resolve_in(ORDER, "lineItems.quantity", true).unwrap(), "lineItems.quantity");
    }

    #[test]
    fn leaf_properties_pass_remaining_segments_through() {
        assert_eq!(resolve_in(ORDER, "meta.source.ip", true).unwrap(), "metadata.source.ip");
        assert_eq!(resolve_in(ORDER, "_id", true).unwrap(), "_id");
        assert_eq!(resolve_in(ORDER, "id", true).unwrap(), "_id");
    }

    #[test]
    fn unknown_properties() {
        let err = resolve_in(ORDER, "items.price", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownProperty);
        assert_eq!(resolve_in(ORDER, "items.price.net", false).unwrap(), "lineItems.price.net");
        assert_eq!(resolve_in(ORDER, "items..qty", true).unwrap_err().kind(), ErrorKind::InvalidField);
    }

    #[test]
    fn nested_tables() {
        assert_eq!(nested_in(ORDER, "items").map(<[Property]>::len), Some(2));
        assert_eq!(nested_in(ORDER, "lineItems.4").map(<[Property]>::len), Some(2));
        assert!(nested_in(ORDER, "items.qty").is_none());
        assert!(nested_in(ORDER, "meta").is_none());
        assert!(nested_in(ORDER, "missing").is_none());
    }
}
