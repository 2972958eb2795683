//! BSON helpers: dynamic type checks, ordering of literal values and
//! serialization of arbitrary values into documents.

use std::cmp::Ordering;
use bson::{ Bson, Document };
use bson::document::ValueAccessError;
use serde::Serialize;
use crate::error::{ Error, Result };

/// Checked conversions out of loosely-typed BSON.
pub trait BsonExt: Sized {
    /// The embedded document, or an `IllTypedDocumentField` error.
    fn try_into_doc(self) -> Result<Document>;
}

impl BsonExt for Bson {
    fn try_into_doc(self) -> Result<Document> {
        match self {
            Bson::Document(doc) => Ok(doc),
            value => Err(Error::with_cause(
                format!("expected Document, got {:?}", value.element_type()),
                ValueAccessError::UnexpectedType,
            ))
        }
    }
}

/// Compares two literal BSON values the way the server orders `$bucket`
/// boundaries: numbers with numbers (across `int`, `long` and `double`),
/// strings with strings and dates with dates. Values of other or mixed
/// types are incomparable.
///
/// ```
/// # use std::cmp::Ordering;
/// # use bson::Bson;
/// # use papaya::bsn::compare_values;
/// #
/// assert_eq!(compare_values(&Bson::Int32(3), &Bson::Double(3.5)), Some(Ordering::Less));
/// assert_eq!(compare_values(&Bson::from("b"), &Bson::from("a")), Some(Ordering::Greater));
/// assert_eq!(compare_values(&Bson::from("1"), &Bson::Int32(1)), None);
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn compare_values(lhs: &Bson, rhs: &Bson) -> Option<Ordering> {
    match (lhs, rhs) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => Some(a.cmp(b)),
        (Bson::Int32(a), Bson::Int32(b)) => Some(a.cmp(b)),
        (Bson::Int64(a), Bson::Int64(b)) => Some(a.cmp(b)),
        (Bson::Int32(a), Bson::Int64(b)) => Some(i64::from(*a).cmp(b)),
        (Bson::Int64(a), Bson::Int32(b)) => Some(a.cmp(&i64::from(*b))),
        _ => match (as_f64(lhs), as_f64(rhs)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }
}

/// Widens any numeric BSON value to a double.
#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &Bson) -> Option<f64> {
    match *value {
        Bson::Int32(n) => Some(f64::from(n)),
        Bson::Int64(n) => Some(n as f64),
        Bson::Double(x) => Some(x),
        _ => None,
    }
}

/// Serializes a value that must come out as a document, e.g. an entity.
pub fn serialize_document<T: Serialize>(value: &T) -> Result<Document> {
    bson::to_bson(value)
        .map_err(From::from)
        .and_then(BsonExt::try_into_doc)
}

/// Renders a list of documents as relaxed extended JSON.
pub fn to_relaxed_json(docs: &[Document]) -> serde_json::Value {
    serde_json::Value::Array(
        docs.iter()
            .map(|doc| Bson::Document(doc.clone()).into_relaxed_extjson())
            .collect()
    )
}

#[cfg(test)]
mod tests {
    use bson::{ bson, doc };
    use super::*;

    #[test]
    fn bson_ext_try_into_doc() -> Result<()> {
        let doc = bson!({ "foo": "bar", "qux": 3.14 });
        let other = bson!([{ "key": "value" }, false, null]);

        assert_eq!(doc.try_into_doc()?, doc!{ "foo": "bar", "qux": 3.14 });
        assert!(other.try_into_doc().is_err());

        Ok(())
    }

    #[test]
    fn numeric_comparison_crosses_types() {
        assert_eq!(compare_values(&Bson::Int64(10), &Bson::Int32(2)), Some(Ordering::Greater));
        assert_eq!(compare_values(&Bson::Double(2.0), &Bson::Int64(2)), Some(Ordering::Equal));
        assert_eq!(compare_values(&Bson::Null, &Bson::Null), None);
    }

    #[test]
    fn serialize_non_document_fails() {
        #[derive(Serialize)]
        struct Point { x: i32, y: i32 }

        assert_eq!(serialize_document(&Point { x: 1, y: -2 }).unwrap(), doc!{ "x": 1, "y": -2 });
        assert!(serialize_document(&42_i32)
                .unwrap_err()
                .to_string()
                .contains("expected Document"));
    }

    #[test]
    fn relaxed_json_rendering() {
        let json = to_relaxed_json(&[doc!{ "$limit": 5_i64 }]);
        assert_eq!(json.to_string(), r#"[{"$limit":5}]"#);
    }
}
