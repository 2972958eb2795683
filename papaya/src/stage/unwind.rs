//! `$unwind`

use bson::{ Bson, Document };
use crate::context::AggregationOperationContext;
use crate::fields::{ ExposedFields, Field, Fields };
use crate::error::Result;
use super::{ AggregationOperation, Exposure, field_path, stage_document, validate_output_name };

/// Outputs one document per element of an array field.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::stage::{ AggregationOperation, UnwindOperation };
/// #
/// let short = UnwindOperation::new("sizes");
/// assert_eq!(short.to_document(&NoOpContext).unwrap(), doc! { "$unwind": "$sizes" });
///
/// let full = UnwindOperation::new("sizes").include_array_index("idx").preserve_null_and_empty_arrays(true);
/// assert_eq!(full.to_document(&NoOpContext).unwrap(), doc! {
///     "$unwind": {
///         "path": "$sizes",
///         "includeArrayIndex": "idx",
///         "preserveNullAndEmptyArrays": true,
///     }
/// });
/// ```
#[derive(Debug, Clone)]
pub struct UnwindOperation {
    path: Field,
    index: Option<String>,
    preserve: Option<bool>,
}

impl UnwindOperation {
    /// Unwinds the array at `path`.
    pub fn new<F: Into<Field>>(path: F) -> Self {
        UnwindOperation {
            path: path.into(),
            index: None,
            preserve: None,
        }
    }

    /// Stores the array index of each element in the field `name`.
    pub fn include_array_index<S: Into<String>>(mut self, name: S) -> Self {
        self.index = Some(name.into());
        self
    }

    /// Whether documents with a missing, `null` or empty array are kept.
    pub fn preserve_null_and_empty_arrays(mut self, preserve: bool) -> Self {
        self.preserve = Some(preserve);
        self
    }
}

impl AggregationOperation for UnwindOperation {
    fn operator(&self) -> &'static str {
        "$unwind"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let path = field_path(ctx, &self.path)?;

        if self.index.is_none() && self.preserve.is_none() {
            return Ok(stage_document(self.operator(), path));
        }

        let mut body = Document::new();
        body.insert("path", path);

        if let Some(ref index) = self.index {
            validate_output_name(self.operator(), index)?;
            body.insert("includeArrayIndex", index.as_str());
        }
        if let Some(preserve) = self.preserve {
            body.insert("preserveNullAndEmptyArrays", Bson::Boolean(preserve));
        }

        Ok(stage_document(self.operator(), body))
    }

    /// The unwound field keeps its name, so only the index field is new.
    fn exposure(&self) -> Exposure {
        match self.index {
            Some(ref index) => Exposure::Inherited(
                ExposedFields::synthetic(Fields::from_names(vec![index.as_str()]))
            ),
            None => Exposure::Unchanged,
        }
    }
}
