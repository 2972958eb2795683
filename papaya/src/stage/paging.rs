//! `$skip`, `$limit`, `$sample` and `$count`.

use bson::Document;
use crate::context::AggregationOperationContext;
use crate::fields::{ ExposedFields, Fields };
use crate::error::{ Error, ErrorKind, Result };
use super::{ AggregationOperation, Exposure, count_value, stage_document, validate_output_name };

/// Skips the given number of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipOperation(u64);

impl SkipOperation {
    /// `$skip` of `count` documents.
    pub fn new(count: u64) -> Self {
        SkipOperation(count)
    }
}

impl AggregationOperation for SkipOperation {
    fn operator(&self) -> &'static str {
        "$skip"
    }

    fn to_document(&self, _: &dyn AggregationOperationContext) -> Result<Document> {
        Ok(stage_document(self.operator(), count_value(self.operator(), self.0)?))
    }
}

/// Passes on at most the given number of documents, which must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitOperation(u64);

impl LimitOperation {
    /// `$limit` to `count` documents.
    pub fn new(count: u64) -> Self {
        LimitOperation(count)
    }
}

impl AggregationOperation for LimitOperation {
    fn operator(&self) -> &'static str {
        "$limit"
    }

    fn to_document(&self, _: &dyn AggregationOperationContext) -> Result<Document> {
        if self.0 == 0 {
            return Err(Error::new(ErrorKind::InvalidStage, "$limit must be positive"));
        }

        Ok(stage_document(self.operator(), count_value(self.operator(), self.0)?))
    }
}

/// Picks the given number of random documents.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::stage::{ AggregationOperation, SampleOperation };
/// #
/// assert_eq!(SampleOperation::new(3).to_document(&NoOpContext).unwrap(), doc! {
///     "$sample": { "size": 3_i64 },
/// });
/// assert!(SampleOperation::new(0).to_document(&NoOpContext).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOperation(u64);

impl SampleOperation {
    /// `$sample` of `size` documents.
    pub fn new(size: u64) -> Self {
        SampleOperation(size)
    }
}

impl AggregationOperation for SampleOperation {
    fn operator(&self) -> &'static str {
        "$sample"
    }

    fn to_document(&self, _: &dyn AggregationOperationContext) -> Result<Document> {
        if self.0 == 0 {
            return Err(Error::new(ErrorKind::InvalidStage, "$sample size must be positive"));
        }

        let body = stage_document("size", count_value(self.operator(), self.0)?);
        Ok(stage_document(self.operator(), body))
    }
}

/// Replaces the documents with a single one holding their count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountOperation(String);

impl CountOperation {
    /// `$count` into the field `name`.
    pub fn new<S: Into<String>>(name: S) -> Self {
        CountOperation(name.into())
    }
}

impl AggregationOperation for CountOperation {
    fn operator(&self) -> &'static str {
        "$count"
    }

    fn to_document(&self, _: &dyn AggregationOperationContext) -> Result<Document> {
        validate_output_name(self.operator(), &self.0)?;

        if self.0.contains('.') {
            return Err(Error::new(
                ErrorKind::InvalidStage,
                format!("$count: field name '{}' can't contain '.'", self.0)
            ));
        }

        Ok(stage_document(self.operator(), self.0.as_str()))
    }

    fn exposure(&self) -> Exposure {
        Exposure::Replaced(ExposedFields::synthetic(Fields::from_names(vec![self.0.as_str()])))
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::context::NoOpContext;
    use super::*;

    #[test]
    fn skip_and_limit() {
        assert_eq!(SkipOperation::new(20).to_document(&NoOpContext).unwrap(), doc! { "$skip": 20_i64 });
        assert_eq!(LimitOperation::new(10).to_document(&NoOpContext).unwrap(), doc! { "$limit": 10_i64 });

        let err = LimitOperation::new(0).to_document(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);
    }

    #[test]
    fn count_field_name() {
        assert_eq!(CountOperation::new("n").to_document(&NoOpContext).unwrap(), doc! { "$count": "n" });
        assert!(CountOperation::new("a.b").to_document(&NoOpContext).is_err());
        assert!(CountOperation::new("").to_document(&NoOpContext).is_err());
    }
}
