//! Pipeline stages.
//!
//! A stage renders itself into one (rarely more) pipeline documents and
//! reports, through its [`Exposure`](enum.Exposure.html), what the documents
//! it outputs look like, so that the following stage is rendered in the
//! right operation context.
//!
//! The free functions of this module are shorthands for the usual stages:
//!
//! ```
//! # use bson::doc;
//! # use papaya::context::NoOpContext;
//! # use papaya::criteria::Criteria;
//! # use papaya::literal::Order;
//! # use papaya::stage::{ self, AggregationOperation };
//! #
//! let matching = stage::match_(Criteria::where_("status").is("A"));
//! assert_eq!(matching.to_document(&NoOpContext).unwrap(), doc! {
//!     "$match": { "status": "A" },
//! });
//!
//! let sorting = stage::sort(Order::Descending, vec!["date"]);
//! assert_eq!(sorting.to_document(&NoOpContext).unwrap(), doc! {
//!     "$sort": { "date": -1 },
//! });
//! ```

use std::fmt;
use bson::{ Bson, Document };
use crate::context::AggregationOperationContext;
use crate::criteria::Criteria;
use crate::expr::Operand;
use crate::fields::{ ExposedFields, Field, Fields };
use crate::literal::Order;
use crate::error::{ Error, ErrorKind, Result };

mod matching;
mod project;
mod group;
mod sort;
mod paging;
mod unwind;
mod lookup;
mod reshape;
mod facet;
mod bucket;
mod output;

pub use self::matching::MatchOperation;
pub use self::project::ProjectionOperation;
pub use self::group::GroupOperation;
pub use self::sort::SortOperation;
pub use self::paging::{ SkipOperation, LimitOperation, SampleOperation, CountOperation };
pub use self::unwind::UnwindOperation;
pub use self::lookup::{ LookupOperation, GraphLookupOperation, UnionWithOperation };
pub use self::reshape::{ AddFieldsOperation, UnsetOperation, ReplaceRootOperation, RedactOperation };
pub use self::facet::FacetOperation;
pub use self::bucket::{ BucketOperation, BucketAutoOperation, Granularity, SortByCountOperation };
pub use self::output::{ OutOperation, MergeOperation, WhenMatched, WhenNotMatched };

/// What the documents leaving a stage look like.
#[derive(Debug, Clone)]
pub enum Exposure {
    /// Same shape as the input.
    Unchanged,
    /// Only the given fields.
    Replaced(ExposedFields),
    /// The input fields, plus the given ones.
    Inherited(ExposedFields),
    /// An unknown shape.
    Reset,
}

/// A single stage of an aggregation pipeline.
pub trait AggregationOperation: fmt::Debug + Send + Sync {
    /// The stage operator, e.g. `$match`.
    fn operator(&self) -> &'static str;

    /// Renders the stage, resolving field references through `ctx`.
    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document>;

    /// Renders the stage as the pipeline documents it stands for.
    fn to_pipeline_stages(&self, ctx: &dyn AggregationOperationContext) -> Result<Vec<Document>> {
        self.to_document(ctx).map(|doc| vec![doc])
    }

    /// The shape of the output documents.
    fn exposure(&self) -> Exposure {
        Exposure::Unchanged
    }
}

/// `{ operator: body }`
pub(crate) fn stage_document<B: Into<Bson>>(operator: &str, body: B) -> Document {
    let mut doc = Document::new();
    doc.insert(operator, body);
    doc
}

/// The `"$path"` a field resolves to.
pub(crate) fn field_path(ctx: &dyn AggregationOperationContext, field: &Field) -> Result<Bson> {
    ctx.get_reference(field).map(|r| r.to_bson())
}

/// Checks the name of a field a stage outputs.
pub(crate) fn validate_output_name(operator: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('$') {
        Err(Error::new(
            ErrorKind::InvalidStage,
            format!("{}: invalid output field name '{}'", operator, name)
        ))
    } else {
        Ok(())
    }
}

/// Renders named operands into a document.
pub(crate) fn render_entries(
    ctx: &dyn AggregationOperationContext,
    entries: &[(String, Operand)],
) -> Result<Document> {
    let mut doc = Document::new();

    for (name, value) in entries {
        doc.insert(name.as_str(), value.render(ctx)?);
    }

    Ok(doc)
}

/// A count for `$skip`, `$limit` and friends.
pub(crate) fn count_value(operator: &str, count: u64) -> Result<Bson> {
    i64::try_from(count).map(Bson::Int64).map_err(|_| Error::new(
        ErrorKind::InvalidStage,
        format!("{}: {} is out of range", operator, count)
    ))
}

/// `$match` of criteria.
pub fn match_(criteria: Criteria) -> MatchOperation {
    MatchOperation::new(criteria)
}

/// `$project` including the given fields.
pub fn project<I>(fields: I) -> ProjectionOperation
    where I: IntoIterator,
          I::Item: Into<Field>
{
    ProjectionOperation::new().and_include(fields)
}

/// `$group` by the given fields.
pub fn group<I>(fields: I) -> GroupOperation
    where I: IntoIterator,
          I::Item: Into<Field>
{
    GroupOperation::new(fields.into_iter().map(Into::into).collect::<Fields>())
}

/// `$sort` by the given fields, all in the same direction.
pub fn sort<I>(order: Order, fields: I) -> SortOperation
    where I: IntoIterator,
          I::Item: Into<Field>
{
    SortOperation::new(order, fields)
}

/// `$skip`
pub fn skip(count: u64) -> SkipOperation {
    SkipOperation::new(count)
}

/// `$limit`
pub fn limit(count: u64) -> LimitOperation {
    LimitOperation::new(count)
}

/// `$sample`
pub fn sample(size: u64) -> SampleOperation {
    SampleOperation::new(size)
}

/// `$count` into the field `name`.
pub fn count<S: Into<String>>(name: S) -> CountOperation {
    CountOperation::new(name)
}

/// `$unwind` of the array at `field`.
pub fn unwind<F: Into<Field>>(field: F) -> UnwindOperation {
    UnwindOperation::new(field)
}

/// Equality `$lookup` from another collection.
pub fn lookup<F: Into<Field>>(from: &str, local_field: F, foreign_field: &str, as_: &str) -> LookupOperation {
    LookupOperation::from_collection(from)
        .local_field(local_field)
        .foreign_field(foreign_field)
        .as_(as_)
}

/// `$addFields`
pub fn add_fields() -> AddFieldsOperation {
    AddFieldsOperation::new()
}

/// `$unset` of the given fields.
pub fn unset<I>(fields: I) -> UnsetOperation
    where I: IntoIterator,
          I::Item: Into<String>
{
    UnsetOperation::new(fields)
}

/// `$replaceRoot` with the document `new_root` evaluates to.
pub fn replace_root<O: Into<Operand>>(new_root: O) -> ReplaceRootOperation {
    ReplaceRootOperation::new(new_root)
}

/// `$sortByCount` of the values `operand` evaluates to.
pub fn sort_by_count<O: Into<Operand>>(operand: O) -> SortByCountOperation {
    SortByCountOperation::new(operand)
}

/// `$out` into `collection`.
pub fn out(collection: &str) -> OutOperation {
    OutOperation::new(collection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names() {
        assert!(validate_output_name("$count", "total").is_ok());
        assert!(validate_output_name("$count", "").is_err());
        assert_eq!(
            validate_output_name("$count", "$total").unwrap_err().kind(),
            ErrorKind::InvalidStage
        );
    }

    #[test]
    fn counts_out_of_range() {
        assert_eq!(count_value("$skip", 3).unwrap(), Bson::Int64(3));
        assert!(count_value("$skip", u64::MAX).is_err());
    }
}
