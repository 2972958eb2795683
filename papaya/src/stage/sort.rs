//! `$sort`

use bson::Document;
use crate::context::AggregationOperationContext;
use crate::fields::Field;
use crate::literal::Order;
use crate::error::{ Error, ErrorKind, Result };
use super::{ AggregationOperation, stage_document };

/// Sorts documents by one or more fields.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::literal::Order;
/// # use papaya::stage::{ AggregationOperation, SortOperation };
/// #
/// let sorting = SortOperation::new(Order::Descending, vec!["score"])
///     .and(Order::Ascending, vec!["name", "_id"]);
///
/// assert_eq!(sorting.to_document(&NoOpContext).unwrap(), doc! {
///     "$sort": { "score": -1, "name": 1, "_id": 1 },
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct SortOperation {
    keys: Vec<(Field, Order)>,
}

impl SortOperation {
    /// Sorts by `fields` in the given direction.
    pub fn new<I>(order: Order, fields: I) -> Self
        where I: IntoIterator,
              I::Item: Into<Field>
    {
        SortOperation::default().and(order, fields)
    }

    /// Sorts by further `fields`, after the existing keys.
    pub fn and<I>(mut self, order: Order, fields: I) -> Self
        where I: IntoIterator,
              I::Item: Into<Field>
    {
        self.keys.extend(fields.into_iter().map(|f| (f.into(), order)));
        self
    }
}

impl AggregationOperation for SortOperation {
    fn operator(&self) -> &'static str {
        "$sort"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        if self.keys.is_empty() {
            return Err(Error::new(ErrorKind::InvalidStage, "$sort needs at least one key"));
        }

        let mut body = Document::new();

        for &(ref field, order) in &self.keys {
            let reference = ctx.get_reference(field)?;

            if reference.is_variable() {
                return Err(Error::new(
                    ErrorKind::InvalidStage,
                    format!("$sort: can't sort by variable '{}'", field)
                ));
            }

            body.insert(reference.raw(), order);
        }

        Ok(stage_document(self.operator(), body))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use bson::doc;
    use crate::context::{ ExposedFieldsContext, NoOpContext };
    use crate::fields::{ ExposedFields, Fields };
    use super::*;

    #[test]
    fn sort_after_group_reads_id() {
        let exposed = ExposedFields::non_synthetic(Fields::from_names(vec!["state", "city"]))
            .and_all(ExposedFields::synthetic(Fields::from_names(vec!["total"])));
        let ctx = ExposedFieldsContext::new(exposed, Rc::new(NoOpContext));
        let sorting = SortOperation::new(Order::Ascending, vec!["city"])
            .and(Order::Descending, vec!["total"]);

        assert_eq!(sorting.to_document(&ctx).unwrap(), doc! {
            "$sort": { "_id.city": 1, "total": -1 },
        });

        let unknown = SortOperation::new(Order::Ascending, vec!["zip"]);
        assert_eq!(unknown.to_document(&ctx).unwrap_err().kind(), ErrorKind::InvalidReference);
    }

    #[test]
    fn empty_sort_fails() {
        let err = SortOperation::default().to_document(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);
    }
}
