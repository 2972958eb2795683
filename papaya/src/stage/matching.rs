//! `$match`

use bson::Document;
use crate::context::AggregationOperationContext;
use crate::criteria::Criteria;
use crate::expr::Operand;
use crate::error::Result;
use super::{ AggregationOperation, stage_document };

/// What documents are filtered by.
#[derive(Debug, Clone)]
enum Filter {
    Criteria(Criteria),
    Document(Document),
    Expression(Operand),
}

/// Filters documents by a query or by an aggregation expression.
///
/// Keys of criteria and raw query documents are property paths, mapped to
/// stored paths by the root context of the aggregation.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::Comparison;
/// # use papaya::stage::{ AggregationOperation, MatchOperation };
/// #
/// let over_budget = MatchOperation::expr(Comparison::value_of("spent").gt("budget"));
/// assert_eq!(over_budget.to_document(&NoOpContext).unwrap(), doc! {
///     "$match": { "$expr": { "$gt": ["$spent", "$budget"] } },
/// });
/// ```
#[derive(Debug, Clone)]
pub struct MatchOperation(Filter);

impl MatchOperation {
    /// Filters by `criteria`.
    pub fn new(criteria: Criteria) -> Self {
        MatchOperation(Filter::Criteria(criteria))
    }

    /// Filters by a raw query document.
    pub fn document(query: Document) -> Self {
        MatchOperation(Filter::Document(query))
    }

    /// Filters by an aggregation expression, via `$expr`.
    pub fn expr<O: Into<Operand>>(expression: O) -> Self {
        MatchOperation(Filter::Expression(expression.into()))
    }
}

impl AggregationOperation for MatchOperation {
    fn operator(&self) -> &'static str {
        "$match"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let query = match self.0 {
            Filter::Criteria(ref criteria) => ctx.get_mapped_object(criteria.to_document()?)?,
            Filter::Document(ref query) => ctx.get_mapped_object(query.clone())?,
            Filter::Expression(ref expr) => stage_document("$expr", expr.render(ctx)?),
        };

        Ok(stage_document(self.operator(), query))
    }
}

impl From<Criteria> for MatchOperation {
    fn from(criteria: Criteria) -> Self {
        MatchOperation::new(criteria)
    }
}
