//! Array expression operators, including `$filter` and `$reduce`, whose
//! bodies see the variables the operator binds.

use bson::{ Bson, Document };
use crate::context::{ AggregationOperationContext, VariableScopeContext };
use crate::error::Result;
use super::{ AggregationExpression, Expr, Operand, unary_operators, binary_operators };

/// Factory for array operators applied to a subject operand.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Arrays, Operand };
/// #
/// let first_two = Arrays::value_of("tags").slice(2);
/// assert_eq!(first_two.to_document(&NoOpContext).unwrap(), doc! {
///     "$slice": ["$tags", 2_i64],
/// });
///
/// let has_sale = Arrays::value_of("tags").contains(Operand::value("sale"));
/// assert_eq!(has_sale.to_document(&NoOpContext).unwrap(), doc! {
///     "$in": ["sale", "$tags"],
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Arrays(Operand);

impl Arrays {
    /// Starts an expression on `operand`.
    pub fn value_of<O: Into<Operand>>(operand: O) -> Self {
        Arrays(operand.into())
    }

    unary_operators! {
        /// `$isArray`
        is_array => "$isArray",
        /// `$reverseArray`
        reverse => "$reverseArray",
        /// `$size`
        size => "$size",
        /// `$first`
        first => "$first",
        /// `$last`
        last => "$last",
        /// `$arrayToObject`
        array_to_object => "$arrayToObject",
    }

    binary_operators! {
        /// `$arrayElemAt` at an index given by another operand.
        element_at_value_of => "$arrayElemAt",
        /// `$concatArrays`. Further arrays can be `append`ed.
        concat => "$concatArrays",
        /// `$indexOfArray`
        index_of => "$indexOfArray",
        /// `$slice` by a count given by another operand.
        slice_value_of => "$slice",
    }

    /// `$arrayElemAt` at a literal index; negative indexes count from the end.
    pub fn element_at(self, index: i64) -> Expr {
        self.element_at_value_of(index)
    }

    /// `$in`: whether the array contains `value`.
    pub fn contains<O: Into<Operand>>(self, value: O) -> Expr {
        Expr::list("$in", vec![value.into(), self.0])
    }

    /// `$slice` of the first (or, if negative, last) `count` elements.
    pub fn slice(self, count: i64) -> Expr {
        self.slice_value_of(count)
    }

    /// `$slice` of `count` elements starting at `position`.
    pub fn slice_from(self, position: i64, count: i64) -> Expr {
        Expr::list("$slice", vec![self.0, position.into(), count.into()])
    }

    /// `$zip` with other arrays.
    pub fn zip<I>(self, others: I) -> Expr
        where I: IntoIterator,
              I::Item: Into<Operand>
    {
        let mut inputs = vec![self.0];
        inputs.extend(others.into_iter().map(Into::into));

        Expr::named("$zip").with_arg("inputs", Operand::Array(inputs))
    }

    /// `$range` from `start` (inclusive) to `end` (exclusive). A step can
    /// be `append`ed.
    pub fn range<S, E>(start: S, end: E) -> Expr
        where S: Into<Operand>,
              E: Into<Operand>
    {
        Expr::list("$range", vec![start.into(), end.into()])
    }

    /// `$filter` the elements, binding each to `variable` within `cond`.
    pub fn filter<O: Into<Operand>>(self, variable: &str, cond: O) -> Filter {
        Filter {
            input: self.0,
            variable: variable.trim_start_matches('$').to_owned(),
            cond: cond.into(),
            limit: None,
        }
    }

    /// `$reduce` the elements into a single value, starting with `initial`.
    /// Within `body`, `this` and `value` refer to the current element and
    /// the accumulated value.
    pub fn reduce<I, B>(self, initial: I, body: B) -> Reduce
        where I: Into<Operand>,
              B: Into<Operand>
    {
        Reduce {
            input: self.0,
            initial: initial.into(),
            body: body.into(),
        }
    }
}

/// `$filter`.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Arrays, Comparison };
/// #
/// let expensive = Arrays::value_of("items")
///     .filter("item", Comparison::value_of("item.price").gte(100));
///
/// assert_eq!(expensive.to_document(&NoOpContext).unwrap(), doc! {
///     "$filter": {
///         "input": "$items",
///         "as": "item",
///         "cond": { "$gte": ["$$item.price", 100] },
///     }
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Filter {
    input: Operand,
    variable: String,
    cond: Operand,
    limit: Option<Operand>,
}

impl Filter {
    /// Keeps at most `limit` matching elements.
    pub fn limit<O: Into<Operand>>(mut self, limit: O) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

impl AggregationExpression for Filter {
    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let scope = VariableScopeContext::new(vec![self.variable.as_str()], ctx);
        let mut body = Document::new();

        body.insert("input", self.input.render(ctx)?);
        body.insert("as", self.variable.as_str());
        body.insert("cond", self.cond.render(&scope)?);

        if let Some(ref limit) = self.limit {
            body.insert("limit", limit.render(ctx)?);
        }

        let mut doc = Document::new();
        doc.insert("$filter", body);
        Ok(doc)
    }
}

impl From<Filter> for Operand {
    fn from(filter: Filter) -> Self {
        Operand::custom(filter)
    }
}

/// `$reduce`.
#[derive(Debug, Clone)]
pub struct Reduce {
    input: Operand,
    initial: Operand,
    body: Operand,
}

impl AggregationExpression for Reduce {
    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let scope = VariableScopeContext::new(vec!["this", "value"], ctx);
        let mut body = Document::new();

        body.insert("input", self.input.render(ctx)?);
        body.insert("initialValue", self.initial.render(ctx)?);
        body.insert("in", self.body.render(&scope)?);

        let mut doc = Document::new();
        doc.insert("$reduce", Bson::Document(body));
        Ok(doc)
    }
}

impl From<Reduce> for Operand {
    fn from(reduce: Reduce) -> Self {
        Operand::custom(reduce)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::context::NoOpContext;
    use crate::expr::Arithmetic;
    use super::*;

    #[test]
    fn reduce_binds_this_and_value() {
        let total = Arrays::value_of("items").reduce(
            0,
            Arithmetic::value_of("value").add("this.qty"),
        );

        assert_eq!(total.to_document(&NoOpContext).unwrap(), doc! {
            "$reduce": {
                "input": "$items",
                "initialValue": 0,
                "in": { "$add": ["$$value", "$$this.qty"] },
            }
        });
    }

    #[test]
    fn pairs_become_an_object() {
        let object = Arrays::value_of("attributes").array_to_object();
        assert_eq!(object.to_document(&NoOpContext).unwrap(), doc! {
            "$arrayToObject": "$attributes",
        });
    }

    #[test]
    fn zip_and_range() {
        let zipped = Arrays::value_of("a").zip(vec!["b", "c"]);
        let range = Arrays::range(0, "n").append(2);

        assert_eq!(zipped.to_document(&NoOpContext).unwrap(), doc! {
            "$zip": { "inputs": ["$a", "$b", "$c"] },
        });
        assert_eq!(range.to_document(&NoOpContext).unwrap(), doc! {
            "$range": [0, "$n", 2],
        });
    }

    #[test]
    fn element_at_negative_index() {
        let last = Arrays::value_of("xs").element_at(-1);
        assert_eq!(last.to_document(&NoOpContext).unwrap(), doc! {
            "$arrayElemAt": ["$xs", -1_i64],
        });
    }
}
