//! Boolean expression operators.

use super::{ Expr, Operand, binary_operators };

/// Factory for boolean operators applied to a subject operand.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Boolean, Comparison };
/// #
/// let in_range = Boolean::value_of(Comparison::value_of("qty").gt(100))
///     .and(Comparison::value_of("qty").lt(250));
///
/// assert_eq!(in_range.to_document(&NoOpContext).unwrap(), doc! {
///     "$and": [
///         { "$gt": ["$qty", 100] },
///         { "$lt": ["$qty", 250] },
///     ],
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Boolean(Operand);

impl Boolean {
    /// Starts an expression on `operand`.
    pub fn value_of<O: Into<Operand>>(operand: O) -> Self {
        Boolean(operand.into())
    }

    binary_operators! {
        /// `$and`. Further conditions can be `append`ed.
        and => "$and",
        /// `$or`. Further conditions can be `append`ed.
        or => "$or",
    }

    /// `$not`
    pub fn not(self) -> Expr {
        Expr::list("$not", vec![self.0])
    }

    /// `$and` of all `conditions`.
    pub fn all<I>(conditions: I) -> Expr
        where I: IntoIterator,
              I::Item: Into<Operand>
    {
        Expr::list("$and", conditions)
    }

    /// `$or` of all `conditions`.
    pub fn any<I>(conditions: I) -> Expr
        where I: IntoIterator,
              I::Item: Into<Operand>
    {
        Expr::list("$or", conditions)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::context::NoOpContext;
    use crate::expr::AggregationExpression;
    use super::*;

    #[test]
    fn not_wraps_in_array() {
        let expr = Boolean::value_of("archived").not();
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! { "$not": ["$archived"] });
    }

    #[test]
    fn any_of_fields() {
        let expr = Boolean::any(vec!["a", "b", "c"]);
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! { "$or": ["$a", "$b", "$c"] });
    }
}
