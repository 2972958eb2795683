//! Accumulator operators, for `$group` outputs and for array operands.

use super::{ Expr, Operand, unary_operators };

/// Factory for accumulators over a subject operand.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Accumulators };
/// #
/// assert_eq!(Accumulators::value_of("amount").sum().to_document(&NoOpContext).unwrap(),
///            doc! { "$sum": "$amount" });
/// assert_eq!(Accumulators::count().to_document(&NoOpContext).unwrap(),
///            doc! { "$sum": 1 });
/// ```
#[derive(Debug, Clone)]
pub struct Accumulators(Operand);

impl Accumulators {
    /// Starts an accumulator on `operand`.
    pub fn value_of<O: Into<Operand>>(operand: O) -> Self {
        Accumulators(operand.into())
    }

    /// Counts documents, `{ "$sum": 1 }`.
    pub fn count() -> Expr {
        Expr::new("$sum", 1)
    }

    unary_operators! {
        /// `$sum`
        sum => "$sum",
        /// `$avg`
        avg => "$avg",
        /// `$first`
        first => "$first",
        /// `$last`
        last => "$last",
        /// `$max`
        max => "$max",
        /// `$min`
        min => "$min",
        /// `$push`
        push => "$push",
        /// `$addToSet`
        add_to_set => "$addToSet",
        /// `$stdDevPop`
        std_dev_pop => "$stdDevPop",
        /// `$stdDevSamp`
        std_dev_samp => "$stdDevSamp",
    }
}
