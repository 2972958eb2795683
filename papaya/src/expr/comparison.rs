//! Comparison expression operators.

use bson::Bson;
use super::{ Expr, Operand, binary_operators };

/// Factory for comparisons of a subject operand against another operand.
///
/// The plain methods take any operand, so `&str` is a field reference; the
/// `..._value` variants compare against a literal.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Comparison };
/// #
/// let same = Comparison::value_of("billing.zip").eq("shipping.zip");
/// let gold = Comparison::value_of("tier").eq_value("gold");
///
/// assert_eq!(same.to_document(&NoOpContext).unwrap(), doc! {
///     "$eq": ["$billing.zip", "$shipping.zip"],
/// });
/// assert_eq!(gold.to_document(&NoOpContext).unwrap(), doc! {
///     "$eq": ["$tier", "gold"],
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Comparison(Operand);

/// Defines the `..._value` variants that take a literal.
macro_rules! literal_comparisons {
    ($($name:ident => $op:expr,)*) => {$(
        #[doc = concat!("`", $op, "` against a literal value.")]
        pub fn $name<V: Into<Bson>>(self, value: V) -> Expr {
            Expr::list($op, vec![self.0, Operand::Value(value.into())])
        }
    )*}
}

impl Comparison {
    /// Starts an expression on `operand`.
    pub fn value_of<O: Into<Operand>>(operand: O) -> Self {
        Comparison(operand.into())
    }

    binary_operators! {
        /// `$cmp`: -1, 0 or 1.
        cmp => "$cmp",
        /// `$eq`
        eq => "$eq",
        /// `$ne`
        ne => "$ne",
        /// `$gt`
        gt => "$gt",
        /// `$gte`
        gte => "$gte",
        /// `$lt`
        lt => "$lt",
        /// `$lte`
        lte => "$lte",
    }

    literal_comparisons! {
        cmp_value => "$cmp",
        eq_value  => "$eq",
        ne_value  => "$ne",
        gt_value  => "$gt",
        gte_value => "$gte",
        lt_value  => "$lt",
        lte_value => "$lte",
    }
}
