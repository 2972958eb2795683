//! Arithmetic expression operators.

use super::{ Expr, Operand, unary_operators, binary_operators };

/// Factory for arithmetic operators applied to a subject operand.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Arithmetic };
/// #
/// let net = Arithmetic::value_of("gross").subtract("tax");
/// let rounded = Arithmetic::value_of(net).round_to_place(2);
///
/// assert_eq!(rounded.to_document(&NoOpContext).unwrap(), doc! {
///     "$round": [{ "$subtract": ["$gross", "$tax"] }, 2],
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Arithmetic(Operand);

impl Arithmetic {
    /// Starts an expression on `operand`.
    pub fn value_of<O: Into<Operand>>(operand: O) -> Self {
        Arithmetic(operand.into())
    }

    unary_operators! {
        /// `$abs`
        abs => "$abs",
        /// `$ceil`
        ceil => "$ceil",
        /// `$exp`
        exp => "$exp",
        /// `$floor`
        floor => "$floor",
        /// `$ln`
        ln => "$ln",
        /// `$log10`
        log10 => "$log10",
        /// `$sqrt`
        sqrt => "$sqrt",
        /// `$trunc`
        trunc => "$trunc",
        /// `$round` to an integer.
        round => "$round",
        /// `$sum` of an array operand.
        sum => "$sum",
        /// `$avg` of an array operand.
        avg => "$avg",
        /// `$max` of an array operand.
        max => "$max",
        /// `$min` of an array operand.
        min => "$min",
        /// `$stdDevPop` of an array operand.
        std_dev_pop => "$stdDevPop",
        /// `$stdDevSamp` of an array operand.
        std_dev_samp => "$stdDevSamp",
    }

    binary_operators! {
        /// `$add`. Further summands can be `append`ed.
        add => "$add",
        /// `$subtract`
        subtract => "$subtract",
        /// `$multiply`. Further factors can be `append`ed.
        multiply => "$multiply",
        /// `$divide`
        divide => "$divide",
        /// `$mod`
        modulo => "$mod",
        /// `$pow`
        pow => "$pow",
        /// `$log` with the given base.
        log => "$log",
    }

    /// `$round` to the given number of decimal places.
    pub fn round_to_place(self, place: i32) -> Expr {
        Expr::list("$round", vec![self.0, Operand::from(place)])
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::context::NoOpContext;
    use crate::expr::AggregationExpression;
    use super::*;

    #[test]
    fn sum_of_array_field_is_unary() {
        let expr = Arithmetic::value_of("scores").sum();
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! { "$sum": "$scores" });
    }

    #[test]
    fn literal_operands() {
        let expr = Arithmetic::value_of("count").add(10).append(0.5);
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! {
            "$add": ["$count", 10, 0.5],
        });

        let expr = Arithmetic::value_of("n").modulo(2);
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! { "$mod": ["$n", 2] });
    }
}
