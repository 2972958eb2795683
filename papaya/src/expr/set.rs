//! Set expression operators, treating arrays as sets.

use super::{ Expr, Operand, binary_operators };

/// Factory for set operators applied to a subject operand.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Sets };
/// #
/// let common = Sets::value_of("a").intersection("b").append("c");
/// assert_eq!(common.to_document(&NoOpContext).unwrap(), doc! {
///     "$setIntersection": ["$a", "$b", "$c"],
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Sets(Operand);

impl Sets {
    /// Starts an expression on `operand`.
    pub fn value_of<O: Into<Operand>>(operand: O) -> Self {
        Sets(operand.into())
    }

    binary_operators! {
        /// `$setEquals`
        equals => "$setEquals",
        /// `$setIntersection`
        intersection => "$setIntersection",
        /// `$setUnion`
        union => "$setUnion",
        /// `$setDifference`: elements of the subject not in `other`.
        difference => "$setDifference",
        /// `$setIsSubset`: whether the subject is a subset of `other`.
        is_subset => "$setIsSubset",
    }

    /// `$anyElementTrue`
    pub fn any_element_true(self) -> Expr {
        Expr::list("$anyElementTrue", vec![self.0])
    }

    /// `$allElementsTrue`
    pub fn all_elements_true(self) -> Expr {
        Expr::list("$allElementsTrue", vec![self.0])
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::context::NoOpContext;
    use crate::expr::AggregationExpression;
    use super::*;

    #[test]
    fn element_truth_wraps_in_array() {
        let expr = Sets::value_of("flags").all_elements_true();
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! {
            "$allElementsTrue": ["$flags"],
        });
    }
}
