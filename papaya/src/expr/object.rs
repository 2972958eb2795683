//! Object (embedded document) expression operators.

use super::{ Expr, Operand, unary_operators, binary_operators };

/// Factory for object operators applied to a subject operand.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Objects };
/// #
/// let merged = Objects::value_of("defaults").merge_with("overrides");
/// assert_eq!(merged.to_document(&NoOpContext).unwrap(), doc! {
///     "$mergeObjects": ["$defaults", "$overrides"],
/// });
///
/// let price = Objects::value_of("item").get_field("price.usd");
/// assert_eq!(price.to_document(&NoOpContext).unwrap(), doc! {
///     "$getField": { "field": "price.usd", "input": "$item" },
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Objects(Operand);

impl Objects {
    /// Starts an expression on `operand`.
    pub fn value_of<O: Into<Operand>>(operand: O) -> Self {
        Objects(operand.into())
    }

    unary_operators! {
        /// `$objectToArray`
        to_array => "$objectToArray",
    }

    binary_operators! {
        /// `$mergeObjects`. Further documents can be `append`ed.
        merge_with => "$mergeObjects",
    }

    /// `$mergeObjects` of all `documents`.
    pub fn merge<I>(documents: I) -> Expr
        where I: IntoIterator,
              I::Item: Into<Operand>
    {
        Expr::list("$mergeObjects", documents)
    }

    /// `$getField`, which can read field names containing `.` or `$`.
    pub fn get_field(self, name: &str) -> Expr {
        Expr::named("$getField")
            .with_arg("field", Operand::value(name))
            .with_arg("input", self.0)
    }

    /// `$setField`
    pub fn set_field<V: Into<Operand>>(self, name: &str, value: V) -> Expr {
        Expr::named("$setField")
            .with_arg("field", Operand::value(name))
            .with_arg("input", self.0)
            .with_arg("value", value)
    }
}
