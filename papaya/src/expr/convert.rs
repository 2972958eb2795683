//! Type conversion operators.

use bson::Document;
use crate::context::AggregationOperationContext;
use crate::literal::BsonType;
use crate::error::{ Error, ErrorKind, Result };
use super::{ AggregationExpression, Expr, Operand, unary_operators };

/// Factory for conversions of a subject operand.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Convert };
/// # use papaya::literal::BsonType;
/// #
/// let price = Convert::value_of("price").to_decimal();
/// assert_eq!(price.to_document(&NoOpContext).unwrap(), doc! { "$toDecimal": "$price" });
///
/// let qty = Convert::value_of("qty").convert_to(BsonType::INT).on_error(0).on_null(0);
/// assert_eq!(qty.to_document(&NoOpContext).unwrap(), doc! {
///     "$convert": { "input": "$qty", "to": "int", "onError": 0, "onNull": 0 },
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Convert(Operand);

impl Convert {
    /// Starts an expression on `operand`.
    pub fn value_of<O: Into<Operand>>(operand: O) -> Self {
        Convert(operand.into())
    }

    unary_operators! {
        /// `$toBool`
        to_bool => "$toBool",
        /// `$toDate`
        to_date => "$toDate",
        /// `$toDecimal`
        to_decimal => "$toDecimal",
        /// `$toDouble`
        to_double => "$toDouble",
        /// `$toInt`
        to_int => "$toInt",
        /// `$toLong`
        to_long => "$toLong",
        /// `$toObjectId`
        to_object_id => "$toObjectId",
        /// `$toString`
        to_string => "$toString",
        /// `$type`: the BSON type alias of the subject.
        type_of => "$type",
    }

    /// `$convert` to the given type, which must be a single type flag.
    pub fn convert_to(self, to: BsonType) -> ConvertExpr {
        ConvertExpr {
            input: self.0,
            to,
            on_error: None,
            on_null: None,
        }
    }
}

/// `$convert` with optional fallbacks.
#[derive(Debug, Clone)]
pub struct ConvertExpr {
    input: Operand,
    to: BsonType,
    on_error: Option<Operand>,
    on_null: Option<Operand>,
}

impl ConvertExpr {
    /// The result if the conversion fails.
    pub fn on_error<O: Into<Operand>>(mut self, value: O) -> Self {
        self.on_error = Some(value.into());
        self
    }

    /// The result if the input is null or missing.
    pub fn on_null<O: Into<Operand>>(mut self, value: O) -> Self {
        self.on_null = Some(value.into());
        self
    }
}

impl AggregationExpression for ConvertExpr {
    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let to = self.to.alias().ok_or_else(|| Error::new(
            ErrorKind::InvalidExpression,
            format!("$convert needs exactly one target type, got {:?}", self.to)
        ))?;

        let mut body = Document::new();
        body.insert("input", self.input.render(ctx)?);
        body.insert("to", to);

        if let Some(ref value) = self.on_error {
            body.insert("onError", value.render(ctx)?);
        }
        if let Some(ref value) = self.on_null {
            body.insert("onNull", value.render(ctx)?);
        }

        let mut doc = Document::new();
        doc.insert("$convert", body);
        Ok(doc)
    }
}

impl From<ConvertExpr> for Operand {
    fn from(expr: ConvertExpr) -> Self {
        Operand::custom(expr)
    }
}
