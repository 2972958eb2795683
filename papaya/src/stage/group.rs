//! `$group`

use bson::{ Bson, Document };
use crate::context::AggregationOperationContext;
use crate::expr::{ Accumulators, Expr, Operand };
use crate::fields::{ ExposedFields, Fields, ID };
use crate::error::{ Error, ErrorKind, Result };
use super::{ AggregationOperation, Exposure, field_path, stage_document, validate_output_name };

/// What documents are grouped by.
#[derive(Debug, Clone)]
enum GroupId {
    Fields(Fields),
    Expression(Operand),
}

/// Groups documents by fields or by an expression and computes
/// accumulators over each group.
///
/// The grouping fields remain referable by name in the following stages,
/// which read them from `_id`.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::stage::{ self, AggregationOperation };
/// #
/// let by_city = stage::group(vec!["state", "city"])
///     .count("orders")
///     .sum("revenue", "amount")
///     .push("items", "sku");
///
/// assert_eq!(by_city.to_document(&NoOpContext).unwrap(), doc! {
///     "$group": {
///         "_id": { "state": "$state", "city": "$city" },
///         "orders": { "$sum": 1 },
///         "revenue": { "$sum": "$amount" },
///         "items": { "$push": "$sku" },
///     }
/// });
/// ```
#[derive(Debug, Clone)]
pub struct GroupOperation {
    id: GroupId,
    accumulators: Vec<(String, Operand)>,
}

macro_rules! accumulator_methods {
    ($($(#[$attr:meta])* $name:ident,)*) => {$(
        $(#[$attr])*
        pub fn $name<O: Into<Operand>>(self, output: &str, operand: O) -> Self {
            self.accumulate(output, Accumulators::value_of(operand).$name())
        }
    )*}
}

impl GroupOperation {
    /// Groups by `fields`. No fields means a single group of all documents.
    pub fn new(fields: Fields) -> Self {
        GroupOperation {
            id: GroupId::Fields(fields),
            accumulators: Vec::new(),
        }
    }

    /// Groups by the value of an expression.
    pub fn by_expression<O: Into<Operand>>(expression: O) -> Self {
        GroupOperation {
            id: GroupId::Expression(expression.into()),
            accumulators: Vec::new(),
        }
    }

    /// Computes `output` with any accumulator expression.
    pub fn accumulate<E: Into<Operand>>(mut self, output: &str, expression: E) -> Self {
        let expression = expression.into();

        match self.accumulators.iter_mut().find(|(name, _)| name == output) {
            Some(entry) => entry.1 = expression,
            None => self.accumulators.push((output.to_owned(), expression)),
        }

        self
    }

    /// Counts the documents of each group.
    pub fn count(self, output: &str) -> Self {
        self.accumulate(output, Accumulators::count())
    }

    accumulator_methods! {
        /// `$sum`
        sum,
        /// `$avg`
        avg,
        /// `$first`
        first,
        /// `$last`
        last,
        /// `$min`
        min,
        /// `$max`
        max,
        /// `$push`
        push,
        /// `$addToSet`
        add_to_set,
        /// `$stdDevPop`
        std_dev_pop,
        /// `$stdDevSamp`
        std_dev_samp,
    }

    fn render_id(&self, ctx: &dyn AggregationOperationContext) -> Result<Bson> {
        let fields = match self.id {
            GroupId::Fields(ref fields) => fields,
            GroupId::Expression(ref expr) => return expr.render(ctx),
        };

        match (fields.iter().next(), fields.len()) {
            (None, _) => Ok(Bson::Null),
            (Some(field), 1) => field_path(ctx, field),
            _ => {
                let mut id = Document::new();

                for field in fields {
                    id.insert(field.name(), field_path(ctx, field)?);
                }

                Ok(Bson::Document(id))
            }
        }
    }
}

impl AggregationOperation for GroupOperation {
    fn operator(&self) -> &'static str {
        "$group"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let mut body = Document::new();
        body.insert(ID, self.render_id(ctx)?);

        for (name, expr) in &self.accumulators {
            validate_output_name(self.operator(), name)?;

            if name == ID || name.contains('.') {
                return Err(Error::new(
                    ErrorKind::InvalidStage,
                    format!("$group: invalid accumulator name '{}'", name)
                ));
            }

            body.insert(name.as_str(), expr.render(ctx)?);
        }

        Ok(stage_document(self.operator(), body))
    }

    fn exposure(&self) -> Exposure {
        let ids = match self.id {
            GroupId::Fields(ref fields) => ExposedFields::non_synthetic(fields.clone()),
            GroupId::Expression(_) => ExposedFields::empty(),
        };
        let outputs = Fields::from_names(self.accumulators.iter().map(|(name, _)| name.as_str()));

        Exposure::Replaced(ids.and_all(ExposedFields::synthetic(outputs)))
    }
}

impl From<Expr> for GroupOperation {
    fn from(expression: Expr) -> Self {
        GroupOperation::by_expression(expression)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::context::NoOpContext;
    use crate::expr::Dates;
    use super::*;

    #[test]
    fn single_field_and_no_field_ids() {
        let single = GroupOperation::new(Fields::from_names(vec!["city"])).avg("avg_price", "price");
        assert_eq!(single.to_document(&NoOpContext).unwrap(), doc! {
            "$group": { "_id": "$city", "avg_price": { "$avg": "$price" } },
        });

        let all = GroupOperation::new(Fields::empty()).max("latest", "date");
        assert_eq!(all.to_document(&NoOpContext).unwrap(), doc! {
            "$group": { "_id": null, "latest": { "$max": "$date" } },
        });
    }

    #[test]
    fn expression_id() {
        let by_year = GroupOperation::by_expression(Dates::value_of("date").year()).count("n");
        assert_eq!(by_year.to_document(&NoOpContext).unwrap(), doc! {
            "$group": { "_id": { "$year": "$date" }, "n": { "$sum": 1 } },
        });
    }

    #[test]
    fn dotted_accumulator_names_are_rejected() {
        let group = GroupOperation::new(Fields::empty()).count("a.b");
        let err = group.to_document(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);
    }

    #[test]
    fn exposes_ids_and_outputs() {
        let group = GroupOperation::new(Fields::from_names(vec!["city"])).count("n");

        match group.exposure() {
            Exposure::Replaced(fields) => {
                assert!(!fields.get("city").unwrap().is_synthetic());
                assert!(fields.get("n").unwrap().is_synthetic());
            }
            other => panic!("unexpected exposure {:?}", other),
        }
    }
}
