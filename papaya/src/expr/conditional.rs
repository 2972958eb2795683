//! Conditional expression operators: `$cond`, `$ifNull` and `$switch`.

use bson::{ Bson, Document };
use crate::context::AggregationOperationContext;
use crate::error::{ Error, ErrorKind, Result };
use super::{ AggregationExpression, Expr, Operand };

/// Entry points for conditional expressions.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Comparison, Conditional, Operand };
/// #
/// let discount = Conditional::when(Comparison::value_of("qty").gte(250))
///     .then(30)
///     .otherwise(20);
///
/// assert_eq!(discount.to_document(&NoOpContext).unwrap(), doc! {
///     "$cond": {
///         "if": { "$gte": ["$qty", 250] },
///         "then": 30,
///         "else": 20,
///     }
/// });
///
/// let description = Conditional::if_null("description")
///     .or_if_null("summary")
///     .then(Operand::value("Unspecified"));
///
/// assert_eq!(description.to_document(&NoOpContext).unwrap(), doc! {
///     "$ifNull": ["$description", "$summary", "Unspecified"],
/// });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Conditional;

impl Conditional {
    /// Starts a `$cond` on the condition `cond`.
    pub fn when<O: Into<Operand>>(cond: O) -> CondThen {
        CondThen { cond: cond.into() }
    }

    /// A complete `$cond`.
    pub fn cond<C, T, E>(cond: C, then: T, otherwise: E) -> Expr
        where C: Into<Operand>,
              T: Into<Operand>,
              E: Into<Operand>
    {
        Conditional::when(cond).then(then).otherwise(otherwise)
    }

    /// Starts an `$ifNull` on `operand`.
    pub fn if_null<O: Into<Operand>>(operand: O) -> IfNull {
        IfNull { candidates: vec![operand.into()] }
    }

    /// Starts an empty `$switch`.
    pub fn switch() -> Switch {
        Switch::default()
    }
}

/// A `$cond` that needs its `then` branch.
#[derive(Debug, Clone)]
pub struct CondThen {
    cond: Operand,
}

impl CondThen {
    /// The value if the condition holds.
    pub fn then<O: Into<Operand>>(self, then: O) -> CondOtherwise {
        CondOtherwise { cond: self.cond, then: then.into() }
    }
}

/// A `$cond` that needs its `else` branch.
#[derive(Debug, Clone)]
pub struct CondOtherwise {
    cond: Operand,
    then: Operand,
}

impl CondOtherwise {
    /// The value if the condition does not hold.
    pub fn otherwise<O: Into<Operand>>(self, otherwise: O) -> Expr {
        Expr::named("$cond")
            .with_arg("if", self.cond)
            .with_arg("then", self.then)
            .with_arg("else", otherwise)
    }
}

/// An `$ifNull` collecting its candidate operands.
#[derive(Debug, Clone)]
pub struct IfNull {
    candidates: Vec<Operand>,
}

impl IfNull {
    /// Tries `operand` next if every previous candidate is null or missing.
    pub fn or_if_null<O: Into<Operand>>(mut self, operand: O) -> Self {
        self.candidates.push(operand.into());
        self
    }

    /// The replacement if every candidate is null or missing.
    pub fn then<O: Into<Operand>>(mut self, replacement: O) -> Expr {
        self.candidates.push(replacement.into());
        Expr::list("$ifNull", self.candidates)
    }
}

/// `$switch` with `case`/`then` branches and an optional default.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Comparison, Conditional, Operand };
/// # use papaya::error::ErrorKind;
/// #
/// let grade = Conditional::switch()
///     .case(Comparison::value_of("score").gte(90), Operand::value("A"))
///     .case(Comparison::value_of("score").gte(80), Operand::value("B"))
///     .default_to(Operand::value("C"));
///
/// assert_eq!(grade.to_document(&NoOpContext).unwrap(), doc! {
///     "$switch": {
///         "branches": [
///             { "case": { "$gte": ["$score", 90] }, "then": "A" },
///             { "case": { "$gte": ["$score", 80] }, "then": "B" },
///         ],
///         "default": "C",
///     }
/// });
///
/// let empty = Conditional::switch().default_to(0);
/// let err = empty.to_document(&NoOpContext).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::InvalidExpression);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Switch {
    branches: Vec<(Operand, Operand)>,
    default: Option<Operand>,
}

impl Switch {
    /// Adds a branch.
    pub fn case<C, T>(mut self, case: C, then: T) -> Self
        where C: Into<Operand>,
              T: Into<Operand>
    {
        self.branches.push((case.into(), then.into()));
        self
    }

    /// The value if no branch matches.
    pub fn default_to<O: Into<Operand>>(mut self, default: O) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl AggregationExpression for Switch {
    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        if self.branches.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidExpression,
                "$switch requires at least one branch"
            ));
        }

        let branches = self.branches
            .iter()
            .map(|(case, then)| -> Result<Bson> {
                let mut branch = Document::new();
                branch.insert("case", case.render(ctx)?);
                branch.insert("then", then.render(ctx)?);
                Ok(Bson::Document(branch))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut body = Document::new();
        body.insert("branches", branches);

        if let Some(ref default) = self.default {
            body.insert("default", default.render(ctx)?);
        }

        let mut doc = Document::new();
        doc.insert("$switch", body);
        Ok(doc)
    }
}

impl From<Switch> for Operand {
    fn from(switch: Switch) -> Self {
        Operand::custom(switch)
    }
}
