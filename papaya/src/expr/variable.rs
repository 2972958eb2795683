//! `$let` and `$map`, the operators that bind user-named variables.

use bson::Document;
use crate::context::{ AggregationOperationContext, VariableScopeContext };
use crate::error::Result;
use super::{ AggregationExpression, Operand };

/// Entry points for variable-binding expressions.
#[derive(Debug, Clone, Copy)]
pub struct Variables;

impl Variables {
    /// `$let` binding `vars` within `body`.
    pub fn let_<I, K, B>(vars: I, body: B) -> Let
        where I: IntoIterator<Item = (K, Operand)>,
              K: Into<String>,
              B: Into<Operand>
    {
        vars.into_iter()
            .fold(Let::new(), |expr, (name, value)| expr.define(name, value))
            .and_apply(body)
    }

    /// `$map` over `input`, binding each element to `variable` within `body`.
    pub fn map<I, B>(input: I, variable: &str, body: B) -> Map
        where I: Into<Operand>,
              B: Into<Operand>
    {
        Map::items_of(input).as_(variable).and_apply(body)
    }
}

/// `$let`.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Arithmetic, Let, Operand };
/// #
/// let total = Let::new()
///     .define("total", Arithmetic::value_of("price").add("tax"))
///     .define("discounted", Operand::from("applyDiscount"))
///     .and_apply(Arithmetic::value_of("total").multiply(0.9));
///
/// assert_eq!(total.to_document(&NoOpContext).unwrap(), doc! {
///     "$let": {
///         "vars": {
///             "total": { "$add": ["$price", "$tax"] },
///             "discounted": "$applyDiscount",
///         },
///         "in": { "$multiply": ["$$total", 0.9] },
///     }
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Let {
    vars: Vec<(String, Operand)>,
    body: Option<Operand>,
}

impl Let {
    /// A `$let` without variables.
    pub fn new() -> Self {
        Let::default()
    }

    /// Binds `name` to `value`. The value is rendered outside the scope of
    /// the variables.
    pub fn define<K, V>(mut self, name: K, value: V) -> Self
        where K: Into<String>,
              V: Into<Operand>
    {
        let name: String = name.into();
        let name = name.trim_start_matches('$').to_owned();
        let value = value.into();

        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((name, value)),
        }

        self
    }

    /// The expression evaluated with the variables in scope.
    pub fn and_apply<B: Into<Operand>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl AggregationExpression for Let {
    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let scope = VariableScopeContext::new(self.vars.iter().map(|(n, _)| n.as_str()), ctx);
        let mut vars = Document::new();

        for (name, value) in &self.vars {
            vars.insert(name.as_str(), value.render(ctx)?);
        }

        let mut body = Document::new();
        body.insert("vars", vars);

        if let Some(ref expr) = self.body {
            body.insert("in", expr.render(&scope)?);
        }

        let mut doc = Document::new();
        doc.insert("$let", body);
        Ok(doc)
    }
}

impl From<Let> for Operand {
    fn from(expr: Let) -> Self {
        Operand::custom(expr)
    }
}

/// `$map`.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Arithmetic, Map };
/// #
/// let with_tax = Map::items_of("prices")
///     .as_("p")
///     .and_apply(Arithmetic::value_of("p").multiply(1.27));
///
/// assert_eq!(with_tax.to_document(&NoOpContext).unwrap(), doc! {
///     "$map": {
///         "input": "$prices",
///         "as": "p",
///         "in": { "$multiply": ["$$p", 1.27] },
///     }
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Map {
    input: Operand,
    variable: String,
    body: Option<Operand>,
}

impl Map {
    /// Maps over the elements of `input`, bound to `this` by default.
    pub fn items_of<I: Into<Operand>>(input: I) -> Self {
        Map {
            input: input.into(),
            variable: String::from("this"),
            body: None,
        }
    }

    /// Binds each element to `variable` instead of `this`.
    pub fn as_(mut self, variable: &str) -> Self {
        self.variable = variable.trim_start_matches('$').to_owned();
        self
    }

    /// The expression producing each output element.
    pub fn and_apply<B: Into<Operand>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl AggregationExpression for Map {
    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let scope = VariableScopeContext::new(vec![self.variable.as_str()], ctx);
        let mut body = Document::new();

        body.insert("input", self.input.render(ctx)?);
        body.insert("as", self.variable.as_str());

        if let Some(ref expr) = self.body {
            body.insert("in", expr.render(&scope)?);
        }

        let mut doc = Document::new();
        doc.insert("$map", body);
        Ok(doc)
    }
}

impl From<Map> for Operand {
    fn from(expr: Map) -> Self {
        Operand::custom(expr)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::context::NoOpContext;
    use crate::expr::Strings;
    use super::*;

    #[test]
    fn map_defaults_to_this() {
        let expr = Variables::map("names", "this", Strings::value_of("this").to_upper());
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! {
            "$map": { "input": "$names", "as": "this", "in": { "$toUpper": "$$this" } },
        });
    }

    #[test]
    fn let_vars_are_not_in_scope_of_each_other() {
        let expr = Variables::let_(
            vec![("a", Operand::from("b")), ("b", Operand::from(1))],
            "a",
        );

        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! {
            "$let": { "vars": { "a": "$b", "b": 1 }, "in": "$$a" },
        });
    }
}
