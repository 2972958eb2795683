//! Aggregation expressions: typed operator trees that render themselves into
//! nested BSON documents.
//!
//! Every operator argument is an [`Operand`](enum.Operand.html). Converting a
//! Rust value into an `Operand` decides how it is rendered:
//!
//! * `Field`, `&str` and `String` are field references, resolved through the
//!   operation context and rendered as `"$path"` (`"$$var"` for variables).
//! * `Expr` and any other `AggregationExpression` render as a nested document.
//! * numbers, booleans, `Bson`, `Document`, `DateTime` and `ObjectId` are
//!   literals. String literals must be passed via `Operand::value()`; if they
//!   start with `$`, they are wrapped in `{ "$literal": ... }`.
//! * `Vec<T>` renders as an array of the converted elements.
//!
//! ```
//! # use bson::{ doc, Bson };
//! # use papaya::context::NoOpContext;
//! # use papaya::expr::{ AggregationExpression, Arithmetic, Operand };
//! #
//! let total = Arithmetic::value_of("price")
//!     .multiply("qty")
//!     .append(Operand::value(1.2));
//!
//! assert_eq!(total.to_document(&NoOpContext).unwrap(), doc! {
//!     "$multiply": ["$price", "$qty", 1.2],
//! });
//!
//! let currency = Operand::value("$USD");
//! assert_eq!(currency.render(&NoOpContext).unwrap(), Bson::Document(doc! {
//!     "$literal": "$USD",
//! }));
//! ```

use std::fmt;
use std::sync::Arc;
use std::borrow::Cow;
use bson::{ Bson, Document, oid::ObjectId, DateTime };
use crate::context::AggregationOperationContext;
use crate::fields::{ Field, Variable, SystemVariable };
use crate::error::Result;

mod arithmetic;
mod string;
mod array;
mod comparison;
mod boolean;
mod conditional;
mod accumulator;
mod date;
mod convert;
mod set;
mod object;
mod variable;

pub use self::arithmetic::Arithmetic;
pub use self::string::Strings;
pub use self::array::{ Arrays, Filter, Reduce };
pub use self::comparison::Comparison;
pub use self::boolean::Boolean;
pub use self::conditional::{ Conditional, CondThen, CondOtherwise, IfNull, Switch };
pub use self::accumulator::Accumulators;
pub use self::date::{ Dates, TimeUnit };
pub use self::convert::{ Convert, ConvertExpr };
pub use self::set::Sets;
pub use self::object::Objects;
pub use self::variable::{ Variables, Let, Map };

/// An object that renders itself as an aggregation expression document.
pub trait AggregationExpression: fmt::Debug + Send + Sync {
    /// Renders the expression, resolving field references through `ctx`.
    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document>;
}

/// A raw document is used as-is.
impl AggregationExpression for Document {
    fn to_document(&self, _: &dyn AggregationOperationContext) -> Result<Document> {
        Ok(self.clone())
    }
}

/// Anything that can appear as the argument of an operator.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A field reference, resolved through the context.
    Field(Field),
    /// A `$$variable` reference.
    Variable(Variable),
    /// A nested operator.
    Expression(Expr),
    /// Any other expression.
    Custom(Arc<dyn AggregationExpression>),
    /// A literal value.
    Value(Bson),
    /// An array of operands.
    Array(Vec<Operand>),
    /// A document of named operands.
    Document(Vec<(String, Operand)>),
}

impl Operand {
    /// A literal value. This is the way to pass string literals.
    pub fn value<T: Into<Bson>>(value: T) -> Self {
        Operand::Value(value.into())
    }

    /// A field reference.
    pub fn field<F: Into<Field>>(field: F) -> Self {
        Operand::Field(field.into())
    }

    /// Wraps a custom expression.
    pub fn custom<E: AggregationExpression + 'static>(expression: E) -> Self {
        Operand::Custom(Arc::new(expression))
    }

    /// A document whose values are operands in their own right.
    ///
    /// ```
    /// # use bson::{ doc, Bson };
    /// # use papaya::context::NoOpContext;
    /// # use papaya::expr::Operand;
    /// #
    /// let shape = Operand::document(vec![
    ///     ("who", Operand::from("name")),
    ///     ("kind", Operand::value("customer")),
    /// ]);
    /// assert_eq!(shape.render(&NoOpContext).unwrap(), Bson::Document(doc! {
    ///     "who": "$name",
    ///     "kind": "customer",
    /// }));
    /// ```
    pub fn document<I, K>(entries: I) -> Self
        where I: IntoIterator<Item = (K, Operand)>,
              K: Into<String>
    {
        Operand::Document(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Renders the operand into its BSON form.
    pub fn render(&self, ctx: &dyn AggregationOperationContext) -> Result<Bson> {
        match *self {
            Operand::Field(ref field) => ctx.get_reference(field).map(|r| r.to_bson()),
            Operand::Variable(ref var) => Ok(var.to_bson()),
            Operand::Expression(ref expr) => expr.to_document(ctx).map(Bson::Document),
            Operand::Custom(ref expr) => expr.to_document(ctx).map(Bson::Document),
            Operand::Value(Bson::String(ref s)) if s.starts_with('$') => {
                let mut doc = Document::new();
                doc.insert("$literal", s.as_str());
                Ok(Bson::Document(doc))
            }
            Operand::Value(ref value) => Ok(value.clone()),
            Operand::Array(ref items) => items
                .iter()
                .map(|item| item.render(ctx))
                .collect::<Result<Vec<_>>>()
                .map(Bson::Array),
            Operand::Document(ref entries) => {
                let mut doc = Document::new();

                for (key, value) in entries {
                    doc.insert(key.as_str(), value.render(ctx)?);
                }

                Ok(Bson::Document(doc))
            }
        }
    }
}

impl From<Field> for Operand {
    fn from(field: Field) -> Self {
        Operand::Field(field)
    }
}

impl From<&Field> for Operand {
    fn from(field: &Field) -> Self {
        Operand::Field(field.clone())
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Field(Field::new(name))
    }
}

impl From<String> for Operand {
    fn from(name: String) -> Self {
        Operand::Field(Field::new(name))
    }
}

impl From<Variable> for Operand {
    fn from(var: Variable) -> Self {
        Operand::Variable(var)
    }
}

impl From<SystemVariable> for Operand {
    fn from(var: SystemVariable) -> Self {
        Operand::Variable(var.into())
    }
}

impl From<Expr> for Operand {
    fn from(expr: Expr) -> Self {
        Operand::Expression(expr)
    }
}

impl<T: Into<Operand>> From<Vec<T>> for Operand {
    fn from(items: Vec<T>) -> Self {
        Operand::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Literal conversions.
macro_rules! impl_literal_operand {
    ($($ty:ty,)*) => {$(
        impl From<$ty> for Operand {
            fn from(value: $ty) -> Self {
                Operand::Value(value.into())
            }
        }
    )*}
}

impl_literal_operand! {
    Bson,
    Document,
    i32,
    i64,
    f64,
    bool,
    ObjectId,
    DateTime,
}

/// The arguments of an operator.
#[derive(Debug, Clone)]
enum Args {
    /// `{ "$op": arg }`
    Single(Box<Operand>),
    /// `{ "$op": [args...] }`
    List(Vec<Operand>),
    /// `{ "$op": { name: arg, ... } }`
    Named(Vec<(&'static str, Operand)>),
    /// `{ "$op": value }`, never wrapped in `$literal`.
    Raw(Bson),
}

/// A single operator node, `{ "$operator": arguments }`.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Expr, Operand };
/// #
/// let expr = Expr::named("$dateToString")
///     .with_arg("format", Operand::value("%Y"))
///     .with_arg("date", "createdAt")
///     .with_opt_arg("timezone", None::<Operand>);
///
/// assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! {
///     "$dateToString": { "format": "%Y", "date": "$createdAt" },
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Expr {
    operator: Cow<'static, str>,
    args: Args,
}

impl Expr {
    /// An operator with a single argument.
    pub fn new<O, A>(operator: O, arg: A) -> Self
        where O: Into<Cow<'static, str>>,
              A: Into<Operand>
    {
        Expr {
            operator: operator.into(),
            args: Args::Single(Box::new(arg.into())),
        }
    }

    /// An operator with an argument list.
    pub fn list<O, I>(operator: O, args: I) -> Self
        where O: Into<Cow<'static, str>>,
              I: IntoIterator,
              I::Item: Into<Operand>
    {
        Expr {
            operator: operator.into(),
            args: Args::List(args.into_iter().map(Into::into).collect()),
        }
    }

    /// An operator with named arguments, initially none.
    pub fn named<O: Into<Cow<'static, str>>>(operator: O) -> Self {
        Expr {
            operator: operator.into(),
            args: Args::Named(Vec::new()),
        }
    }

    /// An operator whose argument is used verbatim.
    pub(crate) fn raw<O: Into<Cow<'static, str>>>(operator: O, value: Bson) -> Self {
        Expr {
            operator: operator.into(),
            args: Args::Raw(value),
        }
    }

    /// The operator, including its `$` sigil.
    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Adds a named argument, replacing an existing one of the same name.
    /// Any positional arguments are discarded.
    pub fn with_arg<V: Into<Operand>>(mut self, name: &'static str, value: V) -> Self {
        let value = value.into();

        match self.args {
            Args::Named(ref mut entries) => {
                match entries.iter_mut().find(|(n, _)| *n == name) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((name, value)),
                }
            }
            _ => self.args = Args::Named(vec![(name, value)]),
        }

        self
    }

    /// Adds a named argument if it is present.
    pub fn with_opt_arg<V: Into<Operand>>(self, name: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with_arg(name, value),
            None => self,
        }
    }

    /// Appends a positional argument. A single argument is turned into a
    /// list first. Has no effect on operators with named arguments.
    pub fn append<V: Into<Operand>>(mut self, value: V) -> Self {
        let value = value.into();

        self.args = match self.args {
            Args::Single(first) => Args::List(vec![*first, value]),
            Args::List(mut items) => {
                items.push(value);
                Args::List(items)
            }
            Args::Raw(first) => Args::List(vec![Operand::Value(first), value]),
            named @ Args::Named(_) => named,
        };

        self
    }
}

impl AggregationExpression for Expr {
    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let args = match self.args {
            Args::Single(ref arg) => arg.render(ctx)?,
            Args::List(ref items) => Bson::Array(
                items.iter().map(|item| item.render(ctx)).collect::<Result<_>>()?
            ),
            Args::Named(ref entries) => {
                let mut doc = Document::new();

                for &(name, ref value) in entries {
                    doc.insert(name, value.render(ctx)?);
                }

                Bson::Document(doc)
            }
            Args::Raw(ref value) => value.clone(),
        };

        let mut doc = Document::new();
        doc.insert(self.operator.as_ref(), args);
        Ok(doc)
    }
}

/// `$literal`: a value that is never interpreted as a path or an operator.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, literal };
/// #
/// assert_eq!(literal("$1.00").to_document(&NoOpContext).unwrap(), doc! {
///     "$literal": "$1.00",
/// });
/// ```
pub fn literal<T: Into<Bson>>(value: T) -> Expr {
    Expr::raw("$literal", value.into())
}

/// Shorthand for a field reference operand.
pub fn field<F: Into<Field>>(field: F) -> Operand {
    Operand::field(field)
}

/// Defines factory methods for operators that take the subject as their only
/// argument.
macro_rules! unary_operators {
    ($($(#[$attr:meta])* $name:ident => $op:expr,)*) => {$(
        $(#[$attr])*
        pub fn $name(self) -> Expr {
            Expr::new($op, self.0)
        }
    )*}
}

/// Defines factory methods for operators that take `[subject, other]`.
macro_rules! binary_operators {
    ($($(#[$attr:meta])* $name:ident => $op:expr,)*) => {$(
        $(#[$attr])*
        pub fn $name<O: Into<Operand>>(self, other: O) -> Expr {
            Expr::list($op, vec![self.0, other.into()])
        }
    )*}
}

pub(crate) use unary_operators;
pub(crate) use binary_operators;

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::context::NoOpContext;
    use super::*;

    #[test]
    fn append_turns_single_into_list() {
        let expr = Expr::new("$concatArrays", "a").append("b");
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! {
            "$concatArrays": ["$a", "$b"],
        });
    }

    #[test]
    fn append_ignores_named_arguments() {
        let expr = Expr::named("$filter").with_arg("input", "xs").append("ys");
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! {
            "$filter": { "input": "$xs" },
        });
    }

    #[test]
    fn nested_values_are_not_wrapped() {
        let operand = Operand::from(vec![Operand::value("plain"), Operand::from(3)]);
        assert_eq!(operand.render(&NoOpContext).unwrap(), Bson::Array(vec![
            Bson::from("plain"), Bson::Int32(3),
        ]));

        let raw = Operand::from(doc! { "price": "$5" });
        assert_eq!(raw.render(&NoOpContext).unwrap(), Bson::Document(doc! { "price": "$5" }));
    }

    #[test]
    fn variable_strings_become_variable_references() {
        let operand = Operand::from("$$CURRENT.total");
        assert_eq!(operand.render(&NoOpContext).unwrap(), Bson::from("$$CURRENT.total"));
    }

    #[test]
    fn empty_field_name_fails() {
        let err = Operand::from("").render(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidField);
    }
}
