//! `$project`

use bson::{ Bson, Document };
use crate::context::AggregationOperationContext;
use crate::expr::Operand;
use crate::fields::{ ExposedField, ExposedFields, Field, ID };
use crate::error::{ Error, ErrorKind, Result };
use super::{ AggregationOperation, Exposure, stage_document, validate_output_name };

#[derive(Debug, Clone)]
enum Projection {
    /// An existing field, possibly under another name.
    Include(Field),
    /// `name: 0`
    Exclude(String),
    /// A computed field.
    Expression(String, Operand),
    /// A constant, wrapped in `$literal`.
    Value(String, Bson),
}

impl Projection {
    fn name(&self) -> &str {
        match *self {
            Projection::Include(ref field) => field.name(),
            Projection::Exclude(ref name)
                | Projection::Expression(ref name, _)
                | Projection::Value(ref name, _) => name.as_str(),
        }
    }
}

/// Reshapes documents: includes, renames, computes or excludes fields.
/// Each output name appears once; the last projection to use it wins.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::Arithmetic;
/// # use papaya::stage::{ AggregationOperation, ProjectionOperation };
/// #
/// let projection = ProjectionOperation::new()
///     .and_include(vec!["title", "author.name"])
///     .and_alias("pages", "page_count")
///     .and_expression("total", Arithmetic::value_of("price").multiply("qty"))
///     .and_value("source", "$legacy")
///     .and_exclude(vec!["_id"]);
///
/// assert_eq!(projection.to_document(&NoOpContext).unwrap(), doc! {
///     "$project": {
///         "title": 1,
///         "name": "$author.name",
///         "pages": "$page_count",
///         "total": { "$multiply": ["$price", "$qty"] },
///         "source": { "$literal": "$legacy" },
///         "_id": 0,
///     }
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProjectionOperation {
    projections: Vec<Projection>,
}

impl ProjectionOperation {
    /// A projection of nothing yet.
    pub fn new() -> Self {
        ProjectionOperation::default()
    }

    /// A later projection replaces an earlier one with the same output name,
    /// in the rendered stage and in the exposed fields alike. E.g. including
    /// `billing.city` and then `shipping.city` projects `"city": "$shipping.city"`.
    fn and(mut self, projection: Projection) -> Self {
        self.projections.retain(|p| p.name() != projection.name());
        self.projections.push(projection);
        self
    }

    /// Includes existing fields. Dotted paths are exposed under their last
    /// segments.
    pub fn and_include<I>(self, fields: I) -> Self
        where I: IntoIterator,
              I::Item: Into<Field>
    {
        fields
            .into_iter()
            .fold(self, |this, field| this.and(Projection::Include(field.into())))
    }

    /// Excludes fields.
    pub fn and_exclude<I>(self, names: I) -> Self
        where I: IntoIterator,
              I::Item: Into<String>
    {
        names
            .into_iter()
            .fold(self, |this, name| this.and(Projection::Exclude(name.into())))
    }

    /// Includes the field at `source` under the name `name`.
    pub fn and_alias(self, name: &str, source: &str) -> Self {
        self.and(Projection::Include(Field::aliased(name, source)))
    }

    /// Computes the field `name`.
    pub fn and_expression<O: Into<Operand>>(self, name: &str, expression: O) -> Self {
        self.and(Projection::Expression(name.to_owned(), expression.into()))
    }

    /// Sets the field `name` to a constant.
    pub fn and_value<V: Into<Bson>>(self, name: &str, value: V) -> Self {
        self.and(Projection::Value(name.to_owned(), value.into()))
    }

    fn excludes_id(&self) -> bool {
        self.projections
            .iter()
            .any(|p| match *p {
                Projection::Exclude(ref name) => name == ID,
                _ => false,
            })
    }

    fn is_exclusion_only(&self) -> bool {
        self.projections
            .iter()
            .all(|p| match *p {
                Projection::Exclude(_) => true,
                _ => false,
            })
    }

    /// Only `_id` may be excluded when anything is included.
    fn validate(&self) -> Result<()> {
        if self.projections.is_empty() {
            return Err(Error::new(ErrorKind::InvalidStage, "$project needs at least one field"));
        }

        if self.is_exclusion_only() {
            return Ok(());
        }

        match self.projections.iter().find(|p| match **p {
            Projection::Exclude(ref name) => name != ID,
            _ => false,
        }) {
            Some(p) => Err(Error::new(
                ErrorKind::InvalidStage,
                format!("$project can't exclude '{}' while including other fields", p.name())
            )),
            None => Ok(()),
        }
    }
}

impl AggregationOperation for ProjectionOperation {
    fn operator(&self) -> &'static str {
        "$project"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        self.validate()?;

        let mut body = Document::new();

        for projection in &self.projections {
            let name = projection.name();
            validate_output_name(self.operator(), name)?;

            let value = match *projection {
                Projection::Include(ref field) => ctx.get_reference(field)?.reference_value(),
                Projection::Exclude(_) => Bson::Int32(0),
                Projection::Expression(_, ref expr) => expr.render(ctx)?,
                Projection::Value(_, ref value) => Bson::Document(
                    stage_document("$literal", value.clone())
                ),
            };

            body.insert(name, value);
        }

        Ok(stage_document(self.operator(), body))
    }

    /// A projection that only excludes fields leaves the rest alone.
    fn exposure(&self) -> Exposure {
        if self.is_exclusion_only() {
            return Exposure::Unchanged;
        }

        let exposed = self.projections
            .iter()
            .filter_map(|p| match *p {
                Projection::Exclude(_) => None,
                _ => Some(ExposedField::new(Field::new(p.name()), true)),
            })
            .fold(ExposedFields::empty(), ExposedFields::and);

        let exposed = if self.excludes_id() {
            exposed
        } else {
            exposed.and(ExposedField::new(ID, true))
        };

        Exposure::Replaced(exposed)
    }
}
