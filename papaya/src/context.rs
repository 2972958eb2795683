//! Operation contexts resolve field names to document paths while a pipeline
//! is being rendered.
//!
//! Each stage is rendered in the context left behind by its predecessor. The
//! first stage sees the root context: `NoOpContext` for untyped aggregations
//! and `TypeBasedContext<T>` for aggregations over a mapped type. A stage that
//! reshapes documents (`$project`, `$group`, ...) leaves behind an
//! `ExposedFieldsContext` which only knows the fields the stage produced.
//!
//! ```
//! # use std::rc::Rc;
//! # use papaya::context::{ AggregationOperationContext, ExposedFieldsContext, NoOpContext };
//! # use papaya::fields::{ ExposedFields, Fields };
//! # use papaya::error::ErrorKind;
//! #
//! let exposed = ExposedFields::synthetic(Fields::from_names(vec!["total"]));
//! let ctx = ExposedFieldsContext::new(exposed, Rc::new(NoOpContext));
//!
//! assert_eq!(ctx.get_reference_by_name("total").unwrap().raw(), "total");
//! assert_eq!(ctx.get_reference_by_name("total.net").unwrap().raw(), "total.net");
//!
//! let err = ctx.get_reference_by_name("price").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InvalidReference);
//! assert_eq!(err.message(), "invalid reference 'price'");
//! ```

use std::fmt;
use std::rc::Rc;
use std::any::type_name;
use std::marker::PhantomData;
use bson::{ Bson, Document };
use tracing::{ trace, warn };
use crate::fields::{ Field, FieldReference, ExposedField, ExposedFields, ID };
use crate::mapping::{ Mapped, Property, resolve_in, nested_in };
use crate::error::{ Error, ErrorKind, Result };

/// Resolves field references and maps raw criteria documents.
pub trait AggregationOperationContext: fmt::Debug {
    /// Resolves `field` to a reference.
    fn get_reference(&self, field: &Field) -> Result<FieldReference>;

    /// Resolves a field given by name.
    fn get_reference_by_name(&self, name: &str) -> Result<FieldReference> {
        self.get_reference(&Field::new(name))
    }

    /// Maps the keys of a raw criteria document to stored document paths.
    fn get_mapped_object(&self, document: Document) -> Result<Document> {
        Ok(document)
    }
}

impl<C> AggregationOperationContext for &C where C: AggregationOperationContext + ?Sized {
    fn get_reference(&self, field: &Field) -> Result<FieldReference> {
        (**self).get_reference(field)
    }

    fn get_reference_by_name(&self, name: &str) -> Result<FieldReference> {
        (**self).get_reference_by_name(name)
    }

    fn get_mapped_object(&self, document: Document) -> Result<Document> {
        (**self).get_mapped_object(document)
    }
}

/// Handles the cases every context treats the same way: empty names are
/// rejected and variables are never resolved.
fn preflight(field: &Field) -> Result<Option<FieldReference>> {
    field.validate()?;

    if field.is_variable() {
        Ok(Some(FieldReference::variable(field.target())))
    } else {
        Ok(None)
    }
}

/// Resolves every field to its own target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpContext;

impl AggregationOperationContext for NoOpContext {
    fn get_reference(&self, field: &Field) -> Result<FieldReference> {
        if let Some(var) = preflight(field)? {
            return Ok(var);
        }

        Ok(FieldReference::direct(field.name(), field.target()))
    }
}

/// Resolves names against the fields exposed by the previous stage.
///
/// The strict flavour rejects anything else. The inheriting flavour, left
/// behind by stages that only add fields, falls back to the context that was
/// in effect before the stage.
#[derive(Debug, Clone)]
pub struct ExposedFieldsContext<'a> {
    exposed: ExposedFields,
    previous: Rc<dyn AggregationOperationContext + 'a>,
    inherit: bool,
}

impl<'a> ExposedFieldsContext<'a> {
    /// A context that only resolves the exposed fields.
    pub fn new(exposed: ExposedFields, previous: Rc<dyn AggregationOperationContext + 'a>) -> Self {
        ExposedFieldsContext { exposed, previous, inherit: false }
    }

    /// A context that resolves the exposed fields first, then falls back
    /// to `previous`.
    pub fn inheriting(exposed: ExposedFields, previous: Rc<dyn AggregationOperationContext + 'a>) -> Self {
        ExposedFieldsContext { exposed, previous, inherit: true }
    }

    /// Whether unknown names fall back to the previous context.
    pub fn is_inheriting(&self) -> bool {
        self.inherit
    }

    /// The fields this context resolves.
    pub fn exposed_fields(&self) -> &ExposedFields {
        &self.exposed
    }

    /// The path an exposed field can be found at in the stage's output.
    fn raw_path(&self, exposed: &ExposedField) -> String {
        if exposed.is_synthetic() {
            exposed.name().to_owned()
        } else if self.exposed.exposes_single_non_synthetic_field_only() {
            ID.to_owned()
        } else {
            format!("{}.{}", ID, exposed.name())
        }
    }

    fn resolve(&self, field: &Field) -> Option<FieldReference> {
        let name = field.target();

        if let Some(exposed) = self.exposed.get(name) {
            return Some(FieldReference::direct(field.name(), self.raw_path(exposed)));
        }

        if let Some(dot) = name.find('.') {
            let (head, rest) = (&name[..dot], &name[dot + 1..]);

            if let Some(exposed) = self.exposed.get(head) {
                let raw = format!("{}.{}", self.raw_path(exposed), rest);
                return Some(FieldReference::direct(field.name(), raw));
            }
        }

        if name == ID || name.starts_with("_id.") {
            return Some(FieldReference::direct(field.name(), name));
        }

        None
    }
}

impl<'a> AggregationOperationContext for ExposedFieldsContext<'a> {
    fn get_reference(&self, field: &Field) -> Result<FieldReference> {
        if let Some(var) = preflight(field)? {
            return Ok(var);
        }

        if let Some(reference) = self.resolve(field) {
            return Ok(reference);
        }

        if self.inherit {
            trace!(field = field.target(), "not exposed, resolving in previous context");
            return self.previous.get_reference(field);
        }

        Err(Error::new(
            ErrorKind::InvalidReference,
            format!("invalid reference '{}'", field.target())
        ))
    }

    fn get_mapped_object(&self, document: Document) -> Result<Document> {
        self.previous.get_mapped_object(document)
    }
}

/// Wraps a parent context while the body of `$let`, `$map`, `$filter` or
/// `$reduce` is rendered. Names whose first segment is a declared variable
/// become `$$variable` references.
#[derive(Debug, Clone)]
pub struct VariableScopeContext<'a> {
    variables: Vec<String>,
    parent: &'a dyn AggregationOperationContext,
}

impl<'a> VariableScopeContext<'a> {
    /// Declares `variables` on top of `parent`.
    pub fn new<I>(variables: I, parent: &'a dyn AggregationOperationContext) -> Self
        where I: IntoIterator,
              I::Item: Into<String>
    {
        let variables = variables
            .into_iter()
            .map(|v| Into::<String>::into(v).trim_start_matches('$').to_owned())
            .collect();

        VariableScopeContext { variables, parent }
    }

    /// Whether `name` is declared in this scope.
    pub fn declares(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }
}

impl<'a> AggregationOperationContext for VariableScopeContext<'a> {
    fn get_reference(&self, field: &Field) -> Result<FieldReference> {
        if let Some(var) = preflight(field)? {
            return Ok(var);
        }

        let target = field.target();
        let head = target.split('.').next().unwrap_or(target);

        if self.declares(head) {
            Ok(FieldReference::variable(target))
        } else {
            self.parent.get_reference(field)
        }
    }

    fn get_mapped_object(&self, document: Document) -> Result<Document> {
        self.parent.get_mapped_object(document)
    }
}

/// Resolves property paths of `T` to stored document paths.
///
/// ```
/// # use papaya::context::{ AggregationOperationContext, TypeBasedContext };
/// # use papaya::mapping::{ Mapped, Property };
/// #
/// struct Book;
///
/// impl Mapped for Book {
///     fn properties() -> &'static [Property] {
///         static PROPERTIES: &[Property] = &[Property::new("page_count", "pages")];
///         PROPERTIES
///     }
/// }
///
/// let strict = TypeBasedContext::<Book>::strict();
/// let reference = strict.get_reference_by_name("page_count").unwrap();
/// assert_eq!(reference.raw(), "pages");
/// assert!(strict.get_reference_by_name("title").is_err());
///
/// let relaxed = TypeBasedContext::<Book>::relaxed();
/// assert_eq!(relaxed.get_reference_by_name("title").unwrap().raw(), "title");
/// ```
pub struct TypeBasedContext<T> {
    strict: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Mapped> TypeBasedContext<T> {
    /// Unknown properties are errors.
    pub fn strict() -> Self {
        TypeBasedContext { strict: true, _marker: PhantomData }
    }

    /// Unknown properties are used as they are.
    pub fn relaxed() -> Self {
        TypeBasedContext { strict: false, _marker: PhantomData }
    }

    /// Whether unknown properties are errors.
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// Maps the field names of a criteria document against a property table.
///
/// Branches of `$and`, `$or` and `$nor` and the bodies of `$elemMatch` and
/// `$not` are mapped too. Conditions on an embedded document are mapped
/// against its own table, so `{ "items": { "$elemMatch": { "qty": .. } } }`
/// renames `qty` as a property of the items. Names that can't be resolved
/// are kept and logged.
fn map_criteria(properties: &[Property], document: Document, owner: &str) -> Document {
    document
        .into_iter()
        .map(|(key, value)| match key.as_str() {
            "$and" | "$or" | "$nor" => {
                let value = map_branches(properties, value, owner);
                (key, value)
            }
            "$elemMatch" | "$not" => {
                let value = map_embedded(Some(properties), value, owner);
                (key, value)
            }
            _ if key.starts_with('$') => (key, value),
            _ => match resolve_in(properties, &key, true) {
                Ok(path) => {
                    let value = map_embedded(nested_in(properties, &key), value, owner);
                    (path, value)
                }
                Err(error) => {
                    warn!(key = %key, type_name = owner, %error, "criteria key left unmapped");
                    (key, value)
                }
            },
        })
        .collect()
}

/// Maps a condition document, if there is a table to map it against.
fn map_embedded(properties: Option<&[Property]>, value: Bson, owner: &str) -> Bson {
    match (properties, value) {
        (Some(properties), Bson::Document(doc)) => Bson::Document(map_criteria(properties, doc, owner)),
        (_, value) => value,
    }
}

fn map_branches(properties: &[Property], value: Bson, owner: &str) -> Bson {
    match value {
        Bson::Array(items) => items
            .into_iter()
            .map(|item| map_embedded(Some(properties), item, owner))
            .collect::<Vec<_>>()
            .into(),
        other => other,
    }
}

impl<T: Mapped> Default for TypeBasedContext<T> {
    fn default() -> Self {
        Self::strict()
    }
}

impl<T> Clone for TypeBasedContext<T> {
    fn clone(&self) -> Self {
        TypeBasedContext { strict: self.strict, _marker: PhantomData }
    }
}

impl<T> fmt::Debug for TypeBasedContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TypeBasedContext")
            .field("type", &type_name::<T>())
            .field("strict", &self.strict)
            .finish()
    }
}

impl<T: Mapped> AggregationOperationContext for TypeBasedContext<T> {
    fn get_reference(&self, field: &Field) -> Result<FieldReference> {
        if let Some(var) = preflight(field)? {
            return Ok(var);
        }

        let path = T::resolve_path(field.target(), self.strict)?;
        trace!(property = field.target(), path = %path, type_name = type_name::<T>(), "resolved property");

        Ok(FieldReference::direct(field.name(), path))
    }

    fn get_mapped_object(&self, document: Document) -> Result<Document> {
        Ok(map_criteria(T::properties(), document, type_name::<T>()))
    }
}

#[cfg(test)]
mod tests {
    use bson::{ Bson, doc };
    use crate::fields::Fields;
    use crate::mapping::Property;
    use super::*;

    struct Order;

    impl Mapped for Order {
        fn properties() -> &'static [Property] {
            static PROPERTIES: &[Property] = &[
                Property::new("customer_id", "cust"),
                Property::new("amount", "amt"),
            ];
            PROPERTIES
        }
    }

    fn grouped(names: &[&str]) -> ExposedFields {
        ExposedFields::non_synthetic(Fields::from_names(names.iter().copied()))
            .and(ExposedField::new("total", true))
    }

    #[test]
    fn single_group_id_resolves_to_id() {
        let ctx = ExposedFieldsContext::new(grouped(&["state"]), Rc::new(NoOpContext));
        let reference = ctx.get_reference_by_name("state").unwrap();

        assert_eq!(reference.raw(), "_id");
        assert_eq!(reference.reference_value(), Bson::from("$_id"));
        assert_eq!(ctx.get_reference_by_name("state.code").unwrap().raw(), "_id.code");
    }

    #[test]
    fn compound_group_id_resolves_below_id() {
        let ctx = ExposedFieldsContext::new(grouped(&["state", "city"]), Rc::new(NoOpContext));

        assert_eq!(ctx.get_reference_by_name("city").unwrap().raw(), "_id.city");
        assert_eq!(ctx.get_reference_by_name("total").unwrap().raw(), "total");
        assert_eq!(ctx.get_reference_by_name("_id").unwrap().raw(), "_id");
    }

    #[test]
    fn inheriting_context_falls_back() {
        let root: Rc<dyn AggregationOperationContext> = Rc::new(TypeBasedContext::<Order>::strict());
        let ctx = ExposedFieldsContext::inheriting(grouped(&[]), root);

        assert_eq!(ctx.get_reference_by_name("amount").unwrap().raw(), "amt");
        assert_eq!(ctx.get_reference_by_name("total").unwrap().raw(), "total");
        assert_eq!(
            ctx.get_reference_by_name("nope").unwrap_err().kind(),
            ErrorKind::UnknownProperty
        );
    }

    #[test]
    fn variables_bypass_resolution() {
        let ctx = ExposedFieldsContext::new(ExposedFields::empty(), Rc::new(NoOpContext));
        let reference = ctx.get_reference_by_name("$$ROOT.amount").unwrap();

        assert!(reference.is_variable());
        assert_eq!(reference.to_bson(), Bson::from("$$ROOT.amount"));
    }

    #[test]
    fn variable_scope_shadows_parent() {
        let root = TypeBasedContext::<Order>::strict();
        let scope = VariableScopeContext::new(vec!["item"], &root);

        assert_eq!(scope.get_reference_by_name("item.amount").unwrap().to_bson(),
                   Bson::from("$$item.amount"));
        assert_eq!(scope.get_reference_by_name("amount").unwrap().to_bson(),
                   Bson::from("$amt"));
    }

    #[test]
    fn criteria_keys_are_mapped_recursively() {
        let ctx = TypeBasedContext::<Order>::strict();
        let mapped = ctx.get_mapped_object(doc! {
            "customer_id": 7,
            "$or": [ { "amount": { "$gt": 10 } }, { "unknown": true } ],
            "$expr": { "$eq": ["$a", "$b"] },
        }).unwrap();

        assert_eq!(mapped, doc! {
            "cust": 7,
            "$or": [ { "amt": { "$gt": 10 } }, { "unknown": true } ],
            "$expr": { "$eq": ["$a", "$b"] },
        });
    }

    #[test]
    fn empty_field_is_rejected_everywhere() {
        let field = Field::new("");

        assert_eq!(NoOpContext.get_reference(&field).unwrap_err().kind(), ErrorKind::InvalidField);
        assert_eq!(
            TypeBasedContext::<Order>::relaxed().get_reference(&field).unwrap_err().kind(),
            ErrorKind::InvalidField
        );
    }
}
