//! Field names, the fields a pipeline stage exposes to its successor, and the
//! references that field names resolve to while a pipeline is rendered.

use std::fmt;
use std::slice;
use std::vec;
use std::iter::FromIterator;
use bson::Bson;
use crate::error::{ Error, ErrorKind, Result };

/// The name of the primary key field.
pub const ID: &str = "_id";

/// A named field, optionally aliasing another document path.
///
/// ```
/// # use papaya::fields::Field;
/// #
/// let plain = Field::new("$price");
/// assert_eq!(plain.name(), "price");
/// assert_eq!(plain.target(), "price");
/// assert!(!plain.is_aliased());
///
/// let nested = Field::new("address.city");
/// assert_eq!(nested.name(), "city");
/// assert_eq!(nested.target(), "address.city");
///
/// let alias = Field::aliased("total", "amount");
/// assert!(alias.is_aliased());
///
/// let var = Field::new("$$item.qty");
/// assert!(var.is_variable());
/// assert_eq!(var.name(), "$$item.qty");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// The name under which the field is exposed.
    name: String,
    /// The document path the field's value is read from.
    target: String,
}

impl Field {
    /// Creates a field from a possibly `$`-prefixed name or dotted path.
    pub fn new<S: Into<String>>(name: S) -> Self {
        let name = name.into();

        if name.starts_with("$$") {
            return Field { target: name.clone(), name };
        }

        let path = clean_up(&name).to_owned();

        match path.find('.') {
            Some(dot) => Field { name: path[dot + 1..].to_owned(), target: path },
            None => Field { name: path.clone(), target: path },
        }
    }

    /// Creates a field exposed as `name` that reads the path `target`.
    pub fn aliased<N, T>(name: N, target: T) -> Self
        where N: Into<String>,
              T: Into<String>
    {
        let name = name.into();
        let target = target.into();
        let target = if target.starts_with("$$") {
            target
        } else {
            clean_up(&target).to_owned()
        };

        Field { name: clean_up(&name).to_owned(), target }
    }

    /// The exposed name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The path being read.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether the exposed name differs from the path being read.
    pub fn is_aliased(&self) -> bool {
        self.name != self.target
    }

    /// Whether this field refers to a `$$variable` rather than a document path.
    pub fn is_variable(&self) -> bool {
        self.target.starts_with("$$")
    }

    /// Ensures that the field has a usable name.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.target.is_empty() {
            Err(Error::new(ErrorKind::InvalidField, "field name must not be empty"))
        } else {
            Ok(())
        }
    }
}

/// Strips everything up to and including the last `$`.
fn clean_up(name: &str) -> &str {
    match name.rfind('$') {
        Some(index) => &name[index + 1..],
        None => name,
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Field::new(name)
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Field::new(name)
    }
}

impl From<&Field> for Field {
    fn from(field: &Field) -> Self {
        field.clone()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_aliased() {
            write!(f, "{} ({})", self.name, self.target)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// An ordered collection of uniquely-named fields.
///
/// ```
/// # use papaya::fields::{ Field, Fields };
/// # use papaya::error::ErrorKind;
/// #
/// let fields = Fields::from_names(vec!["a", "b"]).and(Field::aliased("a", "c"));
/// let names: Vec<_> = fields.iter().map(Field::target).collect();
/// assert_eq!(names, ["c", "b"]);
///
/// let err = fields.try_and(Field::new("b")).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::InvalidField);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<Field>);

impl Fields {
    /// No fields.
    pub fn empty() -> Self {
        Fields(Vec::new())
    }

    /// Creates fields from plain names. Later duplicates replace earlier ones.
    pub fn from_names<I>(names: I) -> Self
        where I: IntoIterator,
              I::Item: Into<String>
    {
        names.into_iter().map(Field::new).collect()
    }

    /// Adds a field, replacing any existing field of the same name.
    pub fn and<F: Into<Field>>(mut self, field: F) -> Self {
        let field = field.into();

        match self.0.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.0.push(field),
        }

        self
    }

    /// Adds a field, failing if one with the same name is already present.
    pub fn try_and<F: Into<Field>>(mut self, field: F) -> Result<Self> {
        let field = field.into();

        if self.get(&field.name).is_some() {
            return Err(Error::new(
                ErrorKind::InvalidField,
                format!("found field with the same name twice: '{}'", field.name)
            ));
        }

        self.0.push(field);
        Ok(self)
    }

    /// Looks up a field by its exposed name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.iter().find(|f| f.name == name)
    }

    /// Iterates over the fields in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, Field> {
        self.0.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Field> for Fields {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        iter.into_iter().fold(Fields::empty(), Fields::and)
    }
}

impl IntoIterator for Fields {
    type Item = Field;
    type IntoIter = vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = &'a Field;
    type IntoIter = slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A field made visible to the next pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposedField {
    /// The underlying field.
    field: Field,
    /// Whether the stage itself produced the field. Non-synthetic fields are
    /// group identifiers and live under `_id`.
    synthetic: bool,
}

impl ExposedField {
    /// Exposes `field`.
    pub fn new<F: Into<Field>>(field: F, synthetic: bool) -> Self {
        ExposedField { field: field.into(), synthetic }
    }

    /// The underlying field.
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// The exposed name.
    pub fn name(&self) -> &str {
        self.field.name()
    }

    /// The target path.
    pub fn target(&self) -> &str {
        self.field.target()
    }

    /// Whether the stage produced this field itself.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Whether `name` refers to this field.
    pub fn can_be_referred_to_by(&self, name: &str) -> bool {
        self.name() == name || self.target() == name
    }
}

/// The set of fields a stage exposes.
///
/// ```
/// # use papaya::fields::{ ExposedFields, Fields };
/// #
/// let exposed = ExposedFields::non_synthetic(Fields::from_names(vec!["city"]))
///     .and_all(ExposedFields::synthetic(Fields::from_names(vec!["total"])));
///
/// assert!(exposed.exposes_single_non_synthetic_field_only());
/// assert!(exposed.get("total").unwrap().is_synthetic());
/// assert!(exposed.get("state").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExposedFields(Vec<ExposedField>);

impl ExposedFields {
    /// Exposes nothing.
    pub fn empty() -> Self {
        ExposedFields(Vec::new())
    }

    /// Exposes the given fields as produced by the stage.
    pub fn synthetic(fields: Fields) -> Self {
        Self::from_fields(fields, true)
    }

    /// Exposes the given fields as group identifiers.
    pub fn non_synthetic(fields: Fields) -> Self {
        Self::from_fields(fields, false)
    }

    /// Exposes a single field.
    pub fn from_field(field: ExposedField) -> Self {
        ExposedFields(vec![field])
    }

    fn from_fields(fields: Fields, synthetic: bool) -> Self {
        ExposedFields(
            fields.into_iter().map(|f| ExposedField::new(f, synthetic)).collect()
        )
    }

    /// Adds a field, replacing any field with the same exposed name.
    pub fn and(mut self, field: ExposedField) -> Self {
        match self.0.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => *existing = field,
            None => self.0.push(field),
        }

        self
    }

    /// Adds all fields of `other`.
    pub fn and_all(self, other: ExposedFields) -> Self {
        other.0.into_iter().fold(self, ExposedFields::and)
    }

    /// Looks up a field by its exposed name or target path.
    pub fn get(&self, name: &str) -> Option<&ExposedField> {
        self.0
            .iter()
            .find(|f| f.name() == name)
            .or_else(|| self.0.iter().find(|f| f.can_be_referred_to_by(name)))
    }

    /// Whether no fields at all are exposed.
    pub fn exposes_no_fields(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether exactly one group identifier field is exposed, in which case
    /// it lives directly under `_id`.
    pub fn exposes_single_non_synthetic_field_only(&self) -> bool {
        self.0.iter().filter(|f| !f.synthetic).count() == 1
    }

    /// Iterates over the exposed fields in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, ExposedField> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ExposedFields {
    type Item = &'a ExposedField;
    type IntoIter = slice::Iter<'a, ExposedField>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Whether a reference points into the document or at a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// A document path, rendered as `"$path"`.
    Direct,
    /// A variable, rendered as `"$$name"`.
    Variable,
}

/// The result of resolving a field in an operation context.
///
/// ```
/// # use bson::Bson;
/// # use papaya::fields::FieldReference;
/// #
/// let plain = FieldReference::direct("qty", "qty");
/// assert_eq!(plain.to_bson(), Bson::from("$qty"));
/// assert_eq!(plain.reference_value(), Bson::Int32(1));
///
/// let grouped = FieldReference::direct("city", "_id.city");
/// assert_eq!(grouped.reference_value(), Bson::from("$_id.city"));
///
/// let var = FieldReference::variable("this.qty");
/// assert_eq!(var.to_bson(), Bson::from("$$this.qty"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldReference {
    kind: ReferenceKind,
    name: String,
    raw: String,
}

impl FieldReference {
    /// A reference to the document path `raw`, exposed as `name`.
    pub fn direct<N, R>(name: N, raw: R) -> Self
        where N: Into<String>,
              R: Into<String>
    {
        FieldReference {
            kind: ReferenceKind::Direct,
            name: name.into(),
            raw: raw.into(),
        }
    }

    /// A reference to a variable, given without its `$$` prefix.
    pub fn variable<R: Into<String>>(raw: R) -> Self {
        let raw = raw.into();
        let raw = raw.trim_start_matches('$').to_owned();

        FieldReference {
            kind: ReferenceKind::Variable,
            name: raw.clone(),
            raw,
        }
    }

    /// Direct or variable.
    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// Whether this reference points at a variable.
    pub fn is_variable(&self) -> bool {
        self.kind == ReferenceKind::Variable
    }

    /// The name the referenced field is exposed as.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved path, without any `$` prefix.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Appends `.rest` to the resolved path.
    pub fn nested(&self, rest: &str) -> Self {
        FieldReference {
            kind: self.kind,
            name: format!("{}.{}", self.name, rest),
            raw: format!("{}.{}", self.raw, rest),
        }
    }

    /// The `$`-prefixed path.
    pub fn to_bson(&self) -> Bson {
        Bson::String(self.to_string())
    }

    /// The value to use in a `$project` stage: `1` for a plain inclusion,
    /// the `$`-prefixed path otherwise.
    pub fn reference_value(&self) -> Bson {
        if self.kind == ReferenceKind::Direct && self.name == self.raw {
            Bson::Int32(1)
        } else {
            self.to_bson()
        }
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ReferenceKind::Direct => write!(f, "${}", self.raw),
            ReferenceKind::Variable => write!(f, "$${}", self.raw),
        }
    }
}

/// A `$$name[.path]` reference. Variables are never resolved through an
/// operation context.
///
/// ```
/// # use bson::Bson;
/// # use papaya::fields::{ Variable, SystemVariable };
/// #
/// assert_eq!(Variable::this().path("qty").to_bson(), Bson::from("$$this.qty"));
/// assert_eq!(Variable::from(SystemVariable::Root).to_bson(), Bson::from("$$ROOT"));
/// assert_eq!(Variable::named("$$total").name(), "total");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: String,
}

impl Variable {
    /// A user-defined variable, with or without the `$$` prefix.
    pub fn named<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        Variable { name: name.trim_start_matches('$').to_owned() }
    }

    /// The element variable of `$map` and `$filter`, and the current element
    /// of `$reduce`.
    pub fn this() -> Self {
        Variable::named("this")
    }

    /// The accumulator variable of `$reduce`.
    pub fn value() -> Self {
        Variable::named("value")
    }

    /// A path below this variable.
    pub fn path(&self, sub: &str) -> Self {
        Variable { name: format!("{}.{}", self.name, sub) }
    }

    /// The variable name, including any path, without the `$$` prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable name without any path.
    pub fn head(&self) -> &str {
        self.name.split('.').next().unwrap_or_default()
    }

    /// The `$$`-prefixed form.
    pub fn to_bson(&self) -> Bson {
        Bson::String(self.to_string())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "$${}", self.name)
    }
}

/// Variables defined by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemVariable {
    /// The root document being processed.
    Root,
    /// The start of the current field path, `$$ROOT` unless rebound.
    Current,
    /// Evaluates to a missing value, used to conditionally exclude fields.
    Remove,
    /// `$redact`: descend into embedded documents.
    Descend,
    /// `$redact`: exclude the current document or embedded document.
    Prune,
    /// `$redact`: keep the current document or embedded document.
    Keep,
    /// The current datetime.
    Now,
    /// The current timestamp of a replica set or sharded cluster.
    ClusterTime,
    /// Metadata of an Atlas Search query.
    SearchMeta,
}

impl SystemVariable {
    /// The variable name without the `$$` prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            SystemVariable::Root        => "ROOT",
            SystemVariable::Current     => "CURRENT",
            SystemVariable::Remove      => "REMOVE",
            SystemVariable::Descend     => "DESCEND",
            SystemVariable::Prune       => "PRUNE",
            SystemVariable::Keep        => "KEEP",
            SystemVariable::Now         => "NOW",
            SystemVariable::ClusterTime => "CLUSTER_TIME",
            SystemVariable::SearchMeta  => "SEARCH_META",
        }
    }
}

impl From<SystemVariable> for Variable {
    fn from(var: SystemVariable) -> Self {
        Variable::named(var.as_str())
    }
}

impl fmt::Display for SystemVariable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "$${}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_prefix_is_stripped_up_to_the_last_dollar() {
        assert_eq!(Field::new("$$$a").name(), "$$$a");
        assert_eq!(Field::new("x$y").target(), "y");
        assert_eq!(Field::aliased("$n", "$t").target(), "t");
    }

    #[test]
    fn empty_field_fails_validation() {
        let err = Field::new("").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidField);
        assert!(Field::new("a").validate().is_ok());
    }

    #[test]
    fn exposed_field_lookup_by_target() {
        let exposed = ExposedFields::synthetic(
            Fields::empty().and(Field::aliased("total", "amount"))
        );

        assert_eq!(exposed.get("amount").map(ExposedField::name), Some("total"));
        assert!(!exposed.exposes_no_fields());
        assert!(!exposed.exposes_single_non_synthetic_field_only());
    }

    #[test]
    fn nested_reference() {
        let head = FieldReference::direct("city", "_id");
        let nested = head.nested("zip");

        assert_eq!(nested.raw(), "_id.zip");
        assert_eq!(nested.to_bson(), Bson::from("$_id.zip"));
    }
}
