//! Stages that edit documents in place or replace them: `$addFields`,
//! `$set`, `$unset`, `$replaceRoot`, `$replaceWith` and `$redact`.

use bson::{ Bson, Document };
use crate::context::AggregationOperationContext;
use crate::expr::Operand;
use crate::fields::{ ExposedFields, Field, Fields };
use crate::error::{ Error, ErrorKind, Result };
use super::{ AggregationOperation, Exposure, render_entries, stage_document, validate_output_name };

/// Adds computed fields, keeping all others.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ Arithmetic, Operand };
/// # use papaya::stage::{ AggregationOperation, AddFieldsOperation };
/// #
/// let stage = AddFieldsOperation::set()
///     .add_field("total", Arithmetic::value_of("price").multiply("qty"))
///     .add_field("copy", "original")
///     .add_field("status", Operand::value("new"));
///
/// assert_eq!(stage.to_document(&NoOpContext).unwrap(), doc! {
///     "$set": { "total": { "$multiply": ["$price", "$qty"] }, "copy": "$original", "status": "new" },
/// });
/// ```
#[derive(Debug, Clone)]
pub struct AddFieldsOperation {
    operator: &'static str,
    fields: Vec<(String, Operand)>,
}

impl AddFieldsOperation {
    /// `$addFields`
    pub fn new() -> Self {
        AddFieldsOperation { operator: "$addFields", fields: Vec::new() }
    }

    /// `$set`, the alias of `$addFields`.
    pub fn set() -> Self {
        AddFieldsOperation { operator: "$set", fields: Vec::new() }
    }

    /// Adds (or overwrites) the field `name`. String operands are field
    /// references; use `Operand::value()` for string constants.
    pub fn add_field<O: Into<Operand>>(mut self, name: &str, value: O) -> Self {
        let value = value.into();

        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((name.to_owned(), value)),
        }

        self
    }
}

impl Default for AddFieldsOperation {
    fn default() -> Self {
        AddFieldsOperation::new()
    }
}

impl AggregationOperation for AddFieldsOperation {
    fn operator(&self) -> &'static str {
        self.operator
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        if self.fields.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidStage,
                format!("{} needs at least one field", self.operator)
            ));
        }

        for (name, _) in &self.fields {
            validate_output_name(self.operator, name)?;
        }

        Ok(stage_document(self.operator, render_entries(ctx, &self.fields)?))
    }

    fn exposure(&self) -> Exposure {
        let names = Fields::from_names(self.fields.iter().map(|(name, _)| name.as_str()));
        Exposure::Inherited(ExposedFields::synthetic(names))
    }
}

/// Removes fields.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::stage::{ self, AggregationOperation };
/// #
/// assert_eq!(stage::unset(vec!["isbn"]).to_document(&NoOpContext).unwrap(), doc! {
///     "$unset": "isbn",
/// });
/// assert_eq!(stage::unset(vec!["isbn", "copies.warehouse"]).to_document(&NoOpContext).unwrap(), doc! {
///     "$unset": ["isbn", "copies.warehouse"],
/// });
/// ```
#[derive(Debug, Clone)]
pub struct UnsetOperation {
    fields: Vec<String>,
}

impl UnsetOperation {
    /// Removes `fields`.
    pub fn new<I>(fields: I) -> Self
        where I: IntoIterator,
              I::Item: Into<String>
    {
        UnsetOperation {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl AggregationOperation for UnsetOperation {
    fn operator(&self) -> &'static str {
        "$unset"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let mut paths = self.fields
            .iter()
            .map(|name| {
                let reference = ctx.get_reference(&Field::new(name.as_str()))?;
                Ok(Bson::String(reference.raw().to_owned()))
            })
            .collect::<Result<Vec<_>>>()?;

        match paths.len() {
            0 => Err(Error::new(ErrorKind::InvalidStage, "$unset needs at least one field")),
            1 => Ok(stage_document(self.operator(), paths.remove(0))),
            _ => Ok(stage_document(self.operator(), paths)),
        }
    }
}

/// Replaces each document with an embedded document or a computed one.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::Objects;
/// # use papaya::stage::{ AggregationOperation, ReplaceRootOperation };
/// #
/// let root = ReplaceRootOperation::new("address");
/// assert_eq!(root.to_document(&NoOpContext).unwrap(), doc! {
///     "$replaceRoot": { "newRoot": "$address" },
/// });
///
/// let with = ReplaceRootOperation::replace_with(Objects::value_of("defaults").merge_with("$$ROOT"));
/// assert_eq!(with.to_document(&NoOpContext).unwrap(), doc! {
///     "$replaceWith": { "$mergeObjects": ["$defaults", "$$ROOT"] },
/// });
/// ```
#[derive(Debug, Clone)]
pub struct ReplaceRootOperation {
    new_root: Operand,
    short_form: bool,
}

impl ReplaceRootOperation {
    /// `$replaceRoot` with the document `new_root` evaluates to.
    pub fn new<O: Into<Operand>>(new_root: O) -> Self {
        ReplaceRootOperation { new_root: new_root.into(), short_form: false }
    }

    /// `$replaceWith`, the short form of `$replaceRoot`.
    pub fn replace_with<O: Into<Operand>>(new_root: O) -> Self {
        ReplaceRootOperation { new_root: new_root.into(), short_form: true }
    }
}

impl AggregationOperation for ReplaceRootOperation {
    fn operator(&self) -> &'static str {
        if self.short_form { "$replaceWith" } else { "$replaceRoot" }
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let new_root = self.new_root.render(ctx)?;

        if self.short_form {
            Ok(stage_document(self.operator(), new_root))
        } else {
            Ok(stage_document(self.operator(), stage_document("newRoot", new_root)))
        }
    }

    fn exposure(&self) -> Exposure {
        Exposure::Reset
    }
}

/// Restricts the content of documents, typically with a `$cond` yielding
/// `$$DESCEND`, `$$PRUNE` or `$$KEEP`.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ Comparison, Conditional };
/// # use papaya::fields::SystemVariable;
/// # use papaya::stage::{ AggregationOperation, RedactOperation };
/// #
/// let redact = RedactOperation::new(
///     Conditional::when(Comparison::value_of("level").lte(5))
///         .then(SystemVariable::Descend)
///         .otherwise(SystemVariable::Prune)
/// );
///
/// assert_eq!(redact.to_document(&NoOpContext).unwrap(), doc! {
///     "$redact": {
///         "$cond": { "if": { "$lte": ["$level", 5] }, "then": "$$DESCEND", "else": "$$PRUNE" },
///     }
/// });
/// ```
#[derive(Debug, Clone)]
pub struct RedactOperation(Operand);

impl RedactOperation {
    /// `$redact` by `expression`.
    pub fn new<O: Into<Operand>>(expression: O) -> Self {
        RedactOperation(expression.into())
    }
}

impl AggregationOperation for RedactOperation {
    fn operator(&self) -> &'static str {
        "$redact"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        Ok(stage_document(self.operator(), self.0.render(ctx)?))
    }
}

#[cfg(test)]
mod tests {
    use crate::context::NoOpContext;
    use super::*;

    #[test]
    fn empty_add_fields_fails() {
        let err = AddFieldsOperation::new().to_document(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);

        let err = AddFieldsOperation::new()
            .add_field("$bad", 1)
            .to_document(&NoOpContext)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);
    }

    #[test]
    fn empty_unset_fails() {
        let err = UnsetOperation::new(Vec::<String>::new()).to_document(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);
    }

    #[test]
    fn replace_root_resets_context() {
        match ReplaceRootOperation::new("a").exposure() {
            Exposure::Reset => {}
            other => panic!("unexpected exposure {:?}", other),
        }
    }
}
