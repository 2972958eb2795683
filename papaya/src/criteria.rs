//! Query criteria for `$match`, built fluently instead of as raw documents.
//!
//! ```
//! # use bson::doc;
//! # use papaya::criteria::Criteria;
//! # use papaya::literal::{ BsonType, RegexOpts };
//! #
//! let criteria = Criteria::where_("status").is("A")
//!     .and("qty").gte(10).lt(100)
//!     .and("name").regex("^ab", RegexOpts::IGNORE_CASE)
//!     .and("tags").not().size(0)
//!     .and("sku").type_(BsonType::STRING);
//!
//! assert_eq!(criteria.to_document().unwrap(), doc! {
//!     "status": "A",
//!     "qty": { "$gte": 10, "$lt": 100 },
//!     "name": { "$regex": "^ab", "$options": "i" },
//!     "tags": { "$not": { "$size": 0_i64 } },
//!     "sku": { "$type": "string" },
//! });
//! ```

use bson::{ Bson, Document };
use crate::literal::{ BsonType, RegexOpts };
use crate::error::{ Error, ErrorKind, Result };

/// The value of a query operator.
#[derive(Debug, Clone)]
enum OpValue {
    /// A plain value.
    Value(Bson),
    /// Nested criteria, e.g. for `$elemMatch`.
    Criteria(Box<Criteria>),
}

impl OpValue {
    fn to_bson(&self) -> Result<Bson> {
        match *self {
            OpValue::Value(ref value) => Ok(value.clone()),
            OpValue::Criteria(ref criteria) => criteria.to_document().map(Bson::Document),
        }
    }
}

/// The conditions on a single key.
#[derive(Debug, Clone)]
struct KeyCriteria {
    key: String,
    is_value: Option<Bson>,
    /// Operators, each optionally negated with `$not`.
    operators: Vec<(bool, &'static str, OpValue)>,
}

/// One element of the criteria chain.
#[derive(Debug, Clone)]
enum Entry {
    /// Conditions on a key.
    Key(KeyCriteria),
    /// `$and`, `$or` or `$nor` of other criteria.
    Combinator(&'static str, Vec<Criteria>),
}

/// A chain of conditions, rendered as one query document.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    entries: Vec<Entry>,
    negate_next: bool,
    misuse: Option<String>,
}

impl Criteria {
    /// Criteria without any condition, typically used with the combinators.
    pub fn new() -> Self {
        Criteria::default()
    }

    /// Starts a condition on the property path `key`.
    pub fn where_<S: Into<String>>(key: S) -> Self {
        Criteria::new().and(key)
    }

    /// Starts a condition on another key.
    pub fn and<S: Into<String>>(mut self, key: S) -> Self {
        self.entries.push(Entry::Key(KeyCriteria {
            key: key.into(),
            is_value: None,
            operators: Vec::new(),
        }));
        self.negate_next = false;
        self
    }

    /// Records the first misuse, reported when rendering.
    fn misuse(mut self, message: String) -> Self {
        if self.misuse.is_none() {
            self.misuse = Some(message);
        }
        self
    }

    /// Equality with `value`.
    pub fn is<V: Into<Bson>>(mut self, value: V) -> Self {
        let message = match self.entries.last_mut() {
            Some(Entry::Key(key)) if self.negate_next => {
                format!("can't negate equality on '{}'; use `ne` instead", key.key)
            }
            Some(Entry::Key(key)) => {
                if key.is_value.is_some() {
                    format!("multiple equality conditions on '{}'", key.key)
                } else {
                    key.is_value = Some(value.into());
                    return self;
                }
            }
            _ => String::from("equality condition without a key"),
        };

        self.misuse(message)
    }

    fn operator(mut self, op: &'static str, value: OpValue) -> Self {
        let negated = self.negate_next;
        self.negate_next = false;

        match self.entries.last_mut() {
            Some(Entry::Key(key)) => {
                key.operators.retain(|&(n, o, _)| n != negated || o != op);
                key.operators.push((negated, op, value));
                self
            }
            _ => self.misuse(format!("operator {} without a key", op)),
        }
    }

    fn value_op<V: Into<Bson>>(self, op: &'static str, value: V) -> Self {
        self.operator(op, OpValue::Value(value.into()))
    }

    /// Negates the next operator with `$not`.
    pub fn not(mut self) -> Self {
        self.negate_next = true;
        self
    }

    /// `$ne`
    pub fn ne<V: Into<Bson>>(self, value: V) -> Self {
        self.value_op("$ne", value)
    }

    /// `$gt`
    pub fn gt<V: Into<Bson>>(self, value: V) -> Self {
        self.value_op("$gt", value)
    }

    /// `$gte`
    pub fn gte<V: Into<Bson>>(self, value: V) -> Self {
        self.value_op("$gte", value)
    }

    /// `$lt`
    pub fn lt<V: Into<Bson>>(self, value: V) -> Self {
        self.value_op("$lt", value)
    }

    /// `$lte`
    pub fn lte<V: Into<Bson>>(self, value: V) -> Self {
        self.value_op("$lte", value)
    }

    /// `$in`
    pub fn in_<I>(self, values: I) -> Self
        where I: IntoIterator,
              I::Item: Into<Bson>
    {
        self.value_op("$in", collect_array(values))
    }

    /// `$nin`
    pub fn nin<I>(self, values: I) -> Self
        where I: IntoIterator,
              I::Item: Into<Bson>
    {
        self.value_op("$nin", collect_array(values))
    }

    /// `$all`
    pub fn all<I>(self, values: I) -> Self
        where I: IntoIterator,
              I::Item: Into<Bson>
    {
        self.value_op("$all", collect_array(values))
    }

    /// `$exists`
    pub fn exists(self, exists: bool) -> Self {
        self.value_op("$exists", exists)
    }

    /// `$type`
    pub fn type_(self, bson_type: BsonType) -> Self {
        if bson_type.is_empty() {
            return self.misuse(String::from("$type needs at least one type"));
        }
        self.value_op("$type", bson_type)
    }

    /// `$size`
    pub fn size(self, size: u32) -> Self {
        self.value_op("$size", Bson::Int64(i64::from(size)))
    }

    /// `$regex`, with `$options` if any are set.
    pub fn regex(self, pattern: &str, options: RegexOpts) -> Self {
        let mut doc = Document::new();
        doc.insert("$regex", pattern);

        if !options.is_empty() {
            doc.insert("$options", options);
        }

        self.operator("$regex", OpValue::Value(Bson::Document(doc)))
    }

    /// `$elemMatch`
    pub fn elem_match(self, criteria: Criteria) -> Self {
        self.operator("$elemMatch", OpValue::Criteria(Box::new(criteria)))
    }

    /// `$and` of `criteria`.
    pub fn and_operator<I: IntoIterator<Item = Criteria>>(self, criteria: I) -> Self {
        self.combinator("$and", criteria)
    }

    /// `$or` of `criteria`.
    pub fn or_operator<I: IntoIterator<Item = Criteria>>(self, criteria: I) -> Self {
        self.combinator("$or", criteria)
    }

    /// `$nor` of `criteria`.
    pub fn nor_operator<I: IntoIterator<Item = Criteria>>(mut self, criteria: I) -> Self {
        self.negate_next = false;
        self.combinator("$nor", criteria)
    }

    fn combinator<I>(mut self, op: &'static str, criteria: I) -> Self
        where I: IntoIterator<Item = Criteria>
    {
        self.entries.push(Entry::Combinator(op, criteria.into_iter().collect()));
        self
    }

    /// Renders the query document. Fails with `InvalidStage` if the chain
    /// was misused or declares the same key twice.
    pub fn to_document(&self) -> Result<Document> {
        if let Some(ref message) = self.misuse {
            return Err(Error::new(ErrorKind::InvalidStage, message.clone()));
        }

        let mut doc = Document::new();

        for entry in &self.entries {
            let (key, value) = match *entry {
                Entry::Key(ref key) => (key.key.as_str(), key_value(key)?),
                Entry::Combinator(op, ref criteria) => {
                    let items = criteria
                        .iter()
                        .map(|c| c.to_document().map(Bson::Document))
                        .collect::<Result<Vec<_>>>()?;
                    (op, Bson::Array(items))
                }
            };

            if doc.contains_key(key) {
                return Err(Error::new(
                    ErrorKind::InvalidStage,
                    format!("criteria declare '{}' twice; combine them with `and_operator`", key)
                ));
            }

            doc.insert(key, value);
        }

        Ok(doc)
    }
}

fn collect_array<I>(values: I) -> Bson
    where I: IntoIterator,
          I::Item: Into<Bson>
{
    Bson::Array(values.into_iter().map(Into::into).collect())
}

/// The condition document (or equality value) for one key.
fn key_value(key: &KeyCriteria) -> Result<Bson> {
    match key.is_value {
        Some(ref value) if key.operators.is_empty() => return Ok(value.clone()),
        Some(_) => return Err(Error::new(
            ErrorKind::InvalidStage,
            format!("can't combine equality with operators on '{}'", key.key)
        )),
        None if key.operators.is_empty() => return Err(Error::new(
            ErrorKind::InvalidStage,
            format!("no condition for '{}'", key.key)
        )),
        None => {}
    }

    let mut doc = Document::new();
    let mut negated = Document::new();

    for &(negate, op, ref value) in &key.operators {
        let target = if negate { &mut negated } else { &mut doc };

        match value.to_bson()? {
            // `$regex` carries its `$options` along
            Bson::Document(parts) if op == "$regex" => {
                for (k, v) in parts {
                    target.insert(k, v);
                }
            }
            value => {
                target.insert(op, value);
            }
        }
    }

    if !negated.is_empty() {
        doc.insert("$not", negated);
    }

    Ok(Bson::Document(doc))
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use super::*;

    #[test]
    fn or_operator_with_nested_criteria() {
        let criteria = Criteria::new().or_operator(vec![
            Criteria::where_("a").is(1),
            Criteria::where_("b").in_(vec!["x", "y"]),
        ]);

        assert_eq!(criteria.to_document().unwrap(), doc! {
            "$or": [ { "a": 1 }, { "b": { "$in": ["x", "y"] } } ],
        });
    }

    #[test]
    fn elem_match_and_exists() {
        let criteria = Criteria::where_("results")
            .elem_match(Criteria::where_("product").is("xyz").and("score").gte(8))
            .and("deleted").exists(false);

        assert_eq!(criteria.to_document().unwrap(), doc! {
            "results": { "$elemMatch": { "product": "xyz", "score": { "$gte": 8 } } },
            "deleted": { "$exists": false },
        });
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = Criteria::where_("a").gt(1).and("a").lt(5).to_document().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);
    }

    #[test]
    fn equality_mixed_with_operators_is_rejected() {
        let err = Criteria::where_("a").is(1).gt(0).to_document().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);

        let err = Criteria::new().gt(0).to_document().unwrap_err();
        assert!(err.message().contains("without a key"));

        let err = Criteria::where_("a").to_document().unwrap_err();
        assert!(err.message().contains("no condition"));
    }

    #[test]
    fn not_regex_without_options() {
        let criteria = Criteria::where_("name").not().regex("^x", RegexOpts::empty());
        assert_eq!(criteria.to_document().unwrap(), doc! {
            "name": { "$not": { "$regex": "^x" } },
        });
    }
}
