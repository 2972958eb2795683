//! `$out` and `$merge`, the stages writing the results into a collection.
//! Both must be the last stage of a pipeline.

use bson::{ Bson, Document };
use crate::context::{ AggregationOperationContext, NoOpContext };
use crate::expr::Operand;
use crate::pipeline::Pipeline;
use crate::error::{ Error, ErrorKind, Result };
use super::{ AggregationOperation, Exposure, render_entries, stage_document };

/// `"collection"` or `{ db, coll }`.
fn target_namespace(database: Option<&str>, collection: &str) -> Bson {
    match database {
        None => Bson::String(collection.to_owned()),
        Some(db) => {
            let mut doc = Document::new();
            doc.insert("db", db);
            doc.insert("coll", collection);
            Bson::Document(doc)
        }
    }
}

fn check_collection(operator: &str, collection: &str) -> Result<()> {
    if collection.is_empty() || collection.starts_with('$') || collection.starts_with("system.") {
        Err(Error::new(
            ErrorKind::InvalidStage,
            format!("{}: invalid collection name '{}'", operator, collection)
        ))
    } else {
        Ok(())
    }
}

/// Replaces a collection with the results.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::stage::{ AggregationOperation, OutOperation };
/// #
/// assert_eq!(OutOperation::new("totals").to_document(&NoOpContext).unwrap(), doc! {
///     "$out": "totals",
/// });
/// assert_eq!(OutOperation::new("totals").in_database("reports").to_document(&NoOpContext).unwrap(), doc! {
///     "$out": { "db": "reports", "coll": "totals" },
/// });
/// ```
#[derive(Debug, Clone)]
pub struct OutOperation {
    collection: String,
    database: Option<String>,
}

impl OutOperation {
    /// `$out` into `collection` of the same database.
    pub fn new(collection: &str) -> Self {
        OutOperation {
            collection: collection.to_owned(),
            database: None,
        }
    }

    /// Writes into another database.
    pub fn in_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_owned());
        self
    }
}

impl AggregationOperation for OutOperation {
    fn operator(&self) -> &'static str {
        "$out"
    }

    fn to_document(&self, _: &dyn AggregationOperationContext) -> Result<Document> {
        check_collection(self.operator(), &self.collection)?;
        let target = target_namespace(self.database.as_deref(), &self.collection);
        Ok(stage_document(self.operator(), target))
    }

    fn exposure(&self) -> Exposure {
        Exposure::Reset
    }
}

/// What `$merge` does with a result that matches an existing document.
#[derive(Debug, Clone)]
pub enum WhenMatched {
    /// Replace the existing document.
    Replace,
    /// Keep the existing document.
    KeepExisting,
    /// Merge the two documents.
    Merge,
    /// Abort the aggregation.
    Fail,
    /// Update the existing document with a pipeline, in which `$$new` is
    /// the result document.
    Pipeline(Pipeline),
}

/// What `$merge` does with a result that matches no document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhenNotMatched {
    /// Insert the result.
    Insert,
    /// Drop the result.
    Discard,
    /// Abort the aggregation.
    Fail,
}

impl WhenNotMatched {
    /// The server's name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            WhenNotMatched::Insert  => "insert",
            WhenNotMatched::Discard => "discard",
            WhenNotMatched::Fail    => "fail",
        }
    }
}

/// Merges the results into a collection.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::stage::{ AggregationOperation, MergeOperation, WhenMatched, WhenNotMatched };
/// #
/// let merge = MergeOperation::into("monthly_totals")
///     .on(vec!["month", "region"])
///     .when_matched(WhenMatched::Replace)
///     .when_not_matched(WhenNotMatched::Insert);
///
/// assert_eq!(merge.to_document(&NoOpContext).unwrap(), doc! {
///     "$merge": {
///         "into": "monthly_totals",
///         "on": ["month", "region"],
///         "whenMatched": "replace",
///         "whenNotMatched": "insert",
///     }
/// });
/// ```
#[derive(Debug, Clone)]
pub struct MergeOperation {
    collection: String,
    database: Option<String>,
    on: Vec<String>,
    let_vars: Vec<(String, Operand)>,
    when_matched: Option<WhenMatched>,
    when_not_matched: Option<WhenNotMatched>,
}

impl MergeOperation {
    /// `$merge` into `collection` of the same database.
    pub fn into(collection: &str) -> Self {
        MergeOperation {
            collection: collection.to_owned(),
            database: None,
            on: Vec::new(),
            let_vars: Vec::new(),
            when_matched: None,
            when_not_matched: None,
        }
    }

    /// Writes into another database.
    pub fn in_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_owned());
        self
    }

    /// The fields identifying the matching document. Defaults to `_id`.
    pub fn on<I>(mut self, fields: I) -> Self
        where I: IntoIterator,
              I::Item: Into<String>
    {
        self.on = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Binds a variable for the `whenMatched` pipeline.
    pub fn let_var<O: Into<Operand>>(mut self, name: &str, value: O) -> Self {
        let name = name.trim_start_matches('$').to_owned();
        self.let_vars.retain(|(n, _)| *n != name);
        self.let_vars.push((name, value.into()));
        self
    }

    /// The action for matching documents.
    pub fn when_matched(mut self, action: WhenMatched) -> Self {
        self.when_matched = Some(action);
        self
    }

    /// The action for results without a matching document.
    pub fn when_not_matched(mut self, action: WhenNotMatched) -> Self {
        self.when_not_matched = Some(action);
        self
    }
}

impl AggregationOperation for MergeOperation {
    fn operator(&self) -> &'static str {
        "$merge"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let op = self.operator();
        check_collection(op, &self.collection)?;

        let mut body = Document::new();
        body.insert("into", target_namespace(self.database.as_deref(), &self.collection));

        match self.on.len() {
            0 => {}
            1 => { body.insert("on", self.on[0].as_str()); }
            _ => { body.insert("on", self.on.clone()); }
        }

        if !self.let_vars.is_empty() {
            match self.when_matched {
                Some(WhenMatched::Pipeline(_)) => {
                    body.insert("let", render_entries(ctx, &self.let_vars)?);
                }
                _ => return Err(Error::new(
                    ErrorKind::InvalidStage,
                    "$merge: variables are only allowed with a whenMatched pipeline"
                )),
            }
        }

        if let Some(ref action) = self.when_matched {
            let action = match *action {
                WhenMatched::Replace => Bson::from("replace"),
                WhenMatched::KeepExisting => Bson::from("keepExisting"),
                WhenMatched::Merge => Bson::from("merge"),
                WhenMatched::Fail => Bson::from("fail"),
                WhenMatched::Pipeline(ref pipeline) => Bson::Array(
                    pipeline
                        .render_in(&NoOpContext)?
                        .into_iter()
                        .map(Bson::Document)
                        .collect()
                ),
            };
            body.insert("whenMatched", action);
        }

        if let Some(action) = self.when_not_matched {
            body.insert("whenNotMatched", action.as_str());
        }

        Ok(stage_document(op, body))
    }

    fn exposure(&self) -> Exposure {
        Exposure::Reset
    }
}
