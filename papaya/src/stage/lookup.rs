//! Stages reading other collections: `$lookup`, `$graphLookup` and
//! `$unionWith`.
//!
//! Fields of the foreign collection are not known to any context, so
//! foreign field names and sub-pipelines are rendered untyped.

use bson::{ Bson, Document };
use crate::context::{ AggregationOperationContext, NoOpContext };
use crate::criteria::Criteria;
use crate::expr::Operand;
use crate::fields::{ ExposedFields, Field, Fields };
use crate::pipeline::Pipeline;
use crate::error::{ Error, ErrorKind, Result };
use super::{ AggregationOperation, Exposure, count_value, render_entries, stage_document, validate_output_name };

/// Stages not allowed in the sub-pipeline of `$lookup` and `$unionWith`.
const FORBIDDEN_IN_SUBPIPELINE: &[&str] = &["$out", "$merge"];

fn render_subpipeline(operator: &str, pipeline: &Pipeline) -> Result<Bson> {
    if pipeline.contains_any(FORBIDDEN_IN_SUBPIPELINE) {
        return Err(Error::new(
            ErrorKind::InvalidStage,
            format!("{}: sub-pipeline can't contain $out or $merge", operator)
        ));
    }

    let stages = pipeline.render_in(&NoOpContext)?;
    Ok(Bson::Array(stages.into_iter().map(Bson::Document).collect()))
}

fn require<'a, T>(operator: &str, name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| Error::new(
        ErrorKind::InvalidStage,
        format!("{}: missing '{}'", operator, name)
    ))
}

/// Joins documents of another collection into an array field.
///
/// Either matches `localField` against `foreignField`, or runs a
/// sub-pipeline on the foreign collection, optionally with variables
/// computed from the local document.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ Comparison, Operand };
/// # use papaya::pipeline::Pipeline;
/// # use papaya::stage::{ self, AggregationOperation, LookupOperation };
/// #
/// let equality = stage::lookup("inventory", "item", "sku", "stock");
/// assert_eq!(equality.to_document(&NoOpContext).unwrap(), doc! {
///     "$lookup": {
///         "from": "inventory",
///         "localField": "item",
///         "foreignField": "sku",
///         "as": "stock",
///     }
/// });
///
/// let correlated = LookupOperation::from_collection("warehouses")
///     .let_var("wanted", Operand::from("qty"))
///     .pipeline(Pipeline::new().then(
///         stage::MatchOperation::expr(Comparison::value_of("instock").gte("$$wanted"))
///     ))
///     .as_("available");
///
/// assert_eq!(correlated.to_document(&NoOpContext).unwrap(), doc! {
///     "$lookup": {
///         "from": "warehouses",
///         "let": { "wanted": "$qty" },
///         "pipeline": [
///             { "$match": { "$expr": { "$gte": ["$instock", "$$wanted"] } } },
///         ],
///         "as": "available",
///     }
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct LookupOperation {
    from: String,
    local_field: Option<Field>,
    foreign_field: Option<String>,
    let_vars: Vec<(String, Operand)>,
    pipeline: Option<Pipeline>,
    as_: Option<String>,
}

impl LookupOperation {
    /// Joins from the collection `from`.
    pub fn from_collection(from: &str) -> Self {
        LookupOperation {
            from: from.to_owned(),
            ..LookupOperation::default()
        }
    }

    /// The local field matched against the foreign field.
    pub fn local_field<F: Into<Field>>(mut self, field: F) -> Self {
        self.local_field = Some(field.into());
        self
    }

    /// The field of the foreign documents matched against the local field.
    pub fn foreign_field(mut self, field: &str) -> Self {
        self.foreign_field = Some(field.trim_start_matches('$').to_owned());
        self
    }

    /// Binds a variable for the sub-pipeline.
    pub fn let_var<O: Into<Operand>>(mut self, name: &str, value: O) -> Self {
        let name = name.trim_start_matches('$').to_owned();
        self.let_vars.retain(|(n, _)| *n != name);
        self.let_vars.push((name, value.into()));
        self
    }

    /// The sub-pipeline run on the foreign collection.
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// The array field the joined documents are stored in.
    pub fn as_(mut self, name: &str) -> Self {
        self.as_ = Some(name.to_owned());
        self
    }
}

impl AggregationOperation for LookupOperation {
    fn operator(&self) -> &'static str {
        "$lookup"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let op = self.operator();
        let as_ = require(op, "as", &self.as_)?;
        validate_output_name(op, as_)?;

        if self.from.is_empty() {
            return Err(Error::new(ErrorKind::InvalidStage, "$lookup: missing 'from'"));
        }

        let equality = self.local_field.is_some() || self.foreign_field.is_some();

        if !equality && self.pipeline.is_none() {
            return Err(Error::new(
                ErrorKind::InvalidStage,
                "$lookup needs either localField and foreignField or a pipeline"
            ));
        }

        let mut body = Document::new();
        body.insert("from", self.from.as_str());

        if equality {
            let local = require(op, "localField", &self.local_field)?;
            let foreign = require(op, "foreignField", &self.foreign_field)?;

            body.insert("localField", ctx.get_reference(local)?.raw());
            body.insert("foreignField", foreign.as_str());
        }

        if !self.let_vars.is_empty() {
            body.insert("let", render_entries(ctx, &self.let_vars)?);
        }

        if let Some(ref pipeline) = self.pipeline {
            body.insert("pipeline", render_subpipeline(op, pipeline)?);
        }

        body.insert("as", as_.as_str());

        Ok(stage_document(op, body))
    }

    fn exposure(&self) -> Exposure {
        match self.as_ {
            Some(ref name) => Exposure::Inherited(
                ExposedFields::synthetic(Fields::from_names(vec![name.as_str()]))
            ),
            None => Exposure::Unchanged,
        }
    }
}

/// Recursively follows references between documents of a collection.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::criteria::Criteria;
/// # use papaya::stage::{ AggregationOperation, GraphLookupOperation };
/// #
/// let chain = GraphLookupOperation::from_collection("employees")
///     .start_with("reportsTo")
///     .connect_from("reportsTo")
///     .connect_to("name")
///     .max_depth(2)
///     .depth_field("level")
///     .restrict_search_with_match(Criteria::where_("active").is(true))
///     .as_("hierarchy");
///
/// assert_eq!(chain.to_document(&NoOpContext).unwrap(), doc! {
///     "$graphLookup": {
///         "from": "employees",
///         "startWith": "$reportsTo",
///         "connectFromField": "reportsTo",
///         "connectToField": "name",
///         "as": "hierarchy",
///         "maxDepth": 2_i64,
///         "depthField": "level",
///         "restrictSearchWithMatch": { "active": true },
///     }
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct GraphLookupOperation {
    from: String,
    start_with: Option<Operand>,
    connect_from: Option<String>,
    connect_to: Option<String>,
    as_: Option<String>,
    max_depth: Option<u64>,
    depth_field: Option<String>,
    restrict: Option<Criteria>,
}

impl GraphLookupOperation {
    /// Searches the collection `from`.
    pub fn from_collection(from: &str) -> Self {
        GraphLookupOperation {
            from: from.to_owned(),
            ..GraphLookupOperation::default()
        }
    }

    /// The value(s) the search starts with.
    pub fn start_with<O: Into<Operand>>(mut self, start: O) -> Self {
        self.start_with = Some(start.into());
        self
    }

    /// The foreign field whose value is followed.
    pub fn connect_from(mut self, field: &str) -> Self {
        self.connect_from = Some(field.to_owned());
        self
    }

    /// The foreign field matched against the followed value.
    pub fn connect_to(mut self, field: &str) -> Self {
        self.connect_to = Some(field.to_owned());
        self
    }

    /// The array field the found documents are stored in.
    pub fn as_(mut self, name: &str) -> Self {
        self.as_ = Some(name.to_owned());
        self
    }

    /// Maximum recursion depth, starting at 0.
    pub fn max_depth(mut self, depth: u64) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Stores the recursion depth of each found document in `field`.
    pub fn depth_field(mut self, field: &str) -> Self {
        self.depth_field = Some(field.to_owned());
        self
    }

    /// Only follows documents matching `criteria`.
    pub fn restrict_search_with_match(mut self, criteria: Criteria) -> Self {
        self.restrict = Some(criteria);
        self
    }
}

impl AggregationOperation for GraphLookupOperation {
    fn operator(&self) -> &'static str {
        "$graphLookup"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let op = self.operator();
        let start_with = require(op, "startWith", &self.start_with)?;
        let connect_from = require(op, "connectFromField", &self.connect_from)?;
        let connect_to = require(op, "connectToField", &self.connect_to)?;
        let as_ = require(op, "as", &self.as_)?;
        validate_output_name(op, as_)?;

        let mut body = Document::new();
        body.insert("from", self.from.as_str());
        body.insert("startWith", start_with.render(ctx)?);
        body.insert("connectFromField", connect_from.as_str());
        body.insert("connectToField", connect_to.as_str());
        body.insert("as", as_.as_str());

        if let Some(depth) = self.max_depth {
            body.insert("maxDepth", count_value(op, depth)?);
        }
        if let Some(ref field) = self.depth_field {
            body.insert("depthField", field.as_str());
        }
        if let Some(ref criteria) = self.restrict {
            body.insert("restrictSearchWithMatch", criteria.to_document()?);
        }

        Ok(stage_document(op, body))
    }

    fn exposure(&self) -> Exposure {
        match self.as_ {
            Some(ref name) => Exposure::Inherited(
                ExposedFields::synthetic(Fields::from_names(vec![name.as_str()]))
            ),
            None => Exposure::Unchanged,
        }
    }
}

/// Appends the documents of another collection, optionally processed by a
/// sub-pipeline.
#[derive(Debug, Clone)]
pub struct UnionWithOperation {
    collection: String,
    pipeline: Option<Pipeline>,
}

impl UnionWithOperation {
    /// `$unionWith` of all documents of `collection`.
    pub fn new(collection: &str) -> Self {
        UnionWithOperation {
            collection: collection.to_owned(),
            pipeline: None,
        }
    }

    /// Processes the documents of the other collection first.
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }
}

impl AggregationOperation for UnionWithOperation {
    fn operator(&self) -> &'static str {
        "$unionWith"
    }

    fn to_document(&self, _: &dyn AggregationOperationContext) -> Result<Document> {
        let op = self.operator();

        match self.pipeline {
            None => Ok(stage_document(op, self.collection.as_str())),
            Some(ref pipeline) => {
                let mut body = Document::new();
                body.insert("coll", self.collection.as_str());
                body.insert("pipeline", render_subpipeline(op, pipeline)?);
                Ok(stage_document(op, body))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::stage;
    use super::*;

    #[test]
    fn lookup_needs_a_join_condition() {
        let lookup = LookupOperation::from_collection("other").as_("joined");
        let err = lookup.to_document(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);

        let half = LookupOperation::from_collection("other").local_field("a").as_("joined");
        assert!(half.to_document(&NoOpContext).unwrap_err().message().contains("foreignField"));
    }

    #[test]
    fn subpipeline_can_not_write() {
        let union = UnionWithOperation::new("archive")
            .pipeline(Pipeline::new().then(stage::out("elsewhere")));

        let err = union.to_document(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);
    }

    #[test]
    fn union_with_forms() {
        let short = UnionWithOperation::new("archive");
        assert_eq!(short.to_document(&NoOpContext).unwrap(), doc! { "$unionWith": "archive" });

        let full = UnionWithOperation::new("archive").pipeline(Pipeline::new().then(stage::limit(5)));
        assert_eq!(full.to_document(&NoOpContext).unwrap(), doc! {
            "$unionWith": { "coll": "archive", "pipeline": [ { "$limit": 5_i64 } ] },
        });
    }

    #[test]
    fn lookup_inherits_and_exposes_as() {
        match stage::lookup("a", "b", "c", "joined").exposure() {
            Exposure::Inherited(fields) => assert!(fields.get("joined").is_some()),
            other => panic!("unexpected exposure {:?}", other),
        }
    }
}
