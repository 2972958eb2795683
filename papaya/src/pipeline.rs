//! An ordered list of stages, and the context chaining used to render it.

use std::rc::Rc;
use std::sync::Arc;
use std::iter::FromIterator;
use bson::Document;
use tracing::trace;
use crate::context::{ AggregationOperationContext, ExposedFieldsContext, NoOpContext };
use crate::stage::{ AggregationOperation, Exposure };
use crate::error::{ Error, ErrorKind, Result, ResultExt };

/// Stages that write the results and therefore must come last.
const TERMINAL_STAGES: &[&str] = &["$out", "$merge"];

/// A sequence of stages.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::pipeline::Pipeline;
/// # use papaya::stage;
/// #
/// let pipeline = Pipeline::new()
///     .then(stage::group(vec!["city"]).count("n"))
///     .then(stage::project(vec!["city", "n"]));
///
/// assert_eq!(pipeline.render_in(&NoOpContext).unwrap(), vec![
///     doc! { "$group": { "_id": "$city", "n": { "$sum": 1 } } },
///     doc! { "$project": { "city": "$_id", "n": 1 } },
/// ]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn AggregationOperation>>,
}

impl Pipeline {
    /// An empty pipeline.
    pub fn new() -> Self {
        Pipeline::default()
    }

    /// Appends a stage.
    pub fn push<O: AggregationOperation + 'static>(&mut self, stage: O) {
        self.stages.push(Arc::new(stage));
    }

    /// Appends a stage, builder style.
    pub fn then<O: AggregationOperation + 'static>(mut self, stage: O) -> Self {
        self.push(stage);
        self
    }

    /// Appends an already shared stage.
    pub fn push_shared(&mut self, stage: Arc<dyn AggregationOperation>) {
        self.stages.push(stage);
    }

    /// The stages in order.
    pub fn stages(&self) -> &[Arc<dyn AggregationOperation>] {
        &self.stages
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether there are no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether any stage has one of the given operators.
    pub fn contains_any(&self, operators: &[&str]) -> bool {
        self.stages.iter().any(|s| operators.contains(&s.operator()))
    }

    /// Checks that `$out` and `$merge` only appear as the last stage.
    pub fn verify(&self) -> Result<()> {
        let last = self.stages.len().saturating_sub(1);

        for (i, stage) in self.stages.iter().enumerate() {
            if i != last && TERMINAL_STAGES.contains(&stage.operator()) {
                return Err(Error::new(
                    ErrorKind::InvalidPipeline,
                    format!("{} is only allowed as the last stage, found at #{}", stage.operator(), i)
                ));
            }
        }

        Ok(())
    }

    /// Renders every stage, each in the context left behind by the stage
    /// before it, starting from `root`.
    pub fn render<'a>(&self, root: Rc<dyn AggregationOperationContext + 'a>) -> Result<Vec<Document>> {
        self.verify()?;

        let mut ctx = root;
        let mut documents = Vec::with_capacity(self.stages.len());

        for (i, stage) in self.stages.iter().enumerate() {
            let rendered = stage
                .to_pipeline_stages(&*ctx)
                .chain(|| format!("can't render stage #{} ({})", i, stage.operator()))?;

            documents.extend(rendered);
            ctx = next_context(stage.exposure(), ctx);
        }

        Ok(documents)
    }

    /// Renders the pipeline starting from a borrowed context.
    pub fn render_in(&self, ctx: &dyn AggregationOperationContext) -> Result<Vec<Document>> {
        self.render(Rc::new(ctx))
    }
}

/// The context the stage after one with the given exposure is rendered in.
fn next_context<'a>(
    exposure: Exposure,
    ctx: Rc<dyn AggregationOperationContext + 'a>,
) -> Rc<dyn AggregationOperationContext + 'a> {
    match exposure {
        Exposure::Unchanged => ctx,
        Exposure::Replaced(ref fields) if fields.exposes_no_fields() => {
            trace!("stage exposes no fields, switching to untyped context");
            Rc::new(NoOpContext)
        }
        Exposure::Replaced(fields) => {
            trace!(fields = fields.iter().count(), "stage replaces fields");
            Rc::new(ExposedFieldsContext::new(fields, ctx))
        }
        Exposure::Inherited(fields) => {
            trace!(fields = fields.iter().count(), "stage adds fields");
            Rc::new(ExposedFieldsContext::inheriting(fields, ctx))
        }
        Exposure::Reset => {
            trace!("stage replaces the document, switching to untyped context");
            Rc::new(NoOpContext)
        }
    }
}

impl<O: AggregationOperation + 'static> FromIterator<O> for Pipeline {
    fn from_iter<I: IntoIterator<Item = O>>(iter: I) -> Self {
        iter.into_iter().fold(Pipeline::new(), Pipeline::then)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::criteria::Criteria;
    use crate::expr::{ Arithmetic, Operand };
    use crate::stage;
    use super::*;

    #[test]
    fn out_must_be_last() {
        let pipeline = Pipeline::new()
            .then(stage::out("archive"))
            .then(stage::limit(1));

        let err = pipeline.render_in(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPipeline);

        let pipeline = Pipeline::new()
            .then(stage::limit(1))
            .then(stage::out("archive"));

        assert!(pipeline.verify().is_ok());
    }

    #[test]
    fn added_fields_are_inherited() {
        let pipeline = Pipeline::new()
            .then(stage::add_fields().add_field("total", Arithmetic::value_of("price").add("tax")))
            .then(stage::match_(Criteria::where_("total").gt(10)))
            .then(stage::project(vec!["total", "name"]));

        assert_eq!(pipeline.render_in(&NoOpContext).unwrap(), vec![
            doc! { "$addFields": { "total": { "$add": ["$price", "$tax"] } } },
            doc! { "$match": { "total": { "$gt": 10 } } },
            doc! { "$project": { "total": 1, "name": 1 } },
        ]);
    }

    #[test]
    fn replaced_fields_are_strict() {
        let pipeline = Pipeline::new()
            .then(stage::count("n"))
            .then(stage::project(vec!["total"]));

        let err = pipeline.render_in(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidReference);
    }

    #[test]
    fn replaced_root_resets() {
        let pipeline = Pipeline::new()
            .then(stage::count("n"))
            .then(stage::replace_root(Operand::document(vec![("count", Operand::from("n"))])))
            .then(stage::project(vec!["anything"]));

        assert!(pipeline.render_in(&NoOpContext).is_ok());
    }
}
