//! `$facet`

use bson::{ Bson, Document };
use crate::context::AggregationOperationContext;
use crate::fields::{ ExposedFields, Fields };
use crate::pipeline::Pipeline;
use crate::error::{ Error, ErrorKind, Result, ResultExt };
use super::{ AggregationOperation, Exposure, stage_document, validate_output_name };

/// Stages that can't run inside a facet.
const FORBIDDEN_IN_FACET: &[&str] = &[
    "$collStats",
    "$facet",
    "$geoNear",
    "$indexStats",
    "$out",
    "$merge",
    "$planCacheStats",
];

/// Runs several sub-pipelines over the same input documents, each result
/// stored as an array under its facet name.
///
/// Sub-pipelines are rendered in the context in effect at the facet stage.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::literal::Order;
/// # use papaya::pipeline::Pipeline;
/// # use papaya::stage::{ self, AggregationOperation, FacetOperation };
/// #
/// let facets = FacetOperation::new()
///     .and("by_tag", Pipeline::new().then(stage::unwind("tags")).then(stage::sort_by_count("tags")))
///     .and("top", Pipeline::new().then(stage::sort(Order::Descending, vec!["score"])).then(stage::limit(3)));
///
/// assert_eq!(facets.to_document(&NoOpContext).unwrap(), doc! {
///     "$facet": {
///         "by_tag": [ { "$unwind": "$tags" }, { "$sortByCount": "$tags" } ],
///         "top": [ { "$sort": { "score": -1 } }, { "$limit": 3_i64 } ],
///     }
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct FacetOperation {
    facets: Vec<(String, Pipeline)>,
}

impl FacetOperation {
    /// No facets yet.
    pub fn new() -> Self {
        FacetOperation::default()
    }

    /// Adds (or replaces) the facet `name`.
    pub fn and(mut self, name: &str, pipeline: Pipeline) -> Self {
        self.facets.retain(|(n, _)| n != name);
        self.facets.push((name.to_owned(), pipeline));
        self
    }
}

impl AggregationOperation for FacetOperation {
    fn operator(&self) -> &'static str {
        "$facet"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        if self.facets.is_empty() {
            return Err(Error::new(ErrorKind::InvalidStage, "$facet needs at least one facet"));
        }

        let mut body = Document::new();

        for (name, pipeline) in &self.facets {
            validate_output_name(self.operator(), name)?;

            if let Some(stage) = pipeline.stages().iter().find(|s| FORBIDDEN_IN_FACET.contains(&s.operator())) {
                return Err(Error::new(
                    ErrorKind::InvalidStage,
                    format!("$facet '{}' can't contain {}", name, stage.operator())
                ));
            }

            let stages = pipeline
                .render_in(ctx)
                .chain(|| format!("can't render facet '{}'", name))?;

            body.insert(name.as_str(), stages.into_iter().map(Bson::Document).collect::<Vec<_>>());
        }

        Ok(stage_document(self.operator(), body))
    }

    fn exposure(&self) -> Exposure {
        let names = Fields::from_names(self.facets.iter().map(|(name, _)| name.as_str()));
        Exposure::Replaced(ExposedFields::synthetic(names))
    }
}

#[cfg(test)]
mod tests {
    use crate::context::NoOpContext;
    use crate::stage;
    use super::*;

    #[test]
    fn nested_facets_are_rejected() {
        let inner = FacetOperation::new().and("x", Pipeline::new().then(stage::limit(1)));
        let outer = FacetOperation::new().and("y", Pipeline::new().then(inner));

        let err = outer.to_document(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStage);
    }

    #[test]
    fn facet_stages_see_facet_context() {
        let facet = FacetOperation::new()
            .and("counted", Pipeline::new().then(stage::count("n")).then(stage::project(vec!["missing"])));

        let err = facet.to_document(&NoOpContext).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidReference);
    }
}
