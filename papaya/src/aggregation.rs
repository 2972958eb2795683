//! Aggregations: a pipeline of stages, plus the options it is run with.

use std::fmt;
use std::rc::Rc;
use std::any::type_name;
use std::marker::PhantomData;
use bson::Document;
use tracing::debug;
use crate::bsn::to_relaxed_json;
use crate::context::{ AggregationOperationContext, NoOpContext, TypeBasedContext };
use crate::mapping::Entity;
use crate::options::AggregationOptions;
use crate::pipeline::Pipeline;
use crate::stage::AggregationOperation;
use crate::error::{ Result, ResultExt };

/// Builds an [`Aggregation`](aggregation/struct.Aggregation.html) out of
/// a comma-separated list of stages.
///
/// ```
/// # #[macro_use] extern crate papaya;
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::literal::Order;
/// # use papaya::stage;
/// #
/// # fn main() {
/// let aggregation = aggregation![
///     stage::unwind("tags"),
///     stage::sort_by_count("tags"),
///     stage::limit(5),
/// ];
///
/// assert_eq!(aggregation.to_pipeline(&NoOpContext).unwrap(), vec![
///     doc! { "$unwind": "$tags" },
///     doc! { "$sortByCount": "$tags" },
///     doc! { "$limit": 5_i64 },
/// ]);
/// # }
/// ```
#[macro_export]
macro_rules! aggregation {
    ($($stage:expr),* $(,)*) => {
        $crate::aggregation::Aggregation::new(
            $crate::pipeline::Pipeline::new() $(.then($stage))*
        )
    };
}

/// An untyped aggregation. The stages are rendered starting from whatever
/// context the caller supplies, usually `NoOpContext`.
///
/// ```
/// # use bson::doc;
/// # use papaya::aggregation::Aggregation;
/// # use papaya::context::NoOpContext;
/// # use papaya::criteria::Criteria;
/// # use papaya::options::AggregationOptions;
/// # use papaya::pipeline::Pipeline;
/// # use papaya::stage;
/// #
/// let aggregation = Aggregation::new(
///     Pipeline::new()
///         .then(stage::match_(Criteria::where_("status").is("A")))
///         .then(stage::group(vec!["cust_id"]).sum("total", "amount"))
/// ).with_options(AggregationOptions::new().allow_disk_use(true).batch_size(20));
///
/// assert_eq!(aggregation.to_command("orders", &NoOpContext).unwrap(), doc! {
///     "aggregate": "orders",
///     "pipeline": [
///         { "$match": { "status": "A" } },
///         { "$group": { "_id": "$cust_id", "total": { "$sum": "$amount" } } },
///     ],
///     "allowDiskUse": true,
///     "cursor": { "batchSize": 20_i64 },
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pipeline: Pipeline,
    options: AggregationOptions,
}

impl Aggregation {
    /// An aggregation running `pipeline` with default options.
    pub fn new(pipeline: Pipeline) -> Self {
        Aggregation {
            pipeline,
            options: AggregationOptions::default(),
        }
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: AggregationOptions) -> Self {
        self.options = options;
        self
    }

    /// Appends a stage.
    pub fn then<O: AggregationOperation + 'static>(mut self, stage: O) -> Self {
        self.pipeline.push(stage);
        self
    }

    /// The options given to this aggregation.
    pub fn options(&self) -> &AggregationOptions {
        &self.options
    }

    /// The stages.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Renders the pipeline, the first stage in `ctx`.
    pub fn to_pipeline(&self, ctx: &dyn AggregationOperationContext) -> Result<Vec<Document>> {
        self.render(Rc::new(ctx))
    }

    /// Renders the complete `aggregate` command against `collection`.
    pub fn to_command(&self, collection: &str, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let pipeline = self.to_pipeline(ctx)?;
        Ok(build_command(collection, pipeline, &self.options))
    }

    /// Turns this into an aggregation over the collection of `T`.
    pub fn typed<T: Entity>(self) -> TypedAggregation<T> {
        TypedAggregation {
            inner: self,
            _marker: PhantomData,
        }
    }

    fn render<'a>(&self, root: Rc<dyn AggregationOperationContext + 'a>) -> Result<Vec<Document>> {
        debug!(stages = self.pipeline.len(), root = ?root, "rendering aggregation pipeline");
        self.pipeline.render(root).chain("can't render aggregation pipeline")
    }
}

impl From<Pipeline> for Aggregation {
    fn from(pipeline: Pipeline) -> Self {
        Aggregation::new(pipeline)
    }
}

/// The pipeline as relaxed extended JSON, rendered without field mapping.
impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.pipeline.render_in(&NoOpContext) {
            Ok(docs) => write!(f, "{}", to_relaxed_json(&docs)),
            Err(error) => write!(f, "<invalid pipeline: {}>", error),
        }
    }
}

/// `{ aggregate, pipeline, ...options }`
fn build_command(collection: &str, pipeline: Vec<Document>, options: &AggregationOptions) -> Document {
    let mut command = Document::new();
    command.insert("aggregate", collection);
    command.insert("pipeline", pipeline);
    options.apply_to_command(&mut command);
    command
}

/// An aggregation over the collection of the entity type `T`. Property
/// paths of `T` are mapped to the stored field names until a stage
/// reshapes the documents.
///
/// ```
/// # use bson::doc;
/// # use papaya::aggregation::TypedAggregation;
/// # use papaya::mapping::{ Entity, Mapped, Property };
/// # use papaya::pipeline::Pipeline;
/// # use papaya::stage;
/// #
/// struct Employee;
///
/// impl Mapped for Employee {
///     fn properties() -> &'static [Property] {
///         static PROPERTIES: &[Property] = &[
///             Property::new("department", "dept"),
///             Property::new("salary", "pay"),
///         ];
///         PROPERTIES
///     }
/// }
///
/// impl Entity for Employee {
///     const NAME: &'static str = "employees";
/// }
///
/// let aggregation = TypedAggregation::<Employee>::new(
///     Pipeline::new()
///         .then(stage::group(vec!["department"]).avg("average", "salary"))
///         .then(stage::project(vec!["department", "average"]))
/// );
///
/// assert_eq!(aggregation.to_command().unwrap(), doc! {
///     "aggregate": "employees",
///     "pipeline": [
///         { "$group": { "_id": "$dept", "average": { "$avg": "$pay" } } },
///         { "$project": { "department": "$_id", "average": 1 } },
///     ],
///     "cursor": {},
/// });
/// ```
pub struct TypedAggregation<T> {
    inner: Aggregation,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> TypedAggregation<T> {
    /// An aggregation over `T` running `pipeline`.
    pub fn new(pipeline: Pipeline) -> Self {
        Aggregation::new(pipeline).typed()
    }

    /// Replaces the options given to this aggregation.
    pub fn with_options(mut self, options: AggregationOptions) -> Self {
        self.inner.options = options;
        self
    }

    /// Appends a stage.
    pub fn then<O: AggregationOperation + 'static>(mut self, stage: O) -> Self {
        self.inner.pipeline.push(stage);
        self
    }

    /// The stages.
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// The options in effect: the ones given to this aggregation, falling
    /// back to `T::aggregate_options()`.
    pub fn options(&self) -> AggregationOptions {
        self.inner.options.clone().or(T::aggregate_options())
    }

    /// The context the first stage is rendered in.
    pub fn root_context(&self) -> TypeBasedContext<T> {
        if self.options().is_strict_mapping() {
            TypeBasedContext::strict()
        } else {
            TypeBasedContext::relaxed()
        }
    }

    /// Renders the pipeline, mapping the properties of `T`.
    pub fn to_pipeline(&self) -> Result<Vec<Document>> {
        self.inner.render(Rc::new(self.root_context()))
    }

    /// Renders the complete `aggregate` command against `T::NAME`.
    pub fn to_command(&self) -> Result<Document> {
        let pipeline = self.to_pipeline()?;
        Ok(build_command(T::NAME, pipeline, &self.options()))
    }

    /// The untyped aggregation.
    pub fn into_untyped(self) -> Aggregation {
        self.inner
    }
}

impl<T> Clone for TypedAggregation<T> {
    fn clone(&self) -> Self {
        TypedAggregation {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TypedAggregation<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TypedAggregation")
            .field("type", &type_name::<T>())
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T> fmt::Display for TypedAggregation<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::criteria::Criteria;
    use crate::mapping::{ Mapped, Property };
    use crate::error::ErrorKind;
    use crate::stage;
    use super::*;

    struct Sale;

    impl Mapped for Sale {
        fn properties() -> &'static [Property] {
            static PROPERTIES: &[Property] = &[
                Property::new("item", "sku"),
                Property::new("quantity", "qty"),
            ];
            PROPERTIES
        }
    }

    impl Entity for Sale {
        const NAME: &'static str = "sales";

        fn aggregate_options() -> AggregationOptions {
            AggregationOptions::new().allow_disk_use(true).relaxed_mapping()
        }
    }

    #[test]
    fn display_is_relaxed_json() {
        let aggregation = aggregation![
            stage::match_(Criteria::where_("qty").gt(5)),
            stage::limit(2),
        ];

        assert_eq!(
            aggregation.to_string(),
            r#"[{"$match":{"qty":{"$gt":5}}},{"$limit":2}]"#
        );
    }

    #[test]
    fn entity_defaults_apply_unless_overridden() {
        let relaxed = TypedAggregation::<Sale>::new(
            Pipeline::new().then(stage::match_(Criteria::where_("item").is("abc").and("unmapped").is(1)))
        );

        assert!(!relaxed.root_context().is_strict());
        assert_eq!(relaxed.to_command().unwrap(), doc! {
            "aggregate": "sales",
            "pipeline": [ { "$match": { "sku": "abc", "unmapped": 1 } } ],
            "allowDiskUse": true,
            "cursor": {},
        });

        let strict = TypedAggregation::<Sale>::new(
            Pipeline::new().then(stage::project(vec!["unmapped"]))
        ).with_options(AggregationOptions::new().strict_mapping());

        let err = strict.to_pipeline().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownProperty);
        assert_eq!(strict.options().allow_disk_use, Some(true));
    }

    #[test]
    fn terminal_stage_in_the_middle_is_rejected() {
        let aggregation = aggregation![stage::out("elsewhere"), stage::limit(1)];
        let err = aggregation.to_command("sales", &NoOpContext).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidPipeline);
        assert!(aggregation.to_string().starts_with("<invalid pipeline"));
    }
}
