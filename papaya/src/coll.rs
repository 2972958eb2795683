//! A MongoDB collection of a single homogeneous type.

use std::fmt;
use std::borrow::Borrow;
use std::marker::PhantomData;
use serde::Serialize;
use serde::de::DeserializeOwned;
use bson::Document;
use tracing::debug;
use crate::{
    aggregation::{ Aggregation, TypedAggregation },
    bsn::serialize_document,
    cursor::Cursor,
    mapping::Entity,
    options::AggregationOptions,
    error::{ Result, ResultExt },
};

/// A statically-typed (homogeneous) MongoDB collection.
pub struct Collection<T: Entity> {
    /// The backing MongoDB collection.
    inner: mongodb::sync::Collection<Document>,
    /// The database of the collection, for running commands.
    db: mongodb::sync::Database,
    /// Just here so that the type parameter is used.
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Collection<T> {
    /// The collection of `T` in `db`. Doesn't touch the server.
    pub fn new(db: &mongodb::sync::Database) -> Self {
        Collection {
            inner: db.collection(T::NAME),
            db: db.clone(),
            _marker: PhantomData,
        }
    }

    /// The name of the collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Deletes the collection.
    pub fn drop(&self) -> Result<()> {
        self.inner
            .drop(None)
            .chain(|| format!("can't drop {}", T::NAME))
    }

    /// Inserts entities, returning how many were inserted.
    pub fn insert_many<I>(&self, entities: I) -> Result<usize>
        where I: IntoIterator,
              I::Item: Borrow<T>,
              T: Serialize,
    {
        let docs: Vec<Document> = entities
            .into_iter()
            .map(|entity| serialize_document(entity.borrow()))
            .collect::<Result<_>>()?;

        if docs.is_empty() {
            return Ok(0);
        }

        self.inner
            .insert_many(docs, None)
            .map(|result| result.inserted_ids.len())
            .chain(|| format!("error in {}::insert_many()", T::NAME))
    }

    /// Runs an aggregation over this collection, mapping the properties
    /// of `T`. `explain` is ignored here; see `explain()`.
    pub fn aggregate<O: DeserializeOwned>(&self, aggregation: &TypedAggregation<T>) -> Result<Cursor<O>> {
        let pipeline = aggregation.to_pipeline()?;
        self.run(pipeline, &aggregation.options())
    }

    /// Runs an untyped aggregation over this collection. Field names are
    /// used as they are.
    pub fn aggregate_raw<O: DeserializeOwned>(&self, aggregation: &Aggregation) -> Result<Cursor<O>> {
        let pipeline = aggregation.to_pipeline(&crate::context::NoOpContext)?;
        self.run(pipeline, aggregation.options())
    }

    /// Returns the query plan of an aggregation instead of its results.
    pub fn explain(&self, aggregation: &TypedAggregation<T>) -> Result<Document> {
        let options = aggregation.options().explain(true);
        let command = aggregation.clone().with_options(options).to_command()?;

        debug!(collection = T::NAME, "explaining aggregation");

        self.db
            .run_command(command, None)
            .chain(|| format!("can't explain aggregation on {}", T::NAME))
    }

    fn run<O: DeserializeOwned>(&self, pipeline: Vec<Document>, options: &AggregationOptions) -> Result<Cursor<O>> {
        debug!(collection = T::NAME, stages = pipeline.len(), "running aggregation");

        let driver_options = options.to_driver_options()?;

        self.inner
            .aggregate(pipeline, driver_options)
            .map(Cursor::new)
            .chain(|| format!("error in {}::aggregate()", T::NAME))
    }
}

impl<T: Entity> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Collection<{}>", T::NAME)
    }
}
