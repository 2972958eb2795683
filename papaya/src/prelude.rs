//! The Papaya prelude provides re-exports of the most commonly used traits
//! and types for convenience, including ones from crates `bson` and `mongodb`.

pub use crate::{
    aggregation::{ Aggregation, TypedAggregation },
    coll::Collection,
    context::{ AggregationOperationContext, NoOpContext, TypeBasedContext },
    criteria::Criteria,
    cursor::Cursor,
    db::DatabaseExt,
    expr::{
        AggregationExpression, Operand, Expr,
        Accumulators, Arithmetic, Arrays, Boolean, Comparison, Conditional,
        Convert, Dates, Objects, Sets, Strings, Variables,
    },
    fields::{ Field, Fields },
    literal::{ Order, BsonType, RegexOpts },
    mapping::{ Entity, Mapped },
    options::{ AggregationOptions, Hint },
    pipeline::Pipeline,
    stage::{ self, AggregationOperation },
    error::Error as PapayaError,
    error::ErrorKind as PapayaErrorKind,
    error::Result as PapayaResult,
    error::{ ErrorExt, ResultExt },
};
pub use bson::{ Bson, Document, oid::ObjectId, doc, bson };
pub use mongodb::sync::{ Client, Database };
