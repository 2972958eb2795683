//! # Papaya: the strongly-typed MongoDB aggregation framework
//!
//! This library lets MongoDB users write aggregation pipelines with a fluent,
//! statically-typed builder API, instead of assembling the loosely-typed,
//! deeply nested BSON documents of the aggregation language by hand.
//! Expressions, stages and whole pipelines render themselves into exactly the
//! documents the server expects, while field names are resolved (and checked)
//! against the Rust model of the collection.
//!
//! ### The Prelude
//!
//! The most frequently used types of Papaya, along with the parts of the
//! `mongodb` and `bson` crates that go with them, are publicly re-exported
//! under the module [`prelude`](prelude/index.html):
//!
//! ```rust
//! use papaya::prelude::*;
//! ```
//!
//! ### Expressions
//!
//! Every aggregation operator is built by a factory, e.g. `Arithmetic`,
//! `Strings` or `Conditional`, starting from `value_of()`. An operator's
//! arguments are `Operand`s: strings are **field references**, resolved when
//! the expression is rendered, whereas numbers, booleans, dates and BSON
//! values are literals. A string literal has to be explicit about it, via
//! `Operand::value()`.
//!
//! ```
//! # use papaya::prelude::*;
//! #
//! # fn main() -> PapayaResult<()> {
//! let discounted = Arithmetic::value_of("price")
//!     .multiply(Arithmetic::value_of(1).subtract("discount"));
//!
//! let label = Conditional::when(Comparison::value_of("qty").gte(250))
//!     .then(Operand::value("bulk"))
//!     .otherwise(Operand::value("retail"));
//!
//! assert_eq!(discounted.to_document(&NoOpContext)?, doc! {
//!     "$multiply": ["$price", { "$subtract": [1, "$discount"] }],
//! });
//! assert_eq!(label.to_document(&NoOpContext)?, doc! {
//!     "$cond": {
//!         "if": { "$gte": ["$qty", 250] },
//!         "then": "bulk",
//!         "else": "retail",
//!     }
//! });
//! # Ok(())
//! # }
//! ```
//!
//! ### Stages, pipelines and contexts
//!
//! Stages are built by the functions of the [`stage`](stage/index.html)
//! module and the builder types behind them. They are collected into a
//! `Pipeline`, or directly into an `Aggregation` by the `aggregation!` macro.
//!
//! While a pipeline is rendered, each stage is rendered in an **operation
//! context** which resolves field names to document paths. The first stage
//! sees the root context; each stage that reshapes the documents replaces the
//! context for the stages after it, so that only the fields it produced can
//! be referenced. For instance, after a `$group` stage the grouped fields live
//! under `_id`, and references to them are rewritten accordingly:
//!
//! ```
//! # #[macro_use] extern crate papaya;
//! # use papaya::prelude::*;
//! #
//! # fn main() -> PapayaResult<()> {
//! let aggregation = aggregation![
//!     stage::match_(Criteria::where_("status").is("shipped")),
//!     stage::group(vec!["state", "city"]).sum("total", "amount"),
//!     stage::sort(Order::Descending, vec!["total"]),
//!     stage::project(vec!["city", "total"]),
//! ];
//!
//! assert_eq!(aggregation.to_pipeline(&NoOpContext)?, vec![
//!     doc! { "$match": { "status": "shipped" } },
//!     doc! {
//!         "$group": {
//!             "_id": { "state": "$state", "city": "$city" },
//!             "total": { "$sum": "$amount" },
//!         }
//!     },
//!     doc! { "$sort": { "total": -1 } },
//!     doc! { "$project": { "city": "$_id.city", "total": 1 } },
//! ]);
//!
//! // `amount` is gone after grouping
//! let invalid = aggregation![
//!     stage::group(vec!["state"]).sum("total", "amount"),
//!     stage::project(vec!["amount"]),
//! ];
//! assert_eq!(invalid.to_pipeline(&NoOpContext).unwrap_err().kind(),
//!            PapayaErrorKind::InvalidReference);
//! # Ok(())
//! # }
//! ```
//!
//! ### Typed aggregations
//!
//! Types implementing [`Mapped`](mapping/trait.Mapped.html) describe which
//! Rust property is stored under which document field. They are usually
//! `#[derive]`d with the `papaya_derive` crate, which follows Serde's
//! renaming attributes; embedded documents are marked with
//! `#[papaya(embedded)]`. [`Entity`](mapping/trait.Entity.html) types
//! additionally name their collection.
//!
//! A `TypedAggregation<T>` renders its first stages in the context of `T`:
//! property paths are translated into stored paths, and unknown properties
//! are errors unless the mapping is relaxed in the options.
//!
//! ```
//! # #[macro_use] extern crate serde_derive;
//! # #[macro_use] extern crate papaya_derive;
//! # use papaya::prelude::*;
//! #
//! #[derive(Debug, Serialize, Deserialize, Mapped)]
//! struct LineItem {
//!     #[serde(rename = "sku")]
//!     product_code: String,
//!     quantity: u32,
//! }
//!
//! #[derive(Debug, Serialize, Deserialize, Entity)]
//! #[serde(rename = "orders", rename_all = "camelCase")]
//! struct Order {
//!     #[serde(rename = "_id")]
//!     id: ObjectId,
//!     customer_name: String,
//!     #[papaya(embedded)]
//!     line_items: Vec<LineItem>,
//! }
//!
//! # fn main() -> PapayaResult<()> {
//! let aggregation = TypedAggregation::<Order>::new(
//!     Pipeline::new()
//!         .then(stage::unwind("line_items"))
//!         .then(stage::group(vec!["line_items.product_code"])
//!               .sum("sold", "line_items.quantity"))
//! );
//!
//! assert_eq!(aggregation.to_command()?, doc! {
//!     "aggregate": "orders",
//!     "pipeline": [
//!         { "$unwind": "$lineItems" },
//!         { "$group": { "_id": "$lineItems.sku", "sold": { "$sum": "$lineItems.quantity" } } },
//!     ],
//!     "cursor": {},
//! });
//!
//! let misspelled = TypedAggregation::<Order>::new(
//!     Pipeline::new().then(stage::sort(papaya::literal::Order::Ascending, vec!["customer"]))
//! );
//! assert_eq!(misspelled.to_pipeline().unwrap_err().kind(), PapayaErrorKind::UnknownProperty);
//! # Ok(())
//! # }
//! ```
//!
//! ### Running aggregations
//!
//! Papaya piggybacks on the synchronous API of the `mongodb` crate. Connect
//! and obtain a database the way you would with the driver, then ask the
//! database for the strongly-typed collection of an entity type. Results are
//! deserialized into any `Deserialize` type through a `Cursor`.
//!
//! ```no_run
//! # #[macro_use] extern crate serde_derive;
//! # #[macro_use] extern crate papaya_derive;
//! # use papaya::prelude::*;
//! #
//! #[derive(Debug, Serialize, Deserialize, Entity)]
//! #[serde(rename = "employees")]
//! struct Employee {
//!     #[serde(rename = "_id")]
//!     id: ObjectId,
//!     department: String,
//!     salary: f64,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct Payroll {
//!     #[serde(rename = "_id")]
//!     department: String,
//!     total: f64,
//! }
//!
//! # fn main() -> PapayaResult<()> {
//! let client = Client::with_uri_str("mongodb://localhost:27017/")?;
//! let db = client.database("papaya_example_db");
//! let employees: Collection<Employee> = db.existing_collection();
//!
//! let payroll = TypedAggregation::<Employee>::new(
//!     Pipeline::new().then(stage::group(vec!["department"]).sum("total", "salary"))
//! ).with_options(AggregationOptions::new().allow_disk_use(true));
//!
//! for result in employees.aggregate::<Payroll>(&payroll)? {
//!     let Payroll { department, total } = result?;
//!     println!("{}: {}", department, total);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Logging
//!
//! Papaya emits `tracing` events: `debug` when a pipeline is rendered or
//! executed, `trace` while field references are resolved, and `warn` when a
//! criteria key can't be mapped to a property. Install a subscriber in your
//! application to see them.

#![doc(html_root_url = "https://docs.rs/papaya/0.1.0")]
#![deny(missing_debug_implementations,
        trivial_casts, trivial_numeric_casts,
        unsafe_code,
        unused_import_braces, unused_qualifications, missing_docs)]
#![allow(clippy::single_match, clippy::match_same_arms, clippy::match_ref_pats,
         clippy::clone_on_ref_ptr, clippy::needless_pass_by_value)]

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate serde_derive;

extern crate self as papaya;

pub mod error;
pub mod literal;
pub mod bsn;
pub mod fields;
pub mod mapping;
pub mod context;
pub mod expr;
pub mod criteria;
pub mod stage;
pub mod pipeline;
pub mod options;
#[macro_use]
pub mod aggregation;
pub mod coll;
pub mod db;
pub mod cursor;
pub mod prelude;
