//! Integration tests running aggregations against a live `mongod`. They
//! exercise the following modules:
//! * [`db`](db/index.html)
//! * [`coll`](coll/index.html)
//! * [`cursor`](cursor/index.html)
//! * [`aggregation`](aggregation/index.html)
//!
//! The tests start their own server, so they need `mongod` on the `PATH`,
//! and are ignored by default. Run them with `cargo test -- --ignored`.

#[macro_use]
extern crate scopeguard;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate papaya_derive;

use std::env::temp_dir;
use std::fs::create_dir_all;
use std::sync::Mutex;
use std::thread::sleep;
use std::time::Duration;
use std::collections::HashSet;
use std::process::{ Command, Child, Stdio };
use papaya::error::Result;
use papaya::prelude::*;

/// Kills the MongoDB server process once all tests have run.
struct ProcessGuard {
    handle: Child,
    owners: HashSet<&'static str>,
}

impl ProcessGuard {
    fn new(handle: Child, owners: &[&'static str]) -> Self {
        ProcessGuard {
            handle,
            owners: owners.iter().copied().collect(),
        }
    }

    fn resign(&mut self, owner: &str) {
        let pid = self.handle.id();

        println!("=== ProcessGuard(#{}): Resigning owner '{}'", pid, owner);
        self.owners.remove(owner);

        if self.owners.is_empty() {
            println!("=== ProcessGuard(#{}): All owners resigned; killing", pid);
            self.handle.kill().expect("couldn't kill child process");
        }
    }
}

macro_rules! implement_tests {
    ($(#[test] $(#[$attr:meta])* fn $test_name:ident() $(-> $ret_ty:ty)? $test_code:block)*) => {
        lazy_static! {
            static ref DB_SERVER_GUARD: Mutex<ProcessGuard> = {
                let dbpath = {
                    let mut tmp = temp_dir();
                    tmp.push(DB_NAME);
                    create_dir_all(&tmp).expect("couldn't create DB temp dir");
                    tmp
                };
                let owners = [$(stringify!($test_name),)*];
                let process = Command::new("mongod")
                    .arg("--noscripting")
                    .arg("--dbpath")
                    .arg(&dbpath)
                    .arg("--port")
                    .arg(DB_PORT)
                    .stdout(Stdio::piped())
                    .spawn()
                    .expect("couldn't start DB server; do you have Mongo installed?");

                // give the server a moment to start listening
                sleep(Duration::from_secs(2));

                Mutex::new(ProcessGuard::new(process, &owners))
            };
        }

        $(
            #[test]
            $(#[$attr])*
            fn $test_name() $(-> $ret_ty)? {
                lazy_static::initialize(&DB_SERVER_GUARD);
                defer!({
                    DB_SERVER_GUARD.lock().unwrap().resign(stringify!($test_name));
                });
                $test_code
            }
        )*
    }
}

/// Not Quite Random
static DB_PORT: &str = "12986";
/// Name of the database and of its temporary directory.
static DB_NAME: &str = "papaya_test_db";

lazy_static! {
    /// The client is never dropped. What matters is that the server process
    /// is shut down once the tests are done.
    static ref DB_HANDLE: Database = {
        Client::with_uri_str(&format!("mongodb://localhost:{}/", DB_PORT))
            .expect("can't connect to mongod server")
            .database(DB_NAME)
    };
}

#[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
struct Item {
    #[serde(rename = "sku")]
    product_code: String,
    #[serde(rename = "qty")]
    quantity: i32,
    price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Entity)]
#[serde(rename = "sales")]
struct Sale {
    #[serde(rename = "_id")]
    id: i32,
    #[serde(rename = "st")]
    store: String,
    #[papaya(embedded)]
    items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct StoreRevenue {
    #[serde(rename = "_id")]
    store: String,
    revenue: f64,
    units: i32,
}

fn sales() -> Vec<Sale> {
    let item = |code: &str, quantity, price| Item {
        product_code: String::from(code),
        quantity,
        price,
    };

    vec![
        Sale { id: 1, store: String::from("north"), items: vec![item("apple", 3, 1.5), item("pear", 1, 2.0)] },
        Sale { id: 2, store: String::from("south"), items: vec![item("apple", 10, 1.5)] },
        Sale { id: 3, store: String::from("north"), items: vec![item("plum", 4, 0.5)] },
    ]
}

implement_tests!{
    #[test]
    #[ignore]
    fn typed_aggregation_over_embedded_documents() -> Result<()> {
        let coll: Collection<Sale> = DB_HANDLE.empty_collection()?;
        assert_eq!(coll.insert_many(sales())?, 3);

        let revenue = TypedAggregation::<Sale>::new(
            Pipeline::new()
                .then(stage::unwind("items"))
                .then(stage::group(vec!["store"])
                      .sum("revenue", Arithmetic::value_of("items.quantity").multiply("items.price"))
                      .sum("units", "items.quantity"))
                .then(stage::sort(Order::Ascending, vec!["store"]))
        );

        let results: Vec<StoreRevenue> = coll.aggregate::<StoreRevenue>(&revenue)?.collect::<Result<_>>()?;

        assert_eq!(results, vec![
            StoreRevenue { store: String::from("north"), revenue: 8.5, units: 8 },
            StoreRevenue { store: String::from("south"), revenue: 15.0, units: 10 },
        ]);

        Ok(())
    }

    #[test]
    #[ignore]
    fn raw_aggregation_with_facets() -> Result<()> {
        let coll: Collection<Sale> = DB_HANDLE.empty_collection()?;
        coll.insert_many(sales())?;

        let aggregation = Aggregation::new(
            Pipeline::new().then(
                stage::FacetOperation::new()
                    .and("stores", Pipeline::new().then(stage::sort_by_count("st")))
                    .and("total", Pipeline::new().then(stage::count("n")))
            )
        );

        let facets: Vec<Document> = coll.aggregate_raw::<Document>(&aggregation)?.collect::<Result<_>>()?;
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[0].get_array("total")?.len(), 1);
        assert_eq!(facets[0].get_array("stores")?.len(), 2);

        Ok(())
    }

    #[test]
    #[ignore]
    fn explain_returns_the_plan() -> Result<()> {
        let coll: Collection<Sale> = DB_HANDLE.empty_collection()?;
        coll.insert_many(sales())?;

        let aggregation = TypedAggregation::<Sale>::new(
            Pipeline::new().then(stage::match_(Criteria::where_("store").is("north")))
        );
        let plan = coll.explain(&aggregation)?;

        assert!(plan.contains_key("ok"));
        Ok(())
    }

    #[test]
    #[ignore]
    fn server_errors_are_reported() {
        let coll: Collection<Sale> = DB_HANDLE.existing_collection();
        let invalid = Aggregation::new(
            Pipeline::new().then(stage::project(vec!["a"]).and_expression(
                "b",
                Expr::new("$noSuchOperator", Operand::value(1)),
            ))
        );

        let err = coll.aggregate_raw::<Document>(&invalid).unwrap_err();
        assert_eq!(err.kind(), PapayaErrorKind::MongoDbError);
    }
}
