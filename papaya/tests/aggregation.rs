//! Whole aggregations: commands, options and their defaults.

#[macro_use]
extern crate papaya;

use std::time::Duration;
use papaya::prelude::*;
use papaya::mapping::Property;

struct Shipment;

impl Mapped for Shipment {
    fn properties() -> &'static [Property] {
        static PROPERTIES: &[Property] = &[
            Property::new("carrier", "c"),
            Property::new("weight_kg", "w"),
        ];
        PROPERTIES
    }
}

impl Entity for Shipment {
    const NAME: &'static str = "shipments";

    fn aggregate_options() -> AggregationOptions {
        AggregationOptions::new().allow_disk_use(true).batch_size(100)
    }
}

#[test]
fn command_carries_every_option() -> PapayaResult<()> {
    let options = AggregationOptions::new()
        .allow_disk_use(false)
        .batch_size(20)
        .collation(doc! { "locale": "hu" })
        .comment("nightly report")
        .max_time(Duration::from_secs(3))
        .hint(Hint::Name(String::from("carrier_1")))
        .let_vars(doc! { "limit": 5 });

    let aggregation = aggregation![stage::limit(10)].with_options(options);

    assert_eq!(aggregation.to_command("shipments", &NoOpContext)?, doc! {
        "aggregate": "shipments",
        "pipeline": [{ "$limit": 10_i64 }],
        "allowDiskUse": false,
        "cursor": { "batchSize": 20_i64 },
        "collation": { "locale": "hu" },
        "comment": "nightly report",
        "maxTimeMS": 3000_i64,
        "hint": "carrier_1",
        "let": { "limit": 5 },
    });

    Ok(())
}

#[test]
fn explain_replaces_the_cursor() -> PapayaResult<()> {
    let aggregation = aggregation![stage::count("n")]
        .with_options(AggregationOptions::new().explain(true).batch_size(5));

    assert_eq!(aggregation.to_command("shipments", &NoOpContext)?, doc! {
        "aggregate": "shipments",
        "pipeline": [{ "$count": "n" }],
        "explain": true,
    });

    Ok(())
}

#[test]
fn typed_aggregations_merge_entity_defaults() -> PapayaResult<()> {
    let heavy = TypedAggregation::<Shipment>::new(
        Pipeline::new().then(stage::match_(Criteria::where_("weight_kg").gte(1000)))
    );

    assert_eq!(heavy.to_command()?, doc! {
        "aggregate": "shipments",
        "pipeline": [{ "$match": { "w": { "$gte": 1000 } } }],
        "allowDiskUse": true,
        "cursor": { "batchSize": 100_i64 },
    });

    let tuned = heavy.clone().with_options(AggregationOptions::new().batch_size(7));
    assert_eq!(tuned.options().batch_size, Some(7));
    assert_eq!(tuned.options().allow_disk_use, Some(true));
    assert!(tuned.root_context().is_strict());

    let relaxed = heavy.with_options(AggregationOptions::new().relaxed_mapping());
    assert!(!relaxed.root_context().is_strict());

    Ok(())
}

#[test]
fn relaxed_mapping_passes_unknown_properties_through() -> PapayaResult<()> {
    let by_route = TypedAggregation::<Shipment>::new(
        Pipeline::new().then(stage::group(vec!["carrier", "route"]).count("shipments"))
    );

    assert_eq!(by_route.to_pipeline().unwrap_err().kind(), PapayaErrorKind::UnknownProperty);

    let by_route = by_route.with_options(AggregationOptions::new().relaxed_mapping());
    assert_eq!(by_route.to_pipeline()?, vec![doc! {
        "$group": {
            "_id": { "carrier": "$c", "route": "$route" },
            "shipments": { "$sum": 1 },
        }
    }]);

    Ok(())
}

#[test]
fn typed_and_untyped_views_of_the_same_stages() -> PapayaResult<()> {
    let typed = Aggregation::new(Pipeline::new())
        .then(stage::sort(Order::Ascending, vec!["weight_kg"]))
        .typed::<Shipment>();

    assert_eq!(typed.to_pipeline()?, vec![doc! { "$sort": { "w": 1 } }]);
    assert_eq!(typed.pipeline().len(), 1);

    let untyped = typed.into_untyped();
    assert_eq!(untyped.to_pipeline(&NoOpContext)?, vec![doc! { "$sort": { "weight_kg": 1 } }]);
    assert_eq!(untyped.to_string(), r#"[{"$sort":{"weight_kg":1}}]"#);

    let broken = aggregation![stage::add_fields()];
    assert!(broken.to_string().starts_with("<invalid pipeline: "));

    Ok(())
}

#[test]
fn options_read_from_configuration() -> PapayaResult<()> {
    let options: AggregationOptions = serde_json::from_str(r#"{
        "allowDiskUse": true,
        "maxTimeMS": 250,
        "hint": "carrier_1",
        "strictMapping": false
    }"#)?;

    assert_eq!(options, AggregationOptions::new()
        .allow_disk_use(true)
        .max_time(Duration::from_millis(250))
        .hint(Hint::Name(String::from("carrier_1")))
        .relaxed_mapping());

    let json = serde_json::to_value(AggregationOptions::new().batch_size(3))?;
    assert_eq!(json, serde_json::json!({ "batchSize": 3 }));

    let driver = options.to_driver_options()?;
    assert_eq!(driver.allow_disk_use, Some(true));
    assert_eq!(driver.max_time, Some(Duration::from_millis(250)));

    Ok(())
}
