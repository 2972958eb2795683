//! Tests for `#[derive(Mapped)]` and `#[derive(Entity)]`.

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate papaya_derive;

use std::collections::HashMap;
use papaya::prelude::*;
use papaya::mapping::Property;

/// Property names and stored names, in declaration order.
fn names(properties: &[Property]) -> Vec<(&'static str, &'static str)> {
    properties.iter().map(|p| (p.name, p.field)).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
struct Coordinates {
    #[serde(rename = "lng")]
    longitude: f64,
    #[serde(rename = "lat")]
    latitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
#[serde(rename_all = "camelCase")]
struct Branch {
    street_address: String,
    #[papaya(embedded)]
    location: Option<Coordinates>,
}

fn relaxed_defaults() -> AggregationOptions {
    AggregationOptions::new().relaxed_mapping().batch_size(500)
}

#[derive(Debug, Clone, Serialize, Deserialize, Entity)]
#[serde(rename = "companies")]
#[papaya(aggregate_options = "relaxed_defaults")]
struct Company {
    #[serde(rename = "_id")]
    id: ObjectId,
    legal_name: String,
    #[serde(rename(serialize = "hq", deserialize = "headquarters"))]
    headquarters: String,
    #[papaya(embedded)]
    branches: Vec<Branch>,
    #[papaya(embedded = "Coordinates")]
    landmarks: HashMap<String, Coordinates>,
    #[serde(skip)]
    cached_rank: u32,
    r#type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Entity)]
struct Unit;

#[derive(Debug, Clone, Serialize, Deserialize, Entity)]
#[serde(rename = "person", rename_all = "camelCase")]
#[papaya(collection = "people")]
struct Person {
    given_name: String,
    #[papaya(embedded)]
    home: Option<Coordinates>,
}

#[test]
fn plain_fields_follow_serde_renaming() {
    assert_eq!(names(Coordinates::properties()), [("longitude", "lng"), ("latitude", "lat")]);
    assert_eq!(names(Branch::properties()), [
        ("street_address", "streetAddress"),
        ("location", "location"),
    ]);
}

#[test]
fn skipped_fields_are_not_properties() {
    assert_eq!(names(Company::properties()), [
        ("id", "_id"),
        ("legal_name", "legal_name"),
        ("headquarters", "hq"),
        ("branches", "branches"),
        ("landmarks", "landmarks"),
        ("type", "type"),
    ]);
    assert!(Unit::properties().is_empty());
}

#[test]
fn embedded_paths_resolve_through_wrappers() -> PapayaResult<()> {
    assert_eq!(Company::resolve_path("branches.location.latitude", true)?, "branches.location.lat");
    assert_eq!(Company::resolve_path("branches.3.street_address", true)?, "branches.3.streetAddress");
    assert_eq!(Company::resolve_path("landmarks.longitude", true)?, "landmarks.lng");

    let err = Company::resolve_path("branches.zip", true).unwrap_err();
    assert_eq!(err.kind(), PapayaErrorKind::UnknownProperty);

    Ok(())
}

#[test]
fn entity_name_and_options() {
    assert_eq!(Company::NAME, "companies");
    assert_eq!(Unit::NAME, "Unit");

    let options = Company::aggregate_options();
    assert!(!options.is_strict_mapping());
    assert_eq!(options.batch_size, Some(500));
    assert!(Unit::aggregate_options().is_strict_mapping());
}

#[test]
fn collection_attribute_names_the_collection() -> PapayaResult<()> {
    assert_eq!(Person::NAME, "people");
    assert_eq!(names(Person::properties()), [("given_name", "givenName"), ("home", "home")]);

    let aggregation = TypedAggregation::<Person>::new(
        Pipeline::new().then(stage::sort(Order::Ascending, vec!["home.latitude"]))
    );
    assert_eq!(aggregation.to_command()?, doc! {
        "aggregate": "people",
        "pipeline": [{ "$sort": { "home.lat": 1 } }],
        "cursor": {},
    });

    Ok(())
}

#[test]
fn derived_entities_drive_typed_aggregations() -> PapayaResult<()> {
    let aggregation = TypedAggregation::<Company>::new(
        Pipeline::new()
            .then(stage::unwind("branches"))
            .then(stage::match_(Criteria::where_("branches.location.latitude").gt(45.0)))
            .then(stage::group(vec!["headquarters"]).count("branch_count"))
    );

    assert_eq!(aggregation.to_command()?, doc! {
        "aggregate": "companies",
        "pipeline": [
            { "$unwind": "$branches" },
            { "$match": { "branches.location.lat": { "$gt": 45.0 } } },
            { "$group": { "_id": "$hq", "branch_count": { "$sum": 1 } } },
        ],
        "cursor": { "batchSize": 500_i64 },
    });

    Ok(())
}
