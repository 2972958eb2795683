//! Field names, exposed fields and the references they resolve to.

use papaya::prelude::*;
use papaya::fields::{ ExposedField, ExposedFields, FieldReference, ReferenceKind, SystemVariable, Variable };

#[test]
fn dollar_prefixes_and_paths() {
    let field = Field::new("$address.zip");
    assert_eq!(field.name(), "zip");
    assert_eq!(field.target(), "address.zip");
    assert!(field.is_aliased());
    assert!(!field.is_variable());
    assert_eq!(field.to_string(), "zip (address.zip)");

    let alias = Field::aliased("$total", "$amount");
    assert_eq!(alias.name(), "total");
    assert_eq!(alias.target(), "amount");

    let variable = Field::aliased("current", "$$this.qty");
    assert!(variable.is_variable());
    assert_eq!(variable.target(), "$$this.qty");
}

#[test]
fn empty_names_are_rejected() {
    let err = Field::new("").validate().unwrap_err();
    assert_eq!(err.kind(), PapayaErrorKind::InvalidField);

    let err = NoOpContext.get_reference_by_name("$").unwrap_err();
    assert_eq!(err.kind(), PapayaErrorKind::InvalidField);
}

#[test]
fn field_sets_keep_the_last_definition() -> PapayaResult<()> {
    let fields = Fields::from_names(vec!["a", "b"]).and(Field::aliased("a", "c"));

    assert_eq!(fields.len(), 2);
    assert_eq!(fields.get("a").map(Field::target), Some("c"));

    let err = fields.clone().try_and("b").unwrap_err();
    assert_eq!(err.kind(), PapayaErrorKind::InvalidField);

    let fields = fields.try_and("d")?;
    let names: Vec<_> = fields.iter().map(Field::name).collect();
    assert_eq!(names, ["a", "b", "d"]);

    Ok(())
}

#[test]
fn exposed_fields_are_found_by_name_or_target() {
    let exposed = ExposedFields::non_synthetic(Fields::empty().and(Field::aliased("city", "address.city")))
        .and(ExposedField::new("count", true));

    assert!(exposed.exposes_single_non_synthetic_field_only());
    assert!(!exposed.exposes_no_fields());
    assert_eq!(exposed.get("city").map(ExposedField::target), Some("address.city"));
    assert_eq!(exposed.get("address.city").map(ExposedField::name), Some("city"));
    assert!(exposed.get("count").map_or(false, ExposedField::is_synthetic));
    assert!(exposed.get("zip").is_none());
}

#[test]
fn references_render_as_paths_or_variables() {
    let direct = FieldReference::direct("total", "_id.total");
    assert_eq!(direct.kind(), ReferenceKind::Direct);
    assert_eq!(direct.to_bson(), Bson::from("$_id.total"));
    assert_eq!(direct.reference_value(), Bson::from("$_id.total"));
    assert_eq!(direct.nested("cents").raw(), "_id.total.cents");

    let same = FieldReference::direct("total", "total");
    assert_eq!(same.reference_value(), Bson::Int32(1));

    let variable = FieldReference::variable("$$item.price");
    assert!(variable.is_variable());
    assert_eq!(variable.raw(), "item.price");
    assert_eq!(variable.to_string(), "$$item.price");
    assert_eq!(variable.reference_value(), Bson::from("$$item.price"));
}

#[test]
fn variables() {
    let item = Variable::named("$$item").path("price");
    assert_eq!(item.name(), "item.price");
    assert_eq!(item.head(), "item");
    assert_eq!(item.to_bson(), Bson::from("$$item.price"));

    assert_eq!(Variable::this().to_string(), "$$this");
    assert_eq!(Variable::value().to_string(), "$$value");
    assert_eq!(Variable::from(SystemVariable::Root).to_string(), "$$ROOT");
    assert_eq!(SystemVariable::ClusterTime.to_string(), "$$CLUSTER_TIME");
}
