mod common;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rn_bridge::{
    model::{decode_any, AnyModel, BirthYear, Person, PersonOption, Position, Status, TypeTag},
    Bridgeable, DecodeError, KeyedMap, TYPE_TAG_KEY,
};
use serde_json::json;

fn status_strategy() -> impl Strategy<Value = Status> {
    (any::<bool>(), proptest::option::of(any::<bool>()))
        .prop_map(|(member, log)| Status::new(member, log))
}

fn position_strategy() -> impl Strategy<Value = Position> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| Position::new(lat, lng).unwrap())
}

fn birth_year_strategy() -> impl Strategy<Value = BirthYear> {
    (1u8..=12, 1900i32..2100).prop_map(|(month, year)| BirthYear::new(month, year).unwrap())
}

fn person_strategy() -> impl Strategy<Value = Person> {
    (
        "[A-Za-z][A-Za-z ]{0,15}",
        any::<i32>(),
        proptest::option::of(0u32..130),
        proptest::option::of(status_strategy()),
        proptest::option::of(position_strategy()),
        proptest::option::of(birth_year_strategy()),
    )
        .prop_map(|(name, month, age, status, position, birth_year)| {
            let options = [
                age.map(PersonOption::Age),
                status.map(PersonOption::Status),
                position.map(PersonOption::Position),
                birth_year.map(PersonOption::BirthYear),
            ];
            Person::new(name, month, options.into_iter().flatten()).unwrap()
        })
}

proptest! {
    #[test]
    fn person_survives_encoding(person in person_strategy()) {
        let map = person.encode();
        prop_assert_eq!(map.get(TYPE_TAG_KEY), Some(&json!("Person")));
        prop_assert_eq!(map.contains_key("age"), person.age().is_some());
        prop_assert_eq!(map.contains_key("status"), person.status().is_some());
        prop_assert_eq!(map.contains_key("position"), person.position().is_some());
        prop_assert_eq!(map.contains_key("birthYear"), person.birth_year().is_some());

        prop_assert_eq!(Person::decode(&map).unwrap(), person.clone());
        prop_assert_eq!(decode_any(&map).unwrap(), AnyModel::Person(person));
    }

    #[test]
    fn foreign_tag_always_rejected(status in status_strategy()) {
        let map = status.encode();
        let rejected = matches!(
            Person::decode(&map),
            Err(DecodeError::TypeTagMismatch { .. })
        );
        prop_assert!(rejected);
    }
}

#[test]
fn test_person_wire_shape() {
    let person = Person::builder("Ann", 4)
        .age(30)
        .status(Status::new(true, None))
        .birth_year(BirthYear::new(7, 1994).unwrap())
        .build()
        .unwrap();

    assert_eq!(
        person.to_payload(),
        json!({
            "className": "Person",
            "name": "Ann",
            "month": 4,
            "age": 30,
            "status": {"className": "Status", "member": true},
            "birthYear": {"className": "BirthYear", "month": 7, "year": 1994}
        })
    );
}

#[test]
fn test_missing_and_unknown_tags() {
    let mut map = Person::builder("Ann", 4).build().unwrap().encode();
    map.remove(TYPE_TAG_KEY);
    assert!(matches!(
        Person::decode(&map),
        Err(DecodeError::MissingTypeTag)
    ));
    assert!(matches!(decode_any(&map), Err(DecodeError::MissingTypeTag)));

    map.insert(TYPE_TAG_KEY.to_string(), json!("Spaceship"));
    assert!(matches!(
        decode_any(&map),
        Err(DecodeError::UnknownTypeTag(tag)) if tag == "Spaceship"
    ));
}

#[test]
fn test_decode_any_dispatches_on_tag() {
    let position = Position::new(-33.9, 151.2).unwrap();
    let decoded = decode_any(&position.encode()).unwrap();
    assert_eq!(decoded.type_tag(), TypeTag::Position);
    assert_eq!(decoded, AnyModel::Position(position));
    assert_eq!(decoded.encode(), position.encode());
}

#[test]
fn test_nested_value_checked_against_its_own_tag() {
    let payload = json!({
        "className": "Person",
        "name": "Ann",
        "month": 4,
        "status": {"className": "Position", "lat": 1.0, "lng": 2.0}
    });
    assert!(matches!(
        Person::from_payload(&payload),
        Err(DecodeError::TypeTagMismatch { .. })
    ));
}

#[test]
fn test_invalid_values_rejected_on_decode() {
    let map: KeyedMap = json!({"className": "Person", "name": "", "month": 13})
        .as_object()
        .cloned()
        .unwrap();
    assert!(matches!(Person::decode(&map), Err(DecodeError::Model(_))));

    let map: KeyedMap = json!({"className": "Person", "name": "Ann", "month": 2, "age": null})
        .as_object()
        .cloned()
        .unwrap();
    assert!(matches!(
        Person::decode(&map),
        Err(DecodeError::InvalidField { .. })
    ));

    assert!(matches!(
        Person::from_payload(&json!([1, 2])),
        Err(DecodeError::NotAMap)
    ));
}
