use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rn_bridge::{
    model::{BirthYear, Person, Position, Status},
    BridgeMessage, Bridgeable,
};
use serde_json::json;

fn bench_envelope(c: &mut Criterion) {
    let message = BridgeMessage::event("cartUpdated", Some(json!({"items": [1, 2, 3]}))).unwrap();
    let wire = message.to_wire();

    c.bench_function("message to_wire", |b| b.iter(|| black_box(&message).to_wire()));
    c.bench_function("message from_wire", |b| {
        b.iter(|| BridgeMessage::from_wire(black_box(&wire)).unwrap())
    });
}

fn bench_codec(c: &mut Criterion) {
    let person = Person::builder("Ann", 4)
        .age(30)
        .status(Status::new(true, Some(false)))
        .position(Position::new(-33.9, 151.2).unwrap())
        .birth_year(BirthYear::new(7, 1994).unwrap())
        .build()
        .unwrap();
    let encoded = person.encode();

    c.bench_function("person encode", |b| b.iter(|| black_box(&person).encode()));
    c.bench_function("person decode", |b| {
        b.iter(|| Person::decode(black_box(&encoded)).unwrap())
    });
}

criterion_group!(benches, bench_envelope, bench_codec);
criterion_main!(benches);
