//! Value normalizer integration tests.

use originsnap::value::{
    denormalize, normalize, ElisionReason, NormalizedValue, Normalizer, RuntimeValue,
};
use time::macros::datetime;

fn sample_record() -> RuntimeValue {
    RuntimeValue::object([
        ("id", RuntimeValue::from(42i64)),
        ("title", RuntimeValue::from("buy milk")),
        ("done", RuntimeValue::from(false)),
        ("note", RuntimeValue::Null),
        ("due", RuntimeValue::from(datetime!(2024-03-01 12:30:00 UTC))),
        (
            "tags",
            RuntimeValue::Array(vec![RuntimeValue::from("home"), RuntimeValue::from(1.5)]),
        ),
        (
            "meta",
            RuntimeValue::object([("owner", RuntimeValue::object([("name", RuntimeValue::from("ana"))]))]),
        ),
    ])
}

fn nested(levels: usize) -> RuntimeValue {
    let mut value = RuntimeValue::from("leaf");
    for _ in 0..levels {
        value = RuntimeValue::object([("next", value)]);
    }
    value
}

#[test]
fn test_round_trip_without_binary() {
    let record = sample_record();
    assert_eq!(denormalize(&normalize(&record)), record);
}

#[test]
fn test_round_trip_through_json() {
    let record = sample_record();
    let json = serde_json::to_string(&normalize(&record)).unwrap();
    let decoded: NormalizedValue = serde_json::from_str(&json).unwrap();
    assert_eq!(denormalize(&decoded), record);
}

#[test]
fn test_binary_payloads_are_always_elided() {
    let payloads = [
        RuntimeValue::Bytes(vec![0xde, 0xad]),
        RuntimeValue::ByteView {
            element: "Uint8Array".into(),
            bytes: vec![1, 2, 3],
        },
        RuntimeValue::Blob {
            mime_type: "image/png".into(),
            size: 1024,
        },
    ];

    for payload in payloads {
        assert_eq!(normalize(&payload), NormalizedValue::Elided(ElisionReason::Binary));

        let wrapped = RuntimeValue::Array(vec![payload]);
        assert_eq!(
            normalize(&wrapped),
            NormalizedValue::Sequence(vec![NormalizedValue::Elided(ElisionReason::Binary)])
        );
    }
}

#[test]
fn test_twenty_levels_terminate_in_max_depth() {
    let mut current = normalize(&nested(20));

    // Depths 0 through 10 are kept, depth 11 is cut off.
    let mut records = 0;
    loop {
        match current {
            NormalizedValue::Record(mut fields) => {
                records += 1;
                current = fields.remove("next").unwrap();
            }
            NormalizedValue::Elided(reason) => {
                assert_eq!(reason, ElisionReason::MaxDepth);
                break;
            }
            other => panic!("unexpected value {other:?}"),
        }
    }
    assert_eq!(records, 11);
}

#[test]
fn test_shallow_structure_is_not_cut() {
    let value = nested(5);
    assert_eq!(normalize(&value).elided_count(), 0);
    assert_eq!(denormalize(&normalize(&value)), value);
}

#[test]
fn test_custom_depth_limit() {
    let normalizer = Normalizer::new(2);
    let normalized = normalizer.normalize(&nested(5));
    assert_eq!(normalized.elided_count(), 1);
}

#[test]
fn test_elided_denormalizes_to_visible_placeholder() {
    let record = RuntimeValue::object([("avatar", RuntimeValue::Bytes(vec![1]))]);
    let restored = denormalize(&normalize(&record));
    assert_eq!(
        restored,
        RuntimeValue::object([("avatar", RuntimeValue::Placeholder("binary".into()))])
    );
}

#[test]
fn test_key_sets_round_trip() {
    let record = RuntimeValue::object([
        ("", RuntimeValue::from("empty key")),
        ("__type", RuntimeValue::from("not a tag")),
        ("z", RuntimeValue::Null),
    ]);
    let json = serde_json::to_value(normalize(&record)).unwrap();
    let decoded: NormalizedValue = serde_json::from_value(json).unwrap();
    assert_eq!(denormalize(&decoded), record);
}

#[test]
fn test_tag_lookalike_user_data_survives_json() {
    let record = RuntimeValue::object([
        ("note", RuntimeValue::from("[Blob - skipped]")),
        (
            "meta",
            RuntimeValue::object([
                ("__type", RuntimeValue::from("Date")),
                ("value", RuntimeValue::from("2024-01-01T00:00:00Z")),
            ]),
        ),
        (
            "status",
            RuntimeValue::object([
                ("__type", RuntimeValue::from("Elided")),
                ("reason", RuntimeValue::from("binary")),
            ]),
        ),
    ]);
    let normalized = normalize(&record);

    let json = serde_json::to_string(&normalized).unwrap();
    let decoded: NormalizedValue = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded, normalized);
    assert_eq!(decoded.elided_count(), 0);
    assert_eq!(denormalize(&decoded), record);
}
