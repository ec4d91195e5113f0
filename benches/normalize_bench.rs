use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use originsnap::value::{denormalize, normalize, NormalizedValue, RuntimeValue};
use time::OffsetDateTime;

fn record(i: usize) -> RuntimeValue {
    RuntimeValue::object([
        ("id", RuntimeValue::from(i as i64)),
        ("title", RuntimeValue::from(format!("item {i}"))),
        ("created", RuntimeValue::from(OffsetDateTime::UNIX_EPOCH)),
        ("thumb", RuntimeValue::Bytes(vec![0; 256])),
        (
            "tags",
            RuntimeValue::Array(vec![RuntimeValue::from("a"), RuntimeValue::from("b")]),
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

fn bench_normalize_collection(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_collection");

    for size in [10usize, 100, 1000] {
        let records: Vec<RuntimeValue> = (0..size).map(record).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| {
                let normalized: Vec<NormalizedValue> = records.iter().map(normalize).collect();
                black_box(normalized)
            })
        });
    }

    group.finish();
}

fn bench_depth_guard(c: &mut Criterion) {
    let deep = nested(500);
    c.bench_function("normalize_500_levels", |b| {
        b.iter(|| black_box(normalize(black_box(&deep))))
    });
}

fn bench_json_round_trip(c: &mut Criterion) {
    let records: Vec<NormalizedValue> = (0..100).map(|i| normalize(&record(i))).collect();
    let json = serde_json::to_string(&records).unwrap();

    c.bench_function("decode_and_denormalize_100", |b| {
        b.iter(|| {
            let decoded: Vec<NormalizedValue> = serde_json::from_str(black_box(&json)).unwrap();
            black_box(decoded.iter().map(denormalize).collect::<Vec<_>>())
        })
    });
}

criterion_group!(
    benches,
    bench_normalize_collection,
    bench_depth_guard,
    bench_json_round_trip
);
criterion_main!(benches);
