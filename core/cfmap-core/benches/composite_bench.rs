// Composite 코덱 벤치마크
//
// Section 1: composite 인코딩/디코딩 (단일 키 vs multi-key)
// Section 2: 컬럼 비교 (BTreeMap row 정렬 비용)
// Section 3: 엔티티 파싱 (부트스트랩 비용)

use cfmap_core::composite::{Composite, CompositeKeyFactory, DynamicComposite};
use cfmap_core::metadata::{MultiKeyProperties, PropertyMeta, PropertyType};
use cfmap_core::value::{KeyComponent, ValueKind};
use cfmap_core::{Entity, EntityRegistry, InMemoryStore, MappingConfig, Serializer, StoreClient, Value, WideMap};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

#[derive(Entity, Default)]
pub struct Account {
    #[cfmap(id)]
    id: i64,
    #[cfmap(column)]
    name: String,
    #[cfmap(column, lazy)]
    tags: Vec<String>,
    #[cfmap(column(table = "account_events"))]
    events: WideMap<i64, String>,
}

fn multi_key_meta() -> PropertyMeta {
    let multi = MultiKeyProperties::from_components(
        "EventKey",
        vec![
            KeyComponent { name: "source".into(), order: 1, kind: ValueKind::Text },
            KeyComponent { name: "rank".into(), order: 2, kind: ValueKind::Int },
            KeyComponent { name: "at".into(), order: 3, kind: ValueKind::Long },
        ],
    )
    .unwrap();
    PropertyMeta::builder("events")
        .key_kind(ValueKind::MultiKey("EventKey".into()))
        .value_kind(ValueKind::Text)
        .multi_key(Some(multi))
        .build(PropertyType::WideMap)
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// Section 1: composite 인코딩/디코딩
// ═══════════════════════════════════════════════════════════════════════════

fn bench_composite_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_codec");

    let single = PropertyMeta::builder("events")
        .key_kind(ValueKind::Long)
        .value_kind(ValueKind::Text)
        .build(PropertyType::WideMap)
        .unwrap();
    let multi = multi_key_meta();
    let multi_key = Value::Components(vec![Value::Text("web".into()), Value::Int(3), Value::Long(1_700_000_000)]);

    group.bench_function("single_key_encode", |b| {
        b.iter(|| {
            let composite = CompositeKeyFactory
                .create_for_insert(&single, black_box(&Value::Long(42)))
                .unwrap();
            composite.to_bytes().unwrap()
        })
    });

    group.bench_function("multi_key_encode", |b| {
        b.iter(|| {
            let composite = CompositeKeyFactory
                .create_for_insert(&multi, black_box(&multi_key))
                .unwrap();
            composite.to_bytes().unwrap()
        })
    });

    let bytes = CompositeKeyFactory
        .create_for_insert(&multi, &multi_key)
        .unwrap()
        .to_bytes()
        .unwrap();
    let serializers = [Serializer::Utf8, Serializer::Int, Serializer::Long];
    group.bench_function("multi_key_decode", |b| {
        b.iter(|| Composite::from_bytes(black_box(&bytes), &serializers).unwrap())
    });

    let mut dynamic = DynamicComposite::new();
    dynamic
        .push(&Value::Text("events".into()), Serializer::Utf8)
        .unwrap()
        .push(&Value::Long(42), Serializer::Long)
        .unwrap();
    let dynamic_bytes = dynamic.to_bytes().unwrap();
    group.bench_function("dynamic_decode", |b| {
        b.iter(|| DynamicComposite::from_bytes(black_box(&dynamic_bytes)).unwrap())
    });

    group.finish();
}

// ═══════════════════════════════════════════════════════════════════════════
// Section 2: 컬럼 비교
// ═══════════════════════════════════════════════════════════════════════════

fn bench_composite_ordering(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_ordering");
    let multi = multi_key_meta();

    for size in [100usize, 1_000] {
        let composites: Vec<Composite> = (0..size)
            .rev()
            .map(|i| {
                let key = Value::Components(vec![
                    Value::Text(format!("source_{}", i % 7)),
                    Value::Int((i % 13) as i32),
                    Value::Long(i as i64),
                ]);
                CompositeKeyFactory.create_for_insert(&multi, &key).unwrap()
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("sort", size), &composites, |b, composites| {
            b.iter(|| {
                let mut sorted = composites.clone();
                sorted.sort();
                sorted
            })
        });
    }

    group.finish();
}

// ═══════════════════════════════════════════════════════════════════════════
// Section 3: 엔티티 파싱
// ═══════════════════════════════════════════════════════════════════════════

fn bench_bootstrap(c: &mut Criterion) {
    c.bench_function("bootstrap_with_creation", |b| {
        b.iter(|| {
            let store: Arc<dyn StoreClient> = Arc::new(InMemoryStore::new());
            let config = MappingConfig::new("bench").with_force_column_family_creation(true);
            EntityRegistry::bootstrap(config, store, [Account::descriptor()]).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_composite_codec,
    bench_composite_ordering,
    bench_bootstrap
);
criterion_main!(benches);
