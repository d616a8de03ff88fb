//! Save/load benchmarks for cellar-core

use cellar_core::{AtomicFsIo, BincodeCodec, FsIo, JsonCodec, SerializedStore};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Clone, Serialize, Deserialize)]
struct Record {
    name: String,
    age: f64,
    tags: Vec<String>,
}

fn records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| Record {
            name: format!("record-{i}"),
            age: i as f64,
            tags: vec!["alpha".to_string(), "beta".to_string()],
        })
        .collect()
}

fn bench_save(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("records");
    let small = records(10);
    let large = records(10_000);

    let json: SerializedStore<Vec<Record>, _, _> = SerializedStore::new(JsonCodec::new(), FsIo);
    let atomic: SerializedStore<Vec<Record>, _, _> = SerializedStore::new(JsonCodec::new(), AtomicFsIo);
    let binary: SerializedStore<Vec<Record>, _, _> = SerializedStore::new(BincodeCodec, FsIo);

    c.bench_function("save_json_small", |b| {
        b.iter(|| json.save(black_box(&small), &path).unwrap());
    });

    c.bench_function("save_json_large", |b| {
        b.iter(|| json.save(black_box(&large), &path).unwrap());
    });

    c.bench_function("save_json_small_atomic", |b| {
        b.iter(|| atomic.save(black_box(&small), &path).unwrap());
    });

    c.bench_function("save_bincode_large", |b| {
        b.iter(|| binary.save(black_box(&large), &path).unwrap());
    });
}

fn bench_load(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let json_path = temp_dir.path().join("records.json");
    let bin_path = temp_dir.path().join("records.bin");
    let large = records(10_000);

    let json: SerializedStore<Vec<Record>, _, _> = SerializedStore::new(JsonCodec::new(), FsIo);
    let binary: SerializedStore<Vec<Record>, _, _> = SerializedStore::new(BincodeCodec, FsIo);
    json.save(&large, &json_path).unwrap();
    binary.save(&large, &bin_path).unwrap();

    c.bench_function("load_json_large", |b| {
        b.iter(|| black_box(json.load(&json_path).unwrap()));
    });

    c.bench_function("load_bincode_large", |b| {
        b.iter(|| black_box(binary.load(&bin_path).unwrap()));
    });
}

criterion_group!(benches, bench_save, bench_load);
criterion_main!(benches);
