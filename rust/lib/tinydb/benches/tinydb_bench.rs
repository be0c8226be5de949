use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tempfile::TempDir;

use openerp_tinydb::{MemoryFs, StoreConfig, TinyDb, codec};

fn manual_config() -> StoreConfig {
    StoreConfig {
        auto_save: false,
        ..StoreConfig::new("/bench", "bench")
    }
}

fn bench_escape(c: &mut Criterion) {
    let value = "path=/var/lib<eq>\r\nnext line<lf>".repeat(8);

    c.bench_function("escape_unescape", |b| {
        b.iter(|| {
            let encoded = codec::escape(black_box(value.as_str()));
            codec::unescape(black_box(encoded.as_str()))
        });
    });
}

fn bench_set_in_memory(c: &mut Criterion) {
    let mut db = TinyDb::open_with(MemoryFs::new(), &manual_config()).unwrap();

    c.bench_function("set_int", |b| {
        let mut i = 0i64;
        b.iter(|| {
            let key = format!("bench.key.{}", i % 1000);
            db.set(black_box(key.as_str()), &i).unwrap();
            i += 1;
        });
    });
}

fn bench_get(c: &mut Criterion) {
    let mut db = TinyDb::open_with(MemoryFs::new(), &manual_config()).unwrap();

    // Pre-populate.
    for i in 0..1000 {
        let key = format!("bench.key.{:04}", i);
        db.set_array(&key, &[i, i + 1, i + 2]).unwrap();
    }

    c.bench_function("get_int_array", |b| {
        let mut i = 0i64;
        b.iter(|| {
            let key = format!("bench.key.{:04}", i % 1000);
            let _ = db.get_int_array(black_box(key.as_str())).unwrap();
            i += 1;
        });
    });
}

fn bench_save_to_disk(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let mut db = TinyDb::open(tmp.path(), "bench").unwrap();
    db.set_auto_save(false).unwrap();

    for i in 0..1000 {
        let key = format!("bench.key.{:04}", i);
        db.set(&key, "hello world").unwrap();
    }

    c.bench_function("save_1000", |b| {
        let mut i = 0i64;
        b.iter(|| {
            db.set("bench.counter", &i).unwrap();
            db.save().unwrap();
            i += 1;
        });
    });
}

criterion_group!(
    benches,
    bench_escape,
    bench_set_in_memory,
    bench_get,
    bench_save_to_disk,
);
criterion_main!(benches);
