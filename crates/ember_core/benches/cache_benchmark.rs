//! # Resource Cache Benchmark
//!
//! Measures the hot paths that run every frame:
//! 1. Cache hit on an already-loaded identity
//! 2. `is_ready` / `get` on a live handle (lock-free read path)
//! 3. Per-tick eviction scan with nothing to evict
//! 4. One full frame hand-off through the pipeline

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ember_core::{
    frame_pipeline, LoadContext, LoadError, LoadMode, ManualExecutor, MemorySource, Resource,
    ResourceLoader, ResourceParams,
};

const RESOURCE_COUNT: usize = 1_000;

#[derive(Clone, Debug, Hash)]
struct Key(String);

impl ResourceParams for Key {
    fn source_path(&self) -> &str {
        &self.0
    }
}

struct Bytes(Vec<u8>);

impl Resource for Bytes {
    type Params = Key;
    const KIND: &'static str = "bytes";

    fn decode(_: &Key, bytes: &[u8], _: &LoadContext<'_>) -> Result<Self, LoadError> {
        Ok(Self(bytes.to_vec()))
    }

    fn placeholder() -> Self {
        Self(Vec::new())
    }
}

fn loaded_cache() -> (Arc<ResourceLoader>, Vec<ember_core::Handle<Bytes>>) {
    let source = MemorySource::new();
    for i in 0..RESOURCE_COUNT {
        source.insert(format!("asset-{i}"), vec![0u8; 64]);
    }
    let loader = ResourceLoader::new(Arc::new(ManualExecutor::new()), Arc::new(source));
    let handles = (0..RESOURCE_COUNT)
        .map(|i| loader.load::<Bytes>(Key(format!("asset-{i}")), LoadMode::Blocking))
        .collect();
    (loader, handles)
}

fn bench_cache_hit(c: &mut Criterion) {
    let (loader, _handles) = loaded_cache();
    let key = Key("asset-500".to_owned());

    c.bench_function("cache_hit_1k_entries", |b| {
        b.iter(|| black_box(loader.load::<Bytes>(key.clone(), LoadMode::NonBlocking)));
    });
}

fn bench_ready_check(c: &mut Criterion) {
    let (_loader, handles) = loaded_cache();

    c.bench_function("handle_get_1k", |b| {
        b.iter(|| {
            let total: usize = handles
                .iter()
                .filter_map(|h| h.get())
                .map(|bytes| bytes.0.len())
                .sum();
            black_box(total)
        });
    });
}

fn bench_reap_nothing(c: &mut Criterion) {
    let (loader, _handles) = loaded_cache();

    c.bench_function("reap_scan_1k_all_live", |b| {
        b.iter(|| black_box(loader.update()));
    });
}

fn bench_frame_handoff(c: &mut Criterion) {
    let (mut producer, mut consumer) = frame_pipeline::<Vec<u64>>();

    c.bench_function("frame_handoff_1k_instances", |b| {
        b.iter(|| {
            producer
                .submit_with(|slot| {
                    slot.clear();
                    slot.extend(0..1_000);
                })
                .ok();
            let frame = consumer.acquire_sealed_frame();
            black_box(frame.map(|f| f.len()))
        });
    });
}

criterion_group!(
    benches,
    bench_cache_hit,
    bench_ready_check,
    bench_reap_nothing,
    bench_frame_handoff
);
criterion_main!(benches);
