//! Criterion micro-benchmarks for storage packing, spatial queries, and
//! halo layout construction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use halo_core::{Aoi, EntityId, GridPoint, IntRect, Pid, Position, Reader};
use halo_space::HaloLayout;
use halo_storage::{GridStorage, ObjectStorage, Storage};
use halo_test_utils::fixtures::{balanced, toroidal};
use halo_test_utils::Walker;

/// A 100×100 grid with every cell set, bounded by a 2-cell ring.
fn make_grid() -> GridStorage<f64> {
    let bounds = IntRect::new(GridPoint::new(-2, -2), GridPoint::new(102, 102));
    let mut grid = GridStorage::new(bounds, 0.0);
    for p in IntRect::new(GridPoint::new(0, 0), GridPoint::new(100, 100)).iter() {
        grid.set(p, (p.x * 100 + p.y) as f64);
    }
    grid
}

/// 10K walkers spread over a 100×100 region.
fn make_objects() -> ObjectStorage<Position, Walker> {
    let bounds = IntRect::new(GridPoint::new(0, 0), GridPoint::new(100, 100));
    let mut objects = ObjectStorage::new(bounds, 4);
    for i in 0..10_000u64 {
        let x = (i % 100) as f64 + 0.25;
        let y = ((i * 37) % 100) as f64 + 0.75;
        objects
            .insert(Walker::new(EntityId::compose(Pid(0), i), 1.0), Position::new(x, y))
            .unwrap();
    }
    objects
}

/// Benchmark: pack a 2-wide boundary strip of a 100×100 grid.
fn bench_grid_pack_strip(c: &mut Criterion) {
    let grid = make_grid();
    let strip = IntRect::new(GridPoint::new(98, 0), GridPoint::new(100, 100));

    c.bench_function("grid_pack_strip_2x100", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(4096);
            let n = grid.pack(strip, &mut buf);
            black_box((n, &buf));
        });
    });
}

/// Benchmark: unpack the same strip into the halo ring.
fn bench_grid_unpack_strip(c: &mut Criterion) {
    let mut grid = make_grid();
    let strip = IntRect::new(GridPoint::new(98, 0), GridPoint::new(100, 100));
    let ring = IntRect::new(GridPoint::new(-2, 0), GridPoint::new(0, 100));
    let mut buf = Vec::new();
    grid.pack(strip, &mut buf);

    c.bench_function("grid_unpack_strip_2x100", |b| {
        b.iter(|| {
            let mut r = Reader::new(&buf);
            black_box(grid.unpack(ring, &mut r).unwrap());
        });
    });
}

/// Benchmark: pack a 10×10 block holding ~100 objects.
fn bench_object_pack_block(c: &mut Criterion) {
    let objects = make_objects();
    let block = IntRect::new(GridPoint::new(40, 40), GridPoint::new(50, 50));

    c.bench_function("object_pack_block_10x10", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(4096);
            black_box(objects.pack(block, &mut buf));
        });
    });
}

/// Benchmark: 8 nearest neighbours among 10K objects.
fn bench_object_nearest(c: &mut Criterion) {
    let objects = make_objects();

    c.bench_function("object_nearest_8_of_10k", |b| {
        b.iter(|| {
            black_box(objects.nearest(Position::new(50.5, 50.5), 8, None).len());
        });
    });
}

/// Benchmark: radius query among 10K objects.
fn bench_object_within(c: &mut Criterion) {
    let objects = make_objects();

    c.bench_function("object_within_r3_of_10k", |b| {
        b.iter(|| {
            black_box(objects.within(Position::new(50.5, 50.5), 3.0).len());
        });
    });
}

/// Benchmark: build the halo layout of one block in a 64-way torus.
fn bench_layout_build_64(c: &mut Criterion) {
    let partition = balanced(toroidal(256, 256), 64);

    c.bench_function("layout_build_64_blocks", |b| {
        b.iter(|| {
            let layout = HaloLayout::new(partition.as_ref(), Pid(27), Aoi::uniform(2)).unwrap();
            black_box(layout.incoming().len());
        });
    });
}

criterion_group!(
    benches,
    bench_grid_pack_strip,
    bench_grid_unpack_strip,
    bench_object_pack_block,
    bench_object_nearest,
    bench_object_within,
    bench_layout_build_64,
);
criterion_main!(benches);
