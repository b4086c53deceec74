//! Benchmarks for partitioning and multi-start packing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sat_layout_core::{Aabb3, Part};
use sat_layout_packing::{partition, Packer, PackingConfig};

fn keepouts() -> Vec<Aabb3> {
    (0..8)
        .map(|i| {
            let o = 40.0 + 40.0 * i as f64;
            Aabb3::from_arrays([o, o, 0.0], [o + 25.0, o + 25.0, 60.0])
        })
        .collect()
}

fn partition_benchmark(c: &mut Criterion) {
    let enclosure = Aabb3::from_arrays([0.0; 3], [400.0; 3]);
    let keepouts = keepouts();

    c.bench_function("partition_8_keepouts", |b| {
        b.iter(|| black_box(partition(black_box(&enclosure), black_box(&keepouts), 5.0)))
    });
}

fn packer_benchmark(c: &mut Criterion) {
    let enclosure = Aabb3::from_arrays([0.0; 3], [400.0; 3]);
    let bins = partition(&enclosure, &keepouts(), 5.0);
    let parts: Vec<Part> = (0..24)
        .map(|i| Part::new(format!("P{}", i), 40.0 + (i % 5) as f64 * 10.0, 50.0, 30.0))
        .collect();
    let packer = Packer::new(PackingConfig::new().with_attempts(5));

    c.bench_function("pack_24_parts_5_attempts", |b| {
        b.iter(|| black_box(packer.pack(black_box(&parts), black_box(&bins))))
    });
}

criterion_group!(benches, partition_benchmark, packer_benchmark);
criterion_main!(benches);
