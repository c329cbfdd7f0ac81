use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use grid_recolor::prelude::*;

/// Random two-value droplet field with the given fill fraction.
fn random_field(extent: [i64; 3], fill: f64, seed: u64) -> Vec<Option<u8>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..extent[0] * extent[1] * extent[2])
        .map(|_| {
            if rng.gen_range(0.0..1.0) < fill {
                Some(rng.gen_range(1..=2u8))
            } else {
                None
            }
        })
        .collect()
}

fn bench_single_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_block");
    for &n in &[8usize, 16, 32] {
        let extent = [n as i64, n as i64, n as i64];
        let cells = random_field(extent, 0.4, 7);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut domain = Domain::from_global(
                    BlockGrid::new([1, 1, 1]),
                    [n; 3],
                    1,
                    NoComm,
                    0,
                    vec![0],
                    |_, g| cells[(g[0] + extent[0] * (g[1] + extent[1] * g[2])) as usize],
                )
                .unwrap();
                recolor(&mut domain).unwrap();
                domain
            })
        });
    }
    group.finish();
}

fn bench_eight_blocks(c: &mut Criterion) {
    let n = 8usize;
    let extent = [16i64, 16, 16];
    let cells = random_field(extent, 0.4, 11);
    c.bench_function("eight_blocks_16cubed", |b| {
        b.iter(|| {
            let mut domain = Domain::from_global(
                BlockGrid::with_periodicity([2, 2, 2], [false; 3]),
                [n; 3],
                1,
                NoComm,
                0,
                vec![0; 8],
                |_, g| cells[(g[0] + extent[0] * (g[1] + extent[1] * g[2])) as usize],
            )
            .unwrap();
            recolor(&mut domain).unwrap();
            domain
        })
    });
}

criterion_group!(benches, bench_single_block, bench_eight_blocks);
criterion_main!(benches);
