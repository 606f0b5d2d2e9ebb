// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use criterion::{criterion_group, criterion_main, Criterion};
use repart_partition::{new_block_1d, Partitioning};
use repart_types::{Space, StaticGroup};

fn bench_block_distribution(c: &mut Criterion) {
    c.bench_function("block_1d_distribution_100k_over_64_tasks", |b| {
        b.iter(|| {
            let space = Space::new_1d(100_000).unwrap();
            let group = StaticGroup::new(64, 0).into_arc();
            let p = Partitioning::new("block", group, space, new_block_1d(0, 1, None, None), None);
            p.border_array().unwrap().count()
        })
    });
}

criterion_group!(benches, bench_block_distribution);
criterion_main!(benches);
