// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Benchmarks for the oblivious automaton engine.

extern crate criterion;
use core::fmt;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use oblivious_automaton::{gapped_pattern_table, ObliviousDfa, PathOram, Row};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;

const CAPACITIES_TO_BENCHMARK: [usize; 3] = [15, 127, 511];
const STASH_SPACE: usize = 128;
const RUN_INPUT_LEN: usize = 1024;

criterion_group!(
    name = benches;
    config = Criterion::default().warm_up_time(Duration::new(0, 1_000_000_00)).measurement_time(Duration::new(0, 1_000_000_00)).sample_size(10);
    targets =
    benchmark_store_initialization,
    benchmark_oblivious_access,
    benchmark_load,
    benchmark_run,
    count_accesses_on_access,
);
criterion_main!(benches);

#[derive(Clone, Copy)]
struct ShapeParameters {
    capacity: usize,
}

impl fmt::Display for ShapeParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(Capacity: {} Z: 4 Stash: {})", self.capacity, STASH_SPACE)
    }
}

fn populated_store(capacity: usize, states: usize, rng: &mut StdRng) -> PathOram<4> {
    let mut store = PathOram::<4>::new(capacity, STASH_SPACE, rng).unwrap();
    for state in 0..states as u32 {
        let row = Row::from_entries(&[(b'x', state as u16)]);
        store.write(state, &row, rng).unwrap();
    }
    store
}

fn benchmark_store_initialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("PathOram::new");
    let mut rng = StdRng::seed_from_u64(0);
    for capacity in CAPACITIES_TO_BENCHMARK {
        group.bench_with_input(
            BenchmarkId::from_parameter(ShapeParameters { capacity }),
            &capacity,
            |b, capacity| b.iter(|| PathOram::<4>::new(*capacity, STASH_SPACE, &mut rng)),
        );
    }
}

fn benchmark_oblivious_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("PathOram::read");
    let mut rng = StdRng::seed_from_u64(0);
    for capacity in CAPACITIES_TO_BENCHMARK {
        let mut store = populated_store(capacity, 10, &mut rng);
        group.bench_function(
            BenchmarkId::from_parameter(ShapeParameters { capacity }),
            |b| b.iter(|| store.read(black_box(0), &mut rng)),
        );
    }
}

fn benchmark_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("ObliviousDfa::load");
    let mut rng = StdRng::seed_from_u64(0);
    let table = gapped_pattern_table(b"DARPA").unwrap();
    for capacity in CAPACITIES_TO_BENCHMARK {
        group.bench_with_input(
            BenchmarkId::from_parameter(ShapeParameters { capacity }),
            &capacity,
            |b, capacity| {
                b.iter(|| ObliviousDfa::<4>::load(&table, *capacity, STASH_SPACE, &mut rng))
            },
        );
    }
}

fn benchmark_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("ObliviousDfa::run");
    let mut rng = StdRng::seed_from_u64(0);
    let table = gapped_pattern_table(b"DARPA").unwrap();

    let mut input = vec![0u8; RUN_INPUT_LEN];
    rng.fill(&mut input[..]);

    for capacity in CAPACITIES_TO_BENCHMARK {
        let mut dfa = ObliviousDfa::<4>::load(&table, capacity, STASH_SPACE, &mut rng).unwrap();
        group.bench_function(
            BenchmarkId::from_parameter(ShapeParameters { capacity }),
            |b| b.iter(|| dfa.run(black_box(&input), &mut rng)),
        );
    }
}

fn count_accesses_on_access(_: &mut Criterion) {
    println!("Physical reads and writes incurred by 1 PathOram::read:");
    print_table_row("ORAM Capacity", "Physical Reads", "Physical Writes");

    let mut rng = StdRng::seed_from_u64(0);
    for capacity in CAPACITIES_TO_BENCHMARK {
        let mut store = populated_store(capacity, 10, &mut rng);

        let read_count_before = store.physical_memory.get_read_count();
        let write_count_before = store.physical_memory.get_write_count();

        store.read(0, &mut rng).unwrap();

        let reads = store.physical_memory.get_read_count() - read_count_before;
        let writes = store.physical_memory.get_write_count() - write_count_before;

        print_table_row(capacity, reads, writes);
    }
}

fn print_table_row<A: fmt::Display, B: fmt::Display, C: fmt::Display>(s1: A, s2: B, s3: C) {
    println!("{0: <15} | {1: <15} | {2: <15}", s1, s2, s3)
}
