// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Common test utilities: a direct-indexing reference simulator, random
//! table generation, and the equivalence-workload harness.

use crate::{
    automaton::ObliviousDfa,
    table::{Row, TransitionTable},
    DEFAULT_BLOCKS_PER_BUCKET, DEFAULT_STASH_SPACE, WILDCARD,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use simplelog::{Config, WriteLogger};
use std::sync::Once;

static INIT: Once = Once::new();

// For use in manual testing and inspection.
pub(crate) fn init_logger() {
    INIT.call_once(|| {
        WriteLogger::init(log::LevelFilter::Info, Config::default(), std::io::stdout()).unwrap()
    })
}

/// The insecure baseline: a DFA stepping by direct table indexing, with the
/// same entry-scan semantics as the oblivious engine but none of its access
/// pattern discipline. Equivalence tests pit the two against each other.
pub(crate) struct ReferenceDfa {
    rows: Vec<Row>,
    accepting: Vec<bool>,
    state: usize,
}

impl ReferenceDfa {
    pub(crate) fn new(table: &TransitionTable) -> Self {
        Self {
            rows: table.rows().to_vec(),
            accepting: table.accepting().to_vec(),
            state: 0,
        }
    }

    pub(crate) fn step(&mut self, symbol: u8) -> bool {
        let row = &self.rows[self.state];
        let mut matched = false;
        let mut next = self.state;
        for entry in row.entries() {
            let fired = entry.symbol == symbol || (entry.symbol == WILDCARD && !matched);
            if fired {
                next = usize::from(entry.next_state);
            }
            matched |= fired;
        }
        self.state = next;
        self.accepting[self.state]
    }

    pub(crate) fn state(&self) -> usize {
        self.state
    }
}

pub(crate) fn reference_run(dfa: &mut ReferenceDfa, input: &[u8]) -> Option<usize> {
    let mut result = None;
    for (i, byte) in input.iter().enumerate() {
        let accepting = dfa.step(*byte);
        if accepting && result.is_none() {
            result = Some(i);
        }
    }
    result
}

/// Generates a valid random table: each row gets a few specific entries over
/// a small alphabet, sometimes followed by a wildcard, never the reverse.
pub(crate) fn random_table(num_states: usize, rng: &mut StdRng) -> TransitionTable {
    let mut rows = Vec::with_capacity(num_states);
    for _ in 0..num_states {
        let mut entries = Vec::new();
        for _ in 0..rng.gen_range(0..4) {
            entries.push((rng.gen_range(b'a'..=b'e'), rng.gen_range(0..num_states) as u16));
        }
        if rng.gen_bool(0.5) {
            entries.push((WILDCARD, rng.gen_range(0..num_states) as u16));
        }
        rows.push(Row::from_entries(&entries));
    }
    let accepting = (0..num_states).map(|_| rng.gen_bool(0.3)).collect();
    TransitionTable::new(rows, accepting).unwrap()
}

/// Steps an oblivious engine and the reference baseline in lockstep over a
/// random byte stream and requires them to agree at every step.
pub(crate) fn test_equivalence_random_workload(
    capacity: usize,
    num_states: usize,
    num_operations: usize,
) {
    init_logger();
    let mut rng = StdRng::seed_from_u64(capacity as u64);

    for _ in 0..5 {
        let table = random_table(num_states, &mut rng);
        let mut dfa = ObliviousDfa::<DEFAULT_BLOCKS_PER_BUCKET>::load(
            &table,
            capacity,
            DEFAULT_STASH_SPACE,
            &mut rng,
        )
        .unwrap();
        let mut reference = ReferenceDfa::new(&table);

        for _ in 0..num_operations {
            // Mostly in-alphabet bytes, with the occasional arbitrary one.
            let byte = if rng.gen_bool(0.9) {
                rng.gen_range(b'a'..=b'f')
            } else {
                rng.gen::<u8>()
            };
            assert_eq!(dfa.step(byte, &mut rng).unwrap(), reference.step(byte));
            assert_eq!(dfa.current_state() as usize, reference.state());
        }
    }
}

macro_rules! create_equivalence_test {
    ($capacity:expr, $states:expr, $operations:expr) => {
        paste::paste! {
            #[test]
            fn [<equivalence_capacity_ $capacity _states_ $states _ops_ $operations>]() {
                crate::test_utils::test_equivalence_random_workload($capacity, $states, $operations);
            }
        }
    };
}

pub(crate) use create_equivalence_test;
