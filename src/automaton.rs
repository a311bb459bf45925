// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The data-oblivious DFA stepper and its loader.

use crate::{
    path_oram::PathOram,
    table::TransitionTable,
    AutomatonError, BucketSize, StashSize, StateId, DEFAULT_BLOCKS_PER_BUCKET, WILDCARD,
};
use rand::{CryptoRng, RngCore};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

/// A DFA whose transition table lives in a [`PathOram`] store and whose
/// per-symbol evaluation is branch-free: each step fetches the current row
/// through an oblivious access and scans every entry and every accepting
/// flag unconditionally, blending rather than branching, so neither the
/// addresses touched nor the comparisons performed depend on the input
/// bytes or the states visited.
#[derive(Debug)]
pub struct ObliviousDfa<const Z: BucketSize = DEFAULT_BLOCKS_PER_BUCKET> {
    oram: PathOram<Z>,
    accepting: Vec<u8>,
    state: StateId,
}

impl<const Z: BucketSize> ObliviousDfa<Z> {
    /// Builds an engine of the given shape and loads `table` into it: every
    /// state gets a fresh random leaf, the tree and stash start empty, and
    /// the rows are written through the oblivious access path in state
    /// order. Loading is the only phase that exercises the store's
    /// observably conditional insert, by design.
    ///
    /// Construction is loading: there is no half-initialized engine to
    /// misuse, and reloading means building a new value.
    pub fn load<R: RngCore + CryptoRng>(
        table: &TransitionTable,
        capacity: usize,
        stash_space: StashSize,
        rng: &mut R,
    ) -> Result<Self, AutomatonError> {
        if table.num_states() > capacity {
            return Err(AutomatonError::CapacityExceeded {
                states: table.num_states(),
                capacity,
            });
        }

        let mut oram = PathOram::new(capacity, stash_space, rng)?;

        log::info!(
            "loading {} states into a capacity-{} oblivious store",
            table.num_states(),
            capacity
        );

        for (state, row) in table.rows().iter().enumerate() {
            oram.write(StateId::try_from(state)?, row, rng)?;
        }

        // Fixed-size accepting table, scanned in full on every step.
        let mut accepting = vec![0u8; capacity];
        for (state, flag) in table.accepting().iter().enumerate() {
            accepting[state] = u8::from(*flag);
        }

        Ok(Self {
            oram,
            accepting,
            state: 0,
        })
    }

    /// Advances the automaton by one input byte and reports whether it is now
    /// in an accepting state.
    ///
    /// The row scan visits all 256 entries: an entry fires if its symbol
    /// equals the input, or if it is the wildcard and nothing before it
    /// fired. The accepting scan then visits every state's flag. Both are
    /// pure blends; a fired entry is never an early exit.
    pub fn step<R: RngCore + CryptoRng>(
        &mut self,
        symbol: u8,
        rng: &mut R,
    ) -> Result<bool, AutomatonError> {
        let row = self.oram.read(self.state, rng)?;

        let mut matched = Choice::from(0);
        let mut state = self.state;
        for entry in row.entries() {
            let hit = entry.symbol.ct_eq(&symbol);
            let fallback = entry.symbol.ct_eq(&WILDCARD) & !matched;
            let fired = hit | fallback;
            state.conditional_assign(&StateId::from(entry.next_state), fired);
            matched |= fired;
        }
        self.state = state;

        let mut accepting = Choice::from(0);
        for (i, flag) in self.accepting.iter().enumerate() {
            let here = StateId::try_from(i)?.ct_eq(&self.state);
            accepting |= here & Choice::from(*flag);
        }
        Ok(accepting.into())
    }

    /// Runs the automaton over `input`, returning the position of the byte at
    /// which it first entered an accepting state, if it ever did.
    ///
    /// These are substring-search semantics: the automaton need not end in an
    /// accepting state, only to have passed through one. The input length is
    /// public; the match position is tracked with blends so that the access
    /// trace does not reveal whether or where a match occurred.
    pub fn run<R: RngCore + CryptoRng>(
        &mut self,
        input: &[u8],
        rng: &mut R,
    ) -> Result<Option<usize>, AutomatonError> {
        let mut found = Choice::from(0);
        let mut earliest = 0u64;

        for (position, byte) in input.iter().enumerate() {
            let accepting = Choice::from(u8::from(self.step(*byte, rng)?));
            let first = accepting & !found;
            earliest.conditional_assign(&u64::try_from(position)?, first);
            found |= first;
        }

        if bool::from(found) {
            Ok(Some(usize::try_from(earliest)?))
        } else {
            Ok(None)
        }
    }

    /// The state the automaton is currently in.
    pub fn current_state(&self) -> StateId {
        self.state
    }

    /// The maximum number of states the underlying store can hold.
    pub fn capacity(&self) -> usize {
        self.oram.block_capacity()
    }

    /// The number of real blocks currently waiting in the store's stash.
    pub fn stash_occupancy(&self) -> usize {
        self.oram.stash_occupancy()
    }
}
