// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The Path ORAM store holding one transition row per automaton state.

use crate::{
    bucket::{Bucket, StateBlock},
    database::{check_tree_capacity, CountAccessesDatabase, Database},
    position_map::PositionMap,
    stash::Stash,
    table::Row,
    utils::{num_leaves, random_leaf, tree_height},
    AutomatonError, BucketSize, StashSize, StateId,
};
use rand::{CryptoRng, RngCore};
use std::mem;

/// A Path ORAM keyed by state identifier. Rows live in blocks mapped to
/// random leaves of a complete binary tree of buckets; each access reads and
/// rewrites one full root-to-leaf path through the stash, remapping the
/// touched state to a fresh leaf.
///
/// Every real block for a live state is somewhere on the path from the root
/// to its mapped leaf, or in the stash; the tree and stash together hold each
/// live state's block exactly once.
#[derive(Debug)]
pub struct PathOram<const Z: BucketSize> {
    /// The underlying untrusted memory that the ORAM is obliviously accessing
    /// on behalf of its client. Public for testing and benchmarking.
    pub physical_memory: CountAccessesDatabase<Bucket<Z>>,
    stash: Stash,
    position_map: PositionMap,
    height: u32,
    num_leaves: usize,
}

impl<const Z: BucketSize> PathOram<Z> {
    /// Creates an empty store for up to `capacity` states. `capacity` must be
    /// `2^h - 1` (a complete binary tree of buckets) and `stash_space` a
    /// power of two at least as large as one path of `Z * h` blocks.
    pub fn new<R: RngCore + CryptoRng>(
        capacity: usize,
        stash_space: StashSize,
        rng: &mut R,
    ) -> Result<Self, AutomatonError> {
        check_tree_capacity(capacity)?;
        StateId::try_from(capacity)?;

        let height = tree_height(capacity);
        let num_leaves = num_leaves(capacity);
        let path_len = Z * (height as usize + 1);

        log::debug!(
            "PathOram::new -- block size {}, Z = {}, capacity = {}, height = {}, stash = {}",
            mem::size_of::<StateBlock>(),
            Z,
            capacity,
            height,
            stash_space,
        );

        Ok(Self {
            physical_memory: Database::new(capacity),
            stash: Stash::new(stash_space, path_len)?,
            position_map: PositionMap::new(capacity, num_leaves, rng)?,
            height,
            num_leaves,
        })
    }

    /// The single read-or-write primitive.
    ///
    /// Rotates the position map for `state`, pulls the old path into the
    /// stash, compacts, obliviously extracts the state's row (relabeled to
    /// the fresh leaf), writes the path back, and rotates the stash buffer.
    /// When `new_row` is supplied and the state is absent, the new block is
    /// inserted on the way through; that insert is the one observably
    /// conditional step, exercised only by the loader. A write to a state
    /// that is already present leaves its stored row unchanged.
    ///
    /// The physical slots touched depend only on the (public) path length
    /// and the leaf being rewritten, never on `state` or on block contents.
    pub fn access<R: RngCore + CryptoRng>(
        &mut self,
        state: StateId,
        new_row: Option<&Row>,
        rng: &mut R,
    ) -> Result<Row, AutomatonError> {
        // Not constant-time, but only leaks whether the identifier is
        // well-formed, which is public.
        if state as usize >= self.block_capacity() {
            return Err(AutomatonError::StateOutOfBounds);
        }

        // Drawn before anything is mutated: a randomness failure must leave
        // the map, tree, and stash exactly as they were.
        let new_leaf = random_leaf(self.num_leaves, rng)?;
        let old_leaf = self.position_map.lookup_and_rotate(state, new_leaf)?;

        self.stash
            .read_from_path(&mut self.physical_memory, old_leaf, self.height);
        self.stash.compact();

        let (row, found, occupancy) = self.stash.scan(state, new_leaf);

        if let Some(row) = new_row {
            if !bool::from(found) {
                self.stash.insert_at(
                    occupancy,
                    StateBlock {
                        state,
                        position: new_leaf,
                        row: *row,
                    },
                );
            }
        }

        self.stash
            .write_to_path(&mut self.physical_memory, old_leaf, self.height);
        self.stash.rotate();

        Ok(row)
    }

    /// Reads the row stored for `state`; an absent state yields the zero row.
    pub fn read<R: RngCore + CryptoRng>(
        &mut self,
        state: StateId,
        rng: &mut R,
    ) -> Result<Row, AutomatonError> {
        self.access(state, None, rng)
    }

    /// Writes `row` for `state` if absent (see [`PathOram::access`]).
    pub fn write<R: RngCore + CryptoRng>(
        &mut self,
        state: StateId,
        row: &Row,
        rng: &mut R,
    ) -> Result<Row, AutomatonError> {
        self.access(state, Some(row), rng)
    }

    /// The maximum number of states this store can hold.
    pub fn block_capacity(&self) -> usize {
        self.position_map.capacity()
    }

    /// The number of real blocks currently waiting in the stash.
    pub fn stash_occupancy(&self) -> usize {
        self.stash.occupancy()
    }

    #[cfg(test)]
    pub(crate) fn position_of(&self, state: StateId) -> crate::LeafIndex {
        self.position_map.position_of(state)
    }
}
