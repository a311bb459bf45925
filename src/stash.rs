// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The double-buffered stash absorbing blocks between path reads and
//! write-backs, compacted with an oblivious sorting network.

use crate::{
    bucket::{Bucket, StateBlock},
    database::Database,
    table::Row,
    utils::{node_on_path, oblivious_partition},
    AutomatonError, BucketSize, LeafIndex, StashSize, StateId,
};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

/// A bounded scratch buffer of blocks, twice as long as its working capacity:
/// each access reads a path into the front half alongside the survivors of
/// the previous access in the back half, compacts every real block into the
/// front, evicts what it can, and rotates the halves for the next call.
///
/// Occupancy staying below the working capacity is a probabilistic invariant
/// delivered by parameter choice, not a runtime check: an overflow is a
/// silent correctness violation, never a crash or a detectable event.
#[derive(Debug)]
pub struct Stash {
    blocks: Vec<StateBlock>,
    capacity: StashSize,
    path_len: usize,
}

impl Stash {
    /// Creates an empty stash with the given working capacity, for paths of
    /// `path_len` blocks. The capacity must be a power of two (the
    /// compaction network's requirement) no smaller than a full path.
    pub fn new(capacity: StashSize, path_len: usize) -> Result<Self, AutomatonError> {
        if !capacity.is_power_of_two() || capacity < path_len {
            return Err(AutomatonError::InvalidConfiguration);
        }
        Ok(Self {
            blocks: vec![StateBlock::dummy(); 2 * capacity],
            capacity,
            path_len,
        })
    }

    /// Moves every block on the root-to-leaf path of `leaf` into the stash,
    /// clearing the tree slots to dummies in place. Fresh blocks land in the
    /// front half, after which the buffer holds them concatenated with the
    /// survivors rotated into the back half by the previous access.
    pub fn read_from_path<const Z: BucketSize, T: Database<Bucket<Z>>>(
        &mut self,
        memory: &mut T,
        leaf: LeafIndex,
        height: u32,
    ) {
        debug_assert!(Z * (height as usize + 1) == self.path_len);

        let mut stash_index = 0;
        for depth in (0..=height).rev() {
            let node = node_on_path(leaf, depth, height);
            let mut bucket = memory.read_db(node);
            for slot in 0..Z {
                debug_assert!(self.blocks[stash_index].is_dummy());
                self.blocks[stash_index] = bucket.blocks[slot];
                bucket.blocks[slot] = StateBlock::dummy();
                stash_index += 1;
            }
            memory.write_db(node, bucket);
        }
    }

    /// Reorders the whole buffer so that all real blocks precede all dummies.
    /// After this, the front `capacity` slots are guaranteed to contain every
    /// real block present, which is the invariant the bounded scan relies on.
    pub fn compact(&mut self) {
        oblivious_partition(&mut self.blocks, |block: &StateBlock| block.ct_is_dummy());
    }

    /// Obliviously scans the working prefix for `state`'s block. Returns the
    /// accumulated row, whether any slot matched, and the number of real
    /// blocks in the prefix. The matched block's leaf assignment is relabeled
    /// to `new_leaf` in the same pass. Every slot is visited and rewritten
    /// through the same blend whether or not it matches.
    pub fn scan(&mut self, state: StateId, new_leaf: LeafIndex) -> (Row, Choice, usize) {
        let mut row = Row::default();
        let mut found = Choice::from(0);
        let mut occupancy = 0usize;

        for block in &mut self.blocks[..self.capacity] {
            occupancy += usize::from(!block.is_dummy());

            let is_target = block.state.ct_eq(&state);
            row.conditional_assign(&block.row, is_target);
            block.position.conditional_assign(&new_leaf, is_target);
            found |= is_target;
        }
        (row, found, occupancy)
    }

    /// Places `block` into slot `slot` of the working prefix. Unlike every
    /// other stash operation this is observably conditional: it runs only
    /// when a write finds no existing block, which by construction happens
    /// solely while the loader populates fresh states. That bounded leak is
    /// accepted and confined to the load phase.
    pub fn insert_at(&mut self, slot: usize, block: StateBlock) {
        debug_assert!(self.blocks[slot].is_dummy());
        self.blocks[slot] = block;
    }

    /// Evicts eligible blocks from the working prefix back into the path of
    /// `leaf`, deepest level first. For every (bucket slot, stash slot) pair
    /// at every level, the eligibility predicate (the tree slot is vacant,
    /// the stash block is real, and the block's assigned leaf passes through
    /// this node) is evaluated and blended into the slot bytes, and the
    /// matched stash entry is retired the same way. The physical bytes
    /// touched and comparisons performed are identical on every call.
    pub fn write_to_path<const Z: BucketSize, T: Database<Bucket<Z>>>(
        &mut self,
        memory: &mut T,
        leaf: LeafIndex,
        height: u32,
    ) {
        for depth in (0..=height).rev() {
            let node = node_on_path(leaf, depth, height);
            let mut bucket = memory.read_db(node);
            for slot in 0..Z {
                for stash_slot in 0..self.capacity {
                    let candidate = self.blocks[stash_slot];

                    let vacant = bucket.blocks[slot].ct_is_dummy();
                    let real = !candidate.ct_is_dummy();
                    let on_path = (node_on_path(candidate.position, depth, height) as u64)
                        .ct_eq(&(node as u64));
                    let eligible = vacant & real & on_path;

                    bucket.blocks[slot] =
                        StateBlock::conditional_select(&bucket.blocks[slot], &candidate, eligible);
                    self.blocks[stash_slot]
                        .state
                        .conditional_assign(&StateBlock::DUMMY_STATE, eligible);
                }
            }
            memory.write_db(node, bucket);
        }
    }

    /// Rotates the double buffer: the working prefix becomes the back half
    /// and the front half is cleared, so the next access starts from a known
    /// layout.
    pub fn rotate(&mut self) {
        let (front, back) = self.blocks.split_at_mut(self.capacity);
        back.copy_from_slice(front);
        front.fill(StateBlock::dummy());
    }

    /// The working capacity in blocks.
    pub fn capacity(&self) -> StashSize {
        self.capacity
    }

    /// The number of real blocks anywhere in the buffer. Branches on block
    /// contents; tests and capacity planning only.
    pub fn occupancy(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_dummy()).count()
    }
}
