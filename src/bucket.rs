// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The physical storage units of the ORAM tree: state blocks and buckets.

use crate::{table::Row, BucketSize, LeafIndex, OramBlock, StateId};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

/// A block holding one state's transition row, its owning state, and the leaf
/// it is currently assigned to. A block is exclusively held by exactly one of
/// a tree bucket slot or the stash; the access operation moves it between the
/// two, never duplicating it.
///
/// Each block carries its own leaf assignment so that eviction does not need
/// additional scans of the position map.
#[derive(Clone, Copy, PartialEq)]
pub struct StateBlock {
    /// The state whose row this block holds, or [`StateBlock::DUMMY_STATE`].
    pub state: StateId,
    /// The tree leaf this block is currently assigned to.
    pub position: LeafIndex,
    /// The owning state's transition row.
    pub row: Row,
}

impl StateBlock {
    /// Sentinel state identifier marking a dummy block: a placeholder that
    /// carries no data but is indistinguishable in size and shape from a
    /// real block.
    pub const DUMMY_STATE: StateId = StateId::MAX;

    /// Returns a dummy block.
    pub fn dummy() -> Self {
        Self {
            state: Self::DUMMY_STATE,
            position: 0,
            row: Row::default(),
        }
    }

    /// Whether this block is a dummy, as a [`Choice`].
    pub fn ct_is_dummy(&self) -> Choice {
        self.state.ct_eq(&Self::DUMMY_STATE)
    }

    /// Whether this block is a dummy. Branches; only for use where the
    /// answer is public (tests, occupancy accounting).
    pub fn is_dummy(&self) -> bool {
        self.state == Self::DUMMY_STATE
    }
}

impl Default for StateBlock {
    /// The default block is a dummy; state 0 is a real state identifier.
    fn default() -> Self {
        Self::dummy()
    }
}

impl std::fmt::Debug for StateBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_dummy() {
            write!(f, "StateBlock::Dummy")
        } else {
            f.debug_struct("StateBlock")
                .field("state", &self.state)
                .field("position", &self.position)
                .field("row", &self.row)
                .finish()
        }
    }
}

impl ConditionallySelectable for StateBlock {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        StateBlock {
            state: StateId::conditional_select(&a.state, &b.state, choice),
            position: LeafIndex::conditional_select(&a.position, &b.position, choice),
            row: Row::conditional_select(&a.row, &b.row, choice),
        }
    }
}

impl OramBlock for StateBlock {}

/// A tree node: `Z` block slots, any of which may be dummy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bucket<const Z: BucketSize> {
    /// The bucket's block slots.
    pub blocks: [StateBlock; Z],
}

impl<const Z: BucketSize> Default for Bucket<Z> {
    fn default() -> Self {
        Self {
            blocks: [StateBlock::dummy(); Z],
        }
    }
}

impl<const Z: BucketSize> ConditionallySelectable for Bucket<Z> {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        let mut result = Self::default();
        for i in 0..Z {
            result.blocks[i] = StateBlock::conditional_select(&a.blocks[i], &b.blocks[i], choice);
        }
        result
    }
}

impl<const Z: BucketSize> OramBlock for Bucket<Z> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_blocks_are_recognized() {
        let block = StateBlock::dummy();
        assert!(block.is_dummy());
        assert!(bool::from(block.ct_is_dummy()));

        let real = StateBlock {
            state: 3,
            position: 5,
            row: Row::default(),
        };
        assert!(!real.is_dummy());
        assert!(!bool::from(real.ct_is_dummy()));
    }

    #[test]
    fn buckets_default_to_all_dummies() {
        let bucket = Bucket::<4>::default();
        assert!(bucket.blocks.iter().all(StateBlock::is_dummy));
    }
}
