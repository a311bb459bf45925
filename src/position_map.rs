// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The state-to-leaf position map, scanned in full on every lookup.

use crate::{utils::random_leaf, AutomatonError, LeafIndex, StateId};
use rand::{CryptoRng, RngCore};
use subtle::{ConditionallySelectable, ConstantTimeEq};

/// Maps every state to the tree leaf its block is currently assigned to.
/// Lives in protected memory; every state always has an assignment, and the
/// assignment changes on every access to that state.
#[derive(Debug)]
pub struct PositionMap {
    positions: Vec<LeafIndex>,
}

impl PositionMap {
    /// Creates a map with a fresh random leaf for each of `capacity` states.
    pub fn new<R: RngCore + CryptoRng>(
        capacity: usize,
        num_leaves: usize,
        rng: &mut R,
    ) -> Result<Self, AutomatonError> {
        let mut positions = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            positions.push(random_leaf(num_leaves, rng)?);
        }
        Ok(Self { positions })
    }

    /// Returns `state`'s current leaf and remaps it to `new_leaf`.
    ///
    /// Touches every entry of the map through the same pair of conditional
    /// assignments, so the scan's cost and access pattern are O(capacity)
    /// regardless of which state was requested. That uniform cost is part of
    /// the obliviousness contract, not an inefficiency to optimize away.
    pub fn lookup_and_rotate(
        &mut self,
        state: StateId,
        new_leaf: LeafIndex,
    ) -> Result<LeafIndex, AutomatonError> {
        let mut old_leaf: LeafIndex = 0;
        for (i, position) in self.positions.iter_mut().enumerate() {
            let is_target = StateId::try_from(i)?.ct_eq(&state);
            old_leaf.conditional_assign(position, is_target);
            position.conditional_assign(&new_leaf, is_target);
        }
        Ok(old_leaf)
    }

    /// The number of states tracked.
    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    #[cfg(test)]
    pub(crate) fn position_of(&self, state: StateId) -> LeafIndex {
        self.positions[state as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn rotates_only_the_requested_state() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut map = PositionMap::new(15, 8, &mut rng).unwrap();
        let before: Vec<LeafIndex> = (0..15).map(|i| map.position_of(i)).collect();

        let old = map.lookup_and_rotate(6, 5).unwrap();
        assert_eq!(old, before[6]);
        assert_eq!(map.position_of(6), 5);
        for i in (0..15).filter(|i| *i != 6) {
            assert_eq!(map.position_of(i), before[i as usize]);
        }
    }

    #[test]
    fn fresh_maps_cover_the_leaf_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let map = PositionMap::new(1023, 512, &mut rng).unwrap();
        assert!(map.positions.iter().all(|leaf| *leaf < 512));
    }
}
