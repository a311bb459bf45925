// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Utilities: the oblivious partition network and implicit-tree arithmetic.

use crate::{AutomatonError, LeafIndex};
use rand::{CryptoRng, RngCore};
use subtle::{Choice, ConditionallySelectable};

/// Reorders `items` in place so that every item for which `is_last` holds
/// follows every item for which it does not, obliviously and in constant time.
/// Requires `items.len()` to be a power of two.
///
/// The network is a bitonic sorter over the single-bit key `is_last`: the
/// sequence of compare-exchanges depends only on the (public) buffer length,
/// and each exchange rewrites both candidates through `conditional_swap`
/// whether or not it swaps. O(n log^2 n) compare-exchanges.
pub(crate) fn oblivious_partition<T, F>(items: &mut [T], is_last: F)
where
    T: ConditionallySelectable,
    F: Fn(&T) -> Choice + Copy,
{
    assert!(items.len().is_power_of_two());
    helper_partition_sort(items, 0, items.len(), Choice::from(1), is_last);
}

fn helper_partition_sort<T, F>(items: &mut [T], lo: usize, n: usize, direction: Choice, is_last: F)
where
    T: ConditionallySelectable,
    F: Fn(&T) -> Choice + Copy,
{
    // Recursing on a public size is fine; the attacker already knows the
    // network shape.
    if n > 1 {
        let m = n / 2;
        helper_partition_sort(items, lo, m, !direction, is_last);
        helper_partition_sort(items, lo + m, m, direction, is_last);
        helper_partition_merge(items, lo, n, direction, is_last);
    }
}

fn helper_partition_merge<T, F>(items: &mut [T], lo: usize, n: usize, direction: Choice, is_last: F)
where
    T: ConditionallySelectable,
    F: Fn(&T) -> Choice + Copy,
{
    if n > 1 {
        let m = n / 2;
        for i in lo..(lo + m) {
            let j = i + m;
            // For a single-bit key it suffices to look at the low candidate:
            // exchanging (1, 0) sorts the pair and exchanging (1, 1) or
            // swapping nothing leaves it sorted either way.
            let do_swap = is_last(&items[i]) ^ !direction;
            let (head, tail) = items.split_at_mut(i + 1);
            T::conditional_swap(&mut head[i], &mut tail[j - (i + 1)], do_swap);
        }
        helper_partition_merge(items, lo, m, direction, is_last);
        helper_partition_merge(items, lo + m, m, direction, is_last);
    }
}

/// The height of the complete binary tree with `capacity` nodes: the root has
/// depth 0 and the leaves depth `height`. `capacity` must be `2^(h+1) - 1`.
pub(crate) fn tree_height(capacity: usize) -> u32 {
    debug_assert!((capacity + 1).is_power_of_two());
    (capacity + 1).ilog2() - 1
}

/// The number of leaves of the complete binary tree with `capacity` nodes.
pub(crate) fn num_leaves(capacity: usize) -> usize {
    (capacity + 1) / 2
}

/// The 0-based array index of the depth-`depth` ancestor of `leaf`, in a tree
/// stored as an implicit array with the root at index 0 and parent links
/// `(i - 1) / 2`. Shift arithmetic only; no per-level branching.
pub(crate) fn node_on_path(leaf: LeafIndex, depth: u32, height: u32) -> usize {
    let leaf_node = (1usize << height) + leaf as usize;
    (leaf_node >> (height - depth)) - 1
}

/// Samples a uniform leaf index from `[0, num_leaves)`. `num_leaves` must be
/// a power of two. Draws from the fallible RNG entry point and fails closed:
/// an exhausted or broken randomness source aborts the caller's operation
/// rather than reusing a stale leaf assignment.
pub(crate) fn random_leaf<R: RngCore + CryptoRng>(
    num_leaves: usize,
    rng: &mut R,
) -> Result<LeafIndex, AutomatonError> {
    debug_assert!(num_leaves.is_power_of_two());
    let mut bytes = [0u8; std::mem::size_of::<LeafIndex>()];
    rng.try_fill_bytes(&mut bytes)?;
    Ok(LeafIndex::from_le_bytes(bytes) & (num_leaves as LeafIndex - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use subtle::ConstantTimeEq;

    #[test]
    fn partitions_single_bit_keys() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..20 {
            let mut items: Vec<u64> = (0..64).map(|_| rng.gen_range(0..2)).collect();
            let ones = items.iter().filter(|v| **v == 1).count();
            oblivious_partition(&mut items, |v: &u64| v.ct_eq(&1));
            assert!(items[..64 - ones].iter().all(|v| *v == 0));
            assert!(items[64 - ones..].iter().all(|v| *v == 1));
        }
    }

    #[test]
    fn partition_is_total_on_uniform_input() {
        let mut all_ones = vec![1u64; 16];
        oblivious_partition(&mut all_ones, |v: &u64| v.ct_eq(&1));
        assert_eq!(all_ones, vec![1u64; 16]);
    }

    #[test]
    fn path_node_arithmetic() {
        // Capacity 15: internal nodes 0..=6, leaves 7..=14.
        let height = tree_height(15);
        assert_eq!(height, 3);
        assert_eq!(num_leaves(15), 8);

        assert_eq!(node_on_path(0, 3, height), 7);
        assert_eq!(node_on_path(7, 3, height), 14);
        assert_eq!(node_on_path(0, 0, height), 0);
        assert_eq!(node_on_path(7, 0, height), 0);

        // Walking up one level at a time agrees with the parent formula.
        for leaf in 0..8 {
            for depth in (1..=height).rev() {
                let node = node_on_path(leaf, depth, height);
                assert_eq!(node_on_path(leaf, depth - 1, height), (node - 1) / 2);
            }
        }
    }

    #[test]
    fn random_leaves_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..1000 {
            let leaf = random_leaf(8, &mut rng).unwrap();
            assert!(leaf < 8);
        }
    }
}
