// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Memory abstractions underneath the ORAM tree.

use crate::{AutomatonError, OramBlock};
use duplicate::duplicate_item;

/// The untrusted memory the engine obliviously accesses: a flat array of
/// values whose addresses and access order are visible to an adversary, but
/// whose contents are not.
pub trait Database<V: OramBlock>
where
    Self: Sized,
{
    /// Returns a new `Database` filled with default values.
    fn new(number_of_addresses: usize) -> Self;
    /// Returns the number of values stored by `self`.
    fn capacity(&self) -> usize;
    /// Reads the value stored at `index`.
    fn read_db(&mut self, index: usize) -> V;
    /// Writes `value` at `index`, returning the previous value.
    fn write_db(&mut self, index: usize, value: V) -> V;
}

/// A simple `Database` that stores its data as a Vec.
#[derive(Debug)]
pub struct SimpleDatabase<V>(Vec<V>);

impl<V: OramBlock> Database<V> for SimpleDatabase<V> {
    fn new(number_of_addresses: usize) -> Self {
        Self(vec![V::default(); number_of_addresses])
    }

    fn capacity(&self) -> usize {
        self.0.len()
    }

    fn read_db(&mut self, index: usize) -> V {
        self.0[index]
    }

    fn write_db(&mut self, index: usize, value: V) -> V {
        let result = self.0[index];
        self.0[index] = value;
        result
    }
}

/// A `Database` that counts reads and writes per address. The engine runs on
/// top of this so that tests and benchmarks can check the physical access
/// pattern itself, not just the values read back.
#[derive(Debug)]
pub struct CountAccessesDatabase<V> {
    data: SimpleDatabase<V>,
    /// `reads[i]` tracks the total number of reads made to index `i`.
    pub reads: Vec<u64>,
    /// `writes[i]` tracks the total number of writes made to index `i`.
    pub writes: Vec<u64>,
}

impl<V> CountAccessesDatabase<V> {
    /// Returns the total number of reads to the database.
    pub fn get_read_count(&self) -> u64 {
        self.reads.iter().sum()
    }

    /// Returns the total number of writes to the database.
    pub fn get_write_count(&self) -> u64 {
        self.writes.iter().sum()
    }
}

impl<V: OramBlock> Database<V> for CountAccessesDatabase<V> {
    fn new(number_of_addresses: usize) -> Self {
        Self {
            data: Database::new(number_of_addresses),
            reads: vec![0u64; number_of_addresses],
            writes: vec![0u64; number_of_addresses],
        }
    }

    fn read_db(&mut self, index: usize) -> V {
        log::trace!("Physical read -- {}", index);

        self.reads[index] += 1;
        self.data.read_db(index)
    }

    fn write_db(&mut self, index: usize, value: V) -> V {
        log::trace!("Physical write -- {}", index);

        self.writes[index] += 1;
        self.data.write_db(index, value)
    }

    fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

/// A bucket store whose physical occupancy can be audited, for checking the
/// blocks-live-in-exactly-one-place invariant.
pub trait AuditableStore {
    /// The number of real (non-dummy) blocks currently resident.
    fn real_block_count(&mut self) -> usize;
}

#[duplicate_item(
    database_type;
    [SimpleDatabase];
    [CountAccessesDatabase];
)]
impl<const Z: crate::BucketSize> AuditableStore for database_type<crate::bucket::Bucket<Z>> {
    fn real_block_count(&mut self) -> usize {
        let mut result = 0;
        for i in 0..self.capacity() {
            let bucket = self.read_db(i);
            for block in bucket.blocks {
                if !block.is_dummy() {
                    result += 1;
                }
            }
        }
        result
    }
}

/// Validates that the requested capacity describes a complete binary tree
/// (`2^h - 1` nodes) with at least one level below the root.
pub(crate) fn check_tree_capacity(capacity: usize) -> Result<(), AutomatonError> {
    if capacity <= 1 || !(capacity + 1).is_power_of_two() {
        return Err(AutomatonError::InvalidConfiguration);
    }
    Ok(())
}
