// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Data-oblivious DFA evaluation over a Path ORAM transition-table store.
//!
//! The automaton's transition table is held in a small Path ORAM: each state's
//! 256-entry transition row lives in a block mapped to a random leaf of a
//! complete binary tree of buckets, and every access reads and rewrites a full
//! root-to-leaf path through an obliviously compacted stash. On top of that
//! store, [`ObliviousDfa`] advances one state per input byte using branch-free
//! scans, so the memory addresses touched and comparisons performed are
//! independent of the input bytes and of the states visited.
//!
//! [`Session`] is the intended entry point: it owns an engine and a CSPRNG and
//! exposes the two boundary operations, `load` and `run`.
//!
//! ```
//! use oblivious_automaton::{gapped_pattern_table, Session};
//! use rand::rngs::OsRng;
//!
//! let table = gapped_pattern_table(b"DARPA").unwrap();
//! let mut session = Session::new(15, 128, OsRng);
//! session.load(&table).unwrap();
//! assert_eq!(session.run(b"no match here").unwrap(), -1);
//! assert_eq!(session.run(b"xxDARPAxx").unwrap(), 6);
//! ```

#![warn(missing_docs, rustdoc::all)]

use std::num::TryFromIntError;
use subtle::ConditionallySelectable;
use thiserror::Error;

pub mod automaton;
pub mod boundary;
pub mod bucket;
pub mod database;
pub mod path_oram;
pub mod patterns;
pub mod position_map;
pub mod stash;
pub mod table;
pub(crate) mod utils;

#[cfg(test)]
mod test_utils;

pub use automaton::ObliviousDfa;
pub use boundary::{DebugSink, LogSink, Session, NO_MATCH};
pub use path_oram::PathOram;
pub use patterns::gapped_pattern_table;
pub use table::{Entry, Row, TransitionTable};

/// Numeric type used to identify automaton states, which double as ORAM
/// block addresses.
pub type StateId = u32;

/// Numeric type used to identify leaves of the ORAM tree.
pub type LeafIndex = u32;

/// Numeric type used to represent the number of blocks in a bucket.
pub type BucketSize = usize;

/// Numeric type used to represent the size of the stash in blocks.
pub type StashSize = usize;

/// The number of distinct input symbols, and hence the width of a transition
/// row: one slot per possible byte value.
pub const ALPHABET_SIZE: usize = 256;

/// The reserved symbol value meaning "no more specific entry matched".
/// A wildcard entry acts as the default transition for its row, so it must be
/// ordered after every symbol-specific entry of the same row.
pub const WILDCARD: u8 = 0;

/// The parameter "Z" from the Path ORAM literature that sets the number of blocks per bucket; typical values are 3 or 4.
/// Here we adopt the more conservative setting of 4.
pub const DEFAULT_BLOCKS_PER_BUCKET: BucketSize = 4;

/// Default stash capacity in blocks. Sized so that the probability of the live
/// blocks outgrowing the stash is negligible for the supported tree heights;
/// must be a power of two (the compaction network requires it).
pub const DEFAULT_STASH_SPACE: StashSize = 128;

/// A value that can be stored in the oblivious engine's memory.
pub trait OramBlock:
    Copy + Clone + std::fmt::Debug + Default + PartialEq + ConditionallySelectable
{
}

/// Error type for automaton and ORAM operations.
#[derive(Error, Debug)]
pub enum AutomatonError {
    /// Arithmetic or conversion errors resulting from internal operations.
    #[error("Arithmetic error encountered: {0}")]
    IntegerConversion(#[from] TryFromIntError),
    /// An engine was configured with an unusable capacity or stash shape.
    #[error("Invalid engine configuration.")]
    InvalidConfiguration,
    /// A transition table has more states than the engine can hold.
    #[error("Automaton with {states} states exceeds the engine capacity of {capacity}.")]
    CapacityExceeded {
        /// Number of states in the rejected table.
        states: usize,
        /// Capacity of the engine that rejected it.
        capacity: usize,
    },
    /// A transition row places a symbol-specific entry after a wildcard entry.
    #[error("Malformed transition row {row}: specific entry follows the wildcard.")]
    MalformedRow {
        /// Index of the offending row.
        row: usize,
    },
    /// A state identifier fell outside the engine capacity.
    #[error("Attempted to access an out-of-bounds state.")]
    StateOutOfBounds,
    /// The randomness source failed. The in-progress operation is aborted
    /// before any position map or tree mutation becomes observable.
    #[error("Randomness source failure: {0}")]
    Randomness(#[from] rand::Error),
    /// `run` was invoked on a session with no loaded automaton.
    #[error("No automaton has been loaded.")]
    NotLoaded,
}
