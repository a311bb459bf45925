// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Demonstration transition tables built from plaintext patterns.
//!
//! These builders exist for tests and benchmarks. Constructing a table from
//! a plaintext pattern inside the caller's binary provides no secrecy:
//! anyone who can read the binary can read the pattern. A deployment would
//! receive the table through an encrypted channel from outside the trust
//! boundary; that loader is a collaborator of this crate, not part of it.

use crate::{
    table::{Row, TransitionTable},
    AutomatonError, WILDCARD,
};

/// Builds the table of a substring search for `pattern` in which every
/// adjacent pair of pattern bytes may be separated by at most one arbitrary
/// byte (the shape of the classic `D.?A.?R.?P.?A` demo).
///
/// Each pattern position expands to two states, "just matched this byte"
/// and "matched it one gap byte ago", plus an accepting final state that
/// self-loops on the wildcard. Every state restarts the match on seeing the
/// pattern's first byte again. Patterns with repeated bytes get the same
/// naive treatment the original demo used: no overlap tracking beyond that
/// restart rule.
///
/// Pattern bytes must be nonzero, since symbol 0 is the wildcard encoding.
pub fn gapped_pattern_table(pattern: &[u8]) -> Result<TransitionTable, AutomatonError> {
    if pattern.is_empty() || pattern.contains(&WILDCARD) {
        return Err(AutomatonError::InvalidConfiguration);
    }
    let num_states = 2 * pattern.len();
    u16::try_from(num_states)?;

    let first = pattern[0];
    let restart = (first, 1u16);
    let mut rows = Vec::with_capacity(num_states);

    // State 0: nothing matched yet.
    rows.push(Row::from_entries(&[restart]));

    for k in 1..pattern.len() {
        let advance = (pattern[k], 2 * k as u16 + 1);
        let gap = (WILDCARD, 2 * k as u16);
        // "Just matched byte k-1": may advance, restart, or burn one gap byte.
        rows.push(Row::from_entries(&[restart, advance, gap]));
        // "One gap byte burned": advance or restart, nothing else.
        rows.push(Row::from_entries(&[restart, advance]));
    }

    // Accepting state: holds on any symbol.
    let last = (num_states - 1) as u16;
    rows.push(Row::from_entries(&[(WILDCARD, last)]));

    let mut accepting = vec![false; num_states];
    accepting[num_states - 1] = true;

    TransitionTable::new(rows, accepting)
}
