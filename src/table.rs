// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The transition-table value types stored in the oblivious engine.

use crate::{AutomatonError, OramBlock, ALPHABET_SIZE, WILDCARD};
use subtle::{Choice, ConditionallySelectable};

/// One transition rule: a symbol (or [`WILDCARD`]) and the state to move to
/// when it matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    /// The input byte this entry matches, or [`WILDCARD`].
    pub symbol: u8,
    /// The state the automaton moves to when this entry fires.
    pub next_state: u16,
}

impl ConditionallySelectable for Entry {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        Entry {
            symbol: u8::conditional_select(&a.symbol, &b.symbol, choice),
            next_state: u16::conditional_select(&a.next_state, &b.next_state, choice),
        }
    }
}

/// The transition row for one state: one [`Entry`] slot per possible input
/// byte, scanned in order by the stepper. Unused slots are zero, and a zero
/// entry is a wildcard sending the automaton to state 0.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Row(pub(crate) [Entry; ALPHABET_SIZE]);

impl Row {
    /// Builds a row from its leading entries; the remaining slots stay zero.
    ///
    /// Entries are kept in the given order, which the oblivious scan relies
    /// on: a wildcard only fires if nothing before it matched.
    pub fn from_entries(entries: &[(u8, u16)]) -> Self {
        assert!(entries.len() <= ALPHABET_SIZE);
        let mut row = Row::default();
        for (i, (symbol, next_state)) in entries.iter().enumerate() {
            row.0[i] = Entry {
                symbol: *symbol,
                next_state: *next_state,
            };
        }
        row
    }

    /// The row's entries in scanning order.
    pub fn entries(&self) -> &[Entry; ALPHABET_SIZE] {
        &self.0
    }
}

impl Default for Row {
    fn default() -> Self {
        Row([Entry::default(); ALPHABET_SIZE])
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Trailing zero entries carry no information; elide them.
        let used = self.0.iter().rposition(|e| *e != Entry::default());
        let count = used.map_or(0, |i| i + 1);
        f.debug_list().entries(self.0[..count].iter()).finish()
    }
}

impl ConditionallySelectable for Row {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        let mut result = Row::default();
        for i in 0..ALPHABET_SIZE {
            result.0[i] = Entry::conditional_select(&a.0[i], &b.0[i], choice);
        }
        result
    }
}

impl OramBlock for Row {}

/// A complete automaton description: one transition row per state, plus the
/// set of accepting states. Validated on construction so that the loader
/// never exposes partially-loaded state for a malformed table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionTable {
    rows: Vec<Row>,
    accepting: Vec<bool>,
}

impl TransitionTable {
    /// Validates and assembles a transition table.
    ///
    /// Rejects rows in which a symbol-specific entry follows a wildcard
    /// entry (the scan would otherwise take the wildcard first and the
    /// specific entry could never fire as a fallback), and rows whose
    /// targets point outside the table.
    pub fn new(rows: Vec<Row>, accepting: Vec<bool>) -> Result<Self, AutomatonError> {
        if rows.is_empty() || rows.len() != accepting.len() {
            return Err(AutomatonError::InvalidConfiguration);
        }
        for (index, row) in rows.iter().enumerate() {
            let mut wildcard_seen = false;
            for entry in row.entries() {
                if entry.symbol == WILDCARD {
                    wildcard_seen = true;
                } else if wildcard_seen {
                    return Err(AutomatonError::MalformedRow { row: index });
                }
                if usize::from(entry.next_state) >= rows.len() {
                    return Err(AutomatonError::StateOutOfBounds);
                }
            }
        }
        Ok(Self { rows, accepting })
    }

    /// The number of states described by this table.
    pub fn num_states(&self) -> usize {
        self.rows.len()
    }

    /// The transition rows, indexed by state.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The accepting flags, indexed by state.
    pub fn accepting(&self) -> &[bool] {
        &self.accepting
    }
}
