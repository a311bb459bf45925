// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The trust-boundary surface: the operations an untrusted host may invoke,
//! and the one-way debug channel going the other direction.
//!
//! A [`Session`] stands in for an isolated execution container. The host's
//! side of the boundary (creating the container from a signed image, caching
//! launch credentials, tearing it down, and surfacing that machinery's
//! failures) belongs to the host and never crosses into this crate; the
//! engine sees only `load` and `run` calls and answers with values or errors
//! of its own vocabulary.

use crate::{
    automaton::ObliviousDfa, table::TransitionTable, AutomatonError, StashSize,
    DEFAULT_BLOCKS_PER_BUCKET,
};
use rand::{CryptoRng, RngCore};

/// Sentinel returned by [`Session::run`] when the pattern never matched.
pub const NO_MATCH: i32 = -1;

/// The outbound debug-text channel. Fire-and-forget: emission returns
/// nothing, may drop or truncate arbitrarily, and must never influence
/// control flow inside the boundary.
pub trait DebugSink {
    /// Hands `text` to the host for display.
    fn emit(&self, text: &str);
}

/// The default sink, routing debug text through the `log` facade.
#[derive(Debug, Default)]
pub struct LogSink;

impl DebugSink for LogSink {
    fn emit(&self, text: &str) {
        log::debug!(target: "boundary", "{}", text);
    }
}

/// One boundary session: an engine slot, the CSPRNG available inside the
/// boundary, and the debug sink. Calls are strictly serialized by `&mut`;
/// the stash and tree are shared, unsynchronized resources, and a production
/// host must likewise admit one worker at a time.
#[derive(Debug)]
pub struct Session<R: RngCore + CryptoRng, D: DebugSink = LogSink> {
    engine: Option<ObliviousDfa<DEFAULT_BLOCKS_PER_BUCKET>>,
    capacity: usize,
    stash_space: StashSize,
    rng: R,
    sink: D,
}

impl<R: RngCore + CryptoRng> Session<R, LogSink> {
    /// Creates a session whose engines hold up to `capacity` states with a
    /// `stash_space`-block stash, logging debug output.
    pub fn new(capacity: usize, stash_space: StashSize, rng: R) -> Self {
        Self::with_sink(capacity, stash_space, rng, LogSink)
    }
}

impl<R: RngCore + CryptoRng, D: DebugSink> Session<R, D> {
    /// Creates a session with a caller-supplied debug sink.
    pub fn with_sink(capacity: usize, stash_space: StashSize, rng: R, sink: D) -> Self {
        Self {
            engine: None,
            capacity,
            stash_space,
            rng,
            sink,
        }
    }

    /// Loads `table`, replacing any previously loaded automaton. The engine
    /// is rebuilt from scratch with a fresh position map, an empty tree and
    /// stash, and the cursor at the initial state, so a reload leaves
    /// nothing behind. On error the previous automaton is discarded rather
    /// than kept in an unknown state.
    pub fn load(&mut self, table: &TransitionTable) -> Result<(), AutomatonError> {
        self.engine = None;
        let engine = ObliviousDfa::load(table, self.capacity, self.stash_space, &mut self.rng)?;
        self.engine = Some(engine);
        self.emit("automaton loaded");
        Ok(())
    }

    /// Runs the loaded automaton over `input`. Returns the position at which
    /// it first entered an accepting state, or [`NO_MATCH`]. An absent
    /// pattern is the common case and is not an error; genuine faults abort
    /// the session's current operation instead.
    pub fn run(&mut self, input: &[u8]) -> Result<i32, AutomatonError> {
        let engine = self.engine.as_mut().ok_or(AutomatonError::NotLoaded)?;
        match engine.run(input, &mut self.rng)? {
            Some(position) => Ok(i32::try_from(position)?),
            None => Ok(NO_MATCH),
        }
    }

    /// Emits debug text through the session's sink.
    pub fn emit(&self, text: &str) {
        self.sink.emit(text);
    }
}
