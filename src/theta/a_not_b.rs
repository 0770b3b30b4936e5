// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::theta::CompactThetaSketch;
use crate::theta::ThetaSketchView;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::hash_table::convert_to_hash_table;

/// Stateful A-not-B operator for theta sketches.
///
/// [`set_a`](Self::set_a) loads the minuend; each subsequent
/// [`not_b`](Self::not_b) removes another subtrahend's hashes, so
/// `A \ B1 \ B2 \ ...` is a sequence of calls. Unlike union and
/// intersection this operator never persists its own state; results go
/// to the heap or a caller-provided buffer via the compact sketch.
///
/// # Example
///
/// ```
/// use theta_setops::theta::CompactThetaSketch;
/// use theta_setops::theta::ThetaAnotB;
/// use theta_setops::theta::ThetaSketchView;
///
/// let max = i64::MAX as u64;
/// let a = CompactThetaSketch::from_hashes(vec![1, 2, 3], max, 9001, true).unwrap();
/// let b = CompactThetaSketch::from_hashes(vec![3, 4], max, 9001, true).unwrap();
///
/// let mut op = ThetaAnotB::new_with_default_seed();
/// op.set_a(&a).unwrap();
/// op.not_b(&b).unwrap();
/// assert_eq!(op.result().estimate(), 2.0);
/// ```
#[derive(Debug)]
pub struct ThetaAnotB {
    seed_hash: u16,
    theta: u64,
    is_empty: bool,
    entries: Vec<u64>,
}

impl ThetaAnotB {
    /// Creates a new A-not-B operator for the given `seed`.
    pub fn new(seed: u64) -> Self {
        Self::from_seed_hash(compute_seed_hash(seed))
    }

    /// Creates a new A-not-B operator with the default seed.
    pub fn new_with_default_seed() -> Self {
        Self::new(DEFAULT_UPDATE_SEED)
    }

    pub(crate) fn from_seed_hash(seed_hash: u16) -> Self {
        Self {
            seed_hash,
            theta: MAX_THETA,
            is_empty: true,
            entries: Vec::new(),
        }
    }

    /// Load the minuend. Replaces any previous accumulator state.
    ///
    /// An empty `A` resets the operator to the empty result.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-empty `A` carries a different seed
    /// hash; the operator is reset in that case.
    pub fn set_a<S: ThetaSketchView>(&mut self, a: &S) -> Result<(), Error> {
        if !a.is_empty() && a.seed_hash() != self.seed_hash {
            self.reset();
            return Err(Error::seed_mismatch(self.seed_hash, a.seed_hash()));
        }
        self.theta = a.theta64();
        self.is_empty = a.is_empty();
        self.entries = if a.is_empty() {
            Vec::new()
        } else {
            a.iter().collect()
        };
        Ok(())
    }

    /// Remove a subtrahend's hashes from the accumulator.
    ///
    /// An empty `B` is a no-op. Otherwise theta drops to the minimum of
    /// both sides and every accumulator hash found in `B` (or at or
    /// above the new theta) is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-empty `B` carries a different seed
    /// hash; the accumulator is unchanged in that case.
    pub fn not_b<S: ThetaSketchView>(&mut self, b: &S) -> Result<(), Error> {
        if b.is_empty() {
            return Ok(());
        }
        if b.seed_hash() != self.seed_hash {
            return Err(Error::seed_mismatch(self.seed_hash, b.seed_hash()));
        }

        self.theta = self.theta.min(b.theta64());
        if self.entries.is_empty() {
            return Ok(());
        }

        let b_table = convert_to_hash_table(b.iter(), b.num_retained(), self.theta, self.seed_hash);
        let theta = self.theta;
        self.entries
            .retain(|&h| h < theta && !b_table.contains_hash(h));
        Ok(())
    }

    /// Returns the difference as an ordered compact sketch.
    ///
    /// Before [`set_a`](Self::set_a) the accumulator is empty and so is
    /// the result. The emptiness correction rule applies: zero retained
    /// at full theta is the empty sketch.
    pub fn result(&self) -> CompactThetaSketch {
        self.result_with_ordered(true)
    }

    /// Returns the difference as a compact sketch.
    pub fn result_with_ordered(&self, ordered: bool) -> CompactThetaSketch {
        let mut entries = self.entries.clone();
        if ordered {
            entries.sort_unstable();
        }
        CompactThetaSketch::from_parts(entries, self.theta, self.seed_hash, ordered, self.is_empty)
    }

    /// Reset to the initial state for reuse.
    pub fn reset(&mut self) {
        self.theta = MAX_THETA;
        self.is_empty = true;
        self.entries.clear();
    }
}

/// Single-shot A-not-B: `a \ b` as a compact sketch.
///
/// If `a` is empty the result is empty; if `b` is empty the result is
/// `a` with the requested ordering.
///
/// # Errors
///
/// Returns an error if the inputs carry different seed hashes.
pub fn a_not_b<A, B>(a: &A, b: &B, ordered: bool) -> Result<CompactThetaSketch, Error>
where
    A: ThetaSketchView,
    B: ThetaSketchView,
{
    let mut op = ThetaAnotB::from_seed_hash(if a.is_empty() {
        b.seed_hash()
    } else {
        a.seed_hash()
    });
    op.set_a(a)?;
    op.not_b(b)?;
    Ok(op.result_with_ordered(ordered))
}
