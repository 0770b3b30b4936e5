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

use crate::common::NumStdDev;
use crate::common::binomial_bounds;
use crate::theta::hash_table::MAX_THETA;

/// Read-only view of a theta sketch.
///
/// This is the capability set the set operation engines consume: the
/// sampling threshold, the emptiness and ordering state, the seed hash
/// of the producing sketch, and iteration over the retained hashes.
/// Heap-backed and memory-backed compact sketches both implement it, so
/// every engine accepts either without copying.
pub trait ThetaSketchView {
    /// Theta as u64. `i64::MAX as u64` denotes 1.0 (exact mode).
    fn theta64(&self) -> u64;

    /// The 16-bit hash of the update seed that produced the samples.
    fn seed_hash(&self) -> u16;

    /// Whether the source set is empty.
    fn is_empty(&self) -> bool;

    /// Whether the retained hashes are in ascending order.
    fn is_ordered(&self) -> bool;

    /// Number of retained hashes.
    fn num_retained(&self) -> usize;

    /// Iterate the retained hashes in storage order.
    fn iter(&self) -> impl Iterator<Item = u64> + '_;

    /// Theta as a fraction (0.0 to 1.0).
    fn theta(&self) -> f64 {
        self.theta64() as f64 / MAX_THETA as f64
    }

    /// Whether the sketch is in estimation mode.
    fn is_estimation_mode(&self) -> bool {
        self.theta64() < MAX_THETA
    }

    /// Cardinality estimate.
    fn estimate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.num_retained() as f64 / self.theta()
    }

    /// Approximate lower error bound at the given number of standard
    /// deviations. Equals the estimate in exact mode.
    fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        if !self.is_estimation_mode() {
            return self.num_retained() as f64;
        }
        // theta is in (0, 1] for any well-formed sketch
        binomial_bounds::lower_bound(self.num_retained() as u64, self.theta(), num_std_dev)
            .expect("theta should always be valid")
    }

    /// Approximate upper error bound at the given number of standard
    /// deviations. Equals the estimate in exact mode.
    fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        if !self.is_estimation_mode() {
            return self.num_retained() as f64;
        }
        binomial_bounds::upper_bound(
            self.num_retained() as u64,
            self.theta(),
            num_std_dev,
            self.is_empty(),
        )
        .expect("theta should always be valid")
    }
}
