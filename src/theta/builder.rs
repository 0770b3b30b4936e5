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

use crate::common::ResizeFactor;
use crate::common::ceil_pow2;
use crate::common::lg_of_pow2;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::mem::MemoryRequestServer;
use crate::theta::MemoryUnion;
use crate::theta::ThetaAnotB;
use crate::theta::ThetaIntersection;
use crate::theta::ThetaUnion;
use crate::theta::hash_table::MAX_LG_NOM_LONGS;
use crate::theta::hash_table::MIN_LG_NOM_LONGS;

/// Default nominal entries (k = 4096)
const DEFAULT_NOM_ENTRIES: usize = 1 << 12;

/// Configures and constructs set operation engines.
///
/// All settings have defaults and may be given in any order; validation
/// happens when an engine is built.
///
/// # Examples
///
/// ```
/// use theta_setops::theta::SetOperationBuilder;
/// use theta_setops::theta::ThetaSketchView;
///
/// let mut union = SetOperationBuilder::default()
///     .nom_entries(1 << 14)
///     .seed(9001)
///     .build_union()
///     .unwrap();
/// union.update_hash(42);
/// assert_eq!(union.result().estimate(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct SetOperationBuilder {
    nom_entries: usize,
    seed: u64,
    sampling_probability: f32,
    resize_factor: ResizeFactor,
}

impl Default for SetOperationBuilder {
    fn default() -> Self {
        Self {
            nom_entries: DEFAULT_NOM_ENTRIES,
            seed: DEFAULT_UPDATE_SEED,
            sampling_probability: 1.0,
            resize_factor: ResizeFactor::X8,
        }
    }
}

impl SetOperationBuilder {
    /// Set the nominal entry count (k). Coerced to the next power of
    /// two at build time; must land in `[16, 2^26]`.
    pub fn nom_entries(mut self, nom_entries: usize) -> Self {
        self.nom_entries = nom_entries;
        self
    }

    /// Set the update seed shared with the producing sketches.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the up-front sampling probability p. Must be in (0.0, 1.0].
    pub fn sampling_probability(mut self, probability: f32) -> Self {
        self.sampling_probability = probability;
        self
    }

    /// Set the cache resize factor.
    pub fn resize_factor(mut self, factor: ResizeFactor) -> Self {
        self.resize_factor = factor;
        self
    }

    fn validated_lg_nom(&self) -> Result<u8, Error> {
        if !(self.sampling_probability > 0.0 && self.sampling_probability <= 1.0) {
            return Err(Error::invalid_argument(format!(
                "sampling probability must be in (0.0, 1.0], got {}",
                self.sampling_probability
            )));
        }
        let coerced = ceil_pow2(self.nom_entries.max(1));
        let lg_nom = lg_of_pow2(coerced);
        if !(MIN_LG_NOM_LONGS..=MAX_LG_NOM_LONGS).contains(&lg_nom) {
            return Err(Error::invalid_argument(format!(
                "nominal entries must be in [{}, {}], got {}",
                1usize << MIN_LG_NOM_LONGS,
                1usize << MAX_LG_NOM_LONGS,
                self.nom_entries
            )));
        }
        Ok(lg_nom)
    }

    /// Build a heap-backed union.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build_union(&self) -> Result<ThetaUnion, Error> {
        let lg_nom = self.validated_lg_nom()?;
        Ok(ThetaUnion::new(
            lg_nom,
            self.resize_factor,
            self.sampling_probability,
            compute_seed_hash(self.seed),
        ))
    }

    /// Build a union whose working state lives in `dst`.
    ///
    /// `dst` must hold the starting cache
    /// ([`max_union_bytes`] sizes a buffer that never grows); `request`
    /// supplies replacement buffers when the cache outgrows `dst`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or `dst` is too
    /// small.
    pub fn build_union_in<'a>(
        &self,
        dst: &'a mut [u8],
        request: Option<&'a dyn MemoryRequestServer>,
    ) -> Result<MemoryUnion<'a>, Error> {
        let lg_nom = self.validated_lg_nom()?;
        MemoryUnion::initialize(
            dst,
            lg_nom,
            self.resize_factor,
            self.sampling_probability,
            compute_seed_hash(self.seed),
            request,
        )
    }

    /// Build an intersection.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build_intersection(&self) -> Result<ThetaIntersection, Error> {
        self.validated_lg_nom()?;
        Ok(ThetaIntersection::from_seed_hash(compute_seed_hash(
            self.seed,
        )))
    }

    /// Build an A-not-B operator. A-not-B never persists its own state,
    /// so no destination-buffer form exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build_a_not_b(&self) -> Result<ThetaAnotB, Error> {
        self.validated_lg_nom()?;
        Ok(ThetaAnotB::from_seed_hash(compute_seed_hash(self.seed)))
    }
}

/// Bytes a memory-backed union for `nom_entries` can ever need:
/// a 3-long preamble plus a full cache of `2 * ceil_pow2(nom_entries)`
/// longs.
pub fn max_union_bytes(nom_entries: usize) -> usize {
    24 + 16 * ceil_pow2(nom_entries.max(1))
}

/// Bytes a persisted intersection for `nom_entries` can ever need.
pub fn max_intersection_bytes(nom_entries: usize) -> usize {
    24 + 16 * ceil_pow2(nom_entries.max(1))
}

/// Bytes an A-not-B result over inputs of at most `max_nom_entries`
/// can ever need.
pub fn max_a_not_b_result_bytes(max_nom_entries: usize) -> usize {
    24 + 15 * ceil_pow2(max_nom_entries.max(1))
}
