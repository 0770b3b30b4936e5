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

use crate::codec::Family;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::common::ResizeFactor;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::theta::CompactThetaSketch;
use crate::theta::ThetaSketchView;
use crate::theta::hash_table::InsertResult;
use crate::theta::hash_table::MAX_LG_NOM_LONGS;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::hash_table::MIN_LG_ARR_LONGS;
use crate::theta::hash_table::MIN_LG_NOM_LONGS;
use crate::theta::hash_table::ThetaHashTable;
use crate::theta::hash_table::compact_cache;
use crate::theta::preamble::*;

/// Stateful union operator for theta sketches.
///
/// The union accumulates input sketches into an open-addressed cache
/// under the minimum theta seen so far; duplicates are dropped on
/// insertion, so the operator is idempotent and order-insensitive.
///
/// # Example
///
/// ```
/// use theta_setops::theta::CompactThetaSketch;
/// use theta_setops::theta::SetOperationBuilder;
/// use theta_setops::theta::ThetaSketchView;
///
/// let max = i64::MAX as u64;
/// let a = CompactThetaSketch::from_hashes(vec![10, 20, 30], max, 9001, true).unwrap();
/// let b = CompactThetaSketch::from_hashes(vec![20, 40], max, 9001, true).unwrap();
///
/// let mut union = SetOperationBuilder::default().build_union().unwrap();
/// union.update(&a).unwrap();
/// union.update(&b).unwrap();
/// assert_eq!(union.result().estimate(), 4.0);
/// ```
#[derive(Debug)]
pub struct ThetaUnion {
    table: ThetaHashTable,
}

impl ThetaUnion {
    pub(crate) fn new(
        lg_nom_longs: u8,
        resize_factor: ResizeFactor,
        sampling_probability: f32,
        seed_hash: u16,
    ) -> Self {
        Self {
            table: ThetaHashTable::new(
                lg_nom_longs,
                resize_factor,
                sampling_probability,
                seed_hash,
            ),
        }
    }

    /// Incorporate a sketch into the union.
    ///
    /// An empty input leaves the state untouched. A non-empty input
    /// lowers theta to the minimum of both sides and inserts its
    /// retained hashes below that threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the input carries a different seed hash; the
    /// union state is unchanged in that case.
    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        if sketch.is_empty() {
            return Ok(());
        }
        if sketch.seed_hash() != self.table.seed_hash() {
            return Err(Error::seed_mismatch(
                self.table.seed_hash(),
                sketch.seed_hash(),
            ));
        }

        self.table.set_empty(false);
        let theta = self.table.theta().min(sketch.theta64());
        self.table.set_theta(theta);

        for hash in sketch.iter() {
            if hash < theta {
                self.table.try_insert_hash(hash);
            } else if sketch.is_ordered() {
                break; // early stop for ordered sketches
            }
        }
        Ok(())
    }

    /// Present a single raw hash, the seam used by concurrent
    /// producers. Zero hashes are ignored; anything else marks the
    /// union non-empty and is inserted if below theta.
    pub fn update_hash(&mut self, hash: u64) {
        if hash == 0 {
            return;
        }
        self.table.set_empty(false);
        self.table.try_insert_hash(hash);
    }

    /// Returns the union result as an ordered compact sketch.
    pub fn result(&self) -> CompactThetaSketch {
        self.result_with_ordered(true)
    }

    /// Returns the union result as a compact sketch.
    ///
    /// The result is materialized from the working cache; the cache
    /// itself is untouched and further updates may follow.
    pub fn result_with_ordered(&self, ordered: bool) -> CompactThetaSketch {
        let entries = compact_cache(self.table.iter(), self.table.theta(), ordered);
        CompactThetaSketch::from_parts(
            entries,
            self.table.theta(),
            self.table.seed_hash(),
            ordered,
            self.table.is_empty(),
        )
    }

    /// Reset to the initial empty state for reuse.
    pub fn reset(&mut self) {
        self.table.reset();
    }

    /// Whether no non-empty input has been incorporated.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of hashes currently retained by the working cache.
    pub fn num_retained(&self) -> usize {
        self.table.num_retained()
    }

    /// Current theta as u64.
    pub fn theta64(&self) -> u64 {
        self.table.theta()
    }

    /// Persist the full working state: a 3-long preamble followed by
    /// the entire cache array.
    pub fn serialize(&self) -> Vec<u8> {
        let cache = self.table.cache();
        let mut bytes = SketchBytes::with_capacity(24 + cache.len() * HASH_SIZE_BYTES);

        let mut flags = 0u8;
        if self.table.is_empty() {
            flags |= FLAG_IS_EMPTY;
        }
        Preamble {
            pre_longs: PREAMBLE_LONGS_ESTIMATION,
            ser_ver: SERIAL_VERSION,
            family_id: Family::UNION.id,
            lg_arr_longs: self.table.lg_cur_size(),
            lg_nom_longs: self.table.lg_nom_size(),
            flags,
            seed_hash: self.table.seed_hash(),
        }
        .write(&mut bytes);
        bytes.write_u32_le(self.table.num_retained() as u32);
        bytes.write_f32_le(self.table.sampling_probability());
        bytes.write_u64_le(self.table.theta());
        for &slot in cache {
            bytes.write_u64_le(slot);
        }

        bytes.into_bytes()
    }

    /// Heapify a persisted union state, using the default seed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Heapify a persisted union state produced under the given seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is malformed or carries a
    /// different seed hash.
    pub fn deserialize_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        if bytes.len() < 24 {
            return Err(Error::insufficient_data("union preamble"));
        }
        let mut cursor = SketchSlice::new(bytes);
        let pre = Preamble::parse(&mut cursor)?;
        Family::UNION.validate_id(pre.family_id)?;
        Family::UNION.validate_pre_longs(pre.pre_longs)?;
        if pre.ser_ver != SERIAL_VERSION {
            return Err(Error::malformed(format!(
                "set operation state is ser-ver {SERIAL_VERSION} only, got {}",
                pre.ser_ver
            )));
        }
        let seed_hash = pre.validate_seed_hash(compute_seed_hash(seed))?;

        if !(MIN_LG_NOM_LONGS..=MAX_LG_NOM_LONGS).contains(&pre.lg_nom_longs) {
            return Err(Error::malformed(format!(
                "lg_nom_longs {} out of range [{MIN_LG_NOM_LONGS}, {MAX_LG_NOM_LONGS}]",
                pre.lg_nom_longs
            )));
        }
        if !(MIN_LG_ARR_LONGS..=pre.lg_nom_longs + 1).contains(&pre.lg_arr_longs) {
            return Err(Error::malformed(format!(
                "lg_arr_longs {} out of range [{MIN_LG_ARR_LONGS}, {}]",
                pre.lg_arr_longs,
                pre.lg_nom_longs + 1
            )));
        }

        let num_entries = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("num_entries"))?;
        let sampling_probability = cursor
            .read_f32_le()
            .map_err(|_| Error::insufficient_data("sampling_p"))?;
        if !(sampling_probability > 0.0 && sampling_probability <= 1.0) {
            return Err(Error::malformed(format!(
                "sampling probability {sampling_probability} out of range (0, 1]"
            )));
        }
        let theta = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("theta"))?;
        if theta == 0 || theta > MAX_THETA {
            return Err(Error::malformed(format!("theta out of range: {theta}")));
        }

        let cache_longs = 1usize << pre.lg_arr_longs;
        let mut table = ThetaHashTable::from_raw_parts(
            pre.lg_arr_longs,
            pre.lg_nom_longs,
            ResizeFactor::X8,
            sampling_probability,
            theta,
            seed_hash,
            pre.is_empty_flag(),
        );
        for _ in 0..cache_longs {
            let slot = cursor
                .read_u64_le()
                .map_err(|_| Error::insufficient_data("cache"))?;
            if slot == 0 {
                continue;
            }
            if slot >= theta {
                return Err(Error::malformed(format!(
                    "cache entry {slot} violates hash < theta ({theta})"
                )));
            }
            if table.try_insert_hash(slot) != InsertResult::Inserted {
                return Err(Error::malformed(
                    "duplicate entry in persisted union cache",
                ));
            }
        }
        if table.num_retained() != num_entries as usize {
            return Err(Error::malformed(format!(
                "persisted count {} does not match cache population {}",
                num_entries,
                table.num_retained()
            )));
        }

        Ok(Self { table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn union_with_lg(lg_nom: u8) -> ThetaUnion {
        ThetaUnion::new(
            lg_nom,
            ResizeFactor::X8,
            1.0,
            compute_seed_hash(DEFAULT_UPDATE_SEED),
        )
    }

    fn exact_sketch(hashes: Vec<u64>) -> CompactThetaSketch {
        CompactThetaSketch::from_hashes(hashes, MAX_THETA, DEFAULT_UPDATE_SEED, true).unwrap()
    }

    #[test]
    fn test_basic_union() {
        let a = exact_sketch(vec![10, 20, 30]);
        let b = exact_sketch(vec![20, 40]);

        let mut union = union_with_lg(8);
        union.update(&a).unwrap();
        union.update(&b).unwrap();

        let result = union.result();
        assert_eq!(result.estimate(), 4.0);
        assert_eq!(result.iter().collect::<Vec<_>>(), vec![10, 20, 30, 40]);
        assert!(!result.is_empty());
        assert_eq!(result.theta64(), MAX_THETA);
    }

    #[test]
    fn test_union_takes_min_theta() {
        let a = CompactThetaSketch::from_hashes(vec![10, 20], 100, DEFAULT_UPDATE_SEED, true)
            .unwrap();
        let b = CompactThetaSketch::from_hashes(vec![30, 150], 200, DEFAULT_UPDATE_SEED, true)
            .unwrap();

        let mut union = union_with_lg(8);
        union.update(&a).unwrap();
        union.update(&b).unwrap();

        assert_eq!(union.theta64(), 100);
        // 150 from b is at or above the union theta and must not be retained
        let result = union.result();
        assert_eq!(result.iter().collect::<Vec<_>>(), vec![10, 20, 30]);
    }

    #[test]
    fn test_union_with_empty_is_identity() {
        let a = exact_sketch(vec![1, 2, 3]);
        let empty = CompactThetaSketch::empty_with_default_seed();

        let mut union = union_with_lg(8);
        union.update(&a).unwrap();
        union.update(&empty).unwrap();

        let result = union.result();
        assert_eq!(result.estimate(), 3.0);
        assert!(!result.is_empty());
    }

    #[test]
    fn test_union_of_empties_is_empty() {
        let empty = CompactThetaSketch::empty_with_default_seed();
        let mut union = union_with_lg(8);
        union.update(&empty).unwrap();
        union.update(&empty).unwrap();

        let result = union.result();
        assert!(result.is_empty());
        assert_eq!(result.serialize().len(), 8);
    }

    #[test]
    fn test_seed_mismatch_leaves_state_unchanged() {
        let a = exact_sketch(vec![1, 2, 3]);
        let other = CompactThetaSketch::from_hashes(vec![5], MAX_THETA, 1234, true).unwrap();

        let mut union = union_with_lg(8);
        union.update(&a).unwrap();
        let before: Vec<u64> = union.result().iter().collect();
        let theta_before = union.theta64();

        assert!(union.update(&other).is_err());
        assert_eq!(union.result().iter().collect::<Vec<_>>(), before);
        assert_eq!(union.theta64(), theta_before);
    }

    #[test]
    fn test_empty_input_skips_seed_check() {
        let other_seed_empty = CompactThetaSketch::empty(1234);
        let mut union = union_with_lg(8);
        union.update(&other_seed_empty).unwrap();
        assert!(union.is_empty());
    }

    #[test]
    fn test_update_hash() {
        let mut union = union_with_lg(8);
        assert!(union.is_empty());
        union.update_hash(42);
        union.update_hash(42);
        union.update_hash(0);
        assert!(!union.is_empty());
        assert_eq!(union.num_retained(), 1);
        assert!(union.result().is_single_item());
    }

    #[test]
    fn test_union_rebuild_bounds_retained() {
        // lg_nom 4: k = 16, cache caps at 32 and rebuilds beyond 30.
        let mut union = union_with_lg(4);
        let hashes: Vec<u64> = (1..=100u64).map(|i| i * 0x9E37_79B9).collect();
        let s = CompactThetaSketch::from_hashes(hashes, MAX_THETA, DEFAULT_UPDATE_SEED, false)
            .unwrap();
        union.update(&s).unwrap();

        assert!(union.theta64() < MAX_THETA);
        let result = union.result();
        assert!(result.num_retained() <= 32);
        assert!(result.iter().all(|h| h < union.theta64()));
    }

    #[test]
    fn test_reset() {
        let mut union = union_with_lg(8);
        union.update(&exact_sketch(vec![1, 2, 3])).unwrap();
        assert!(!union.is_empty());

        union.reset();
        assert!(union.is_empty());
        assert_eq!(union.num_retained(), 0);
        assert!(union.result().is_empty());
    }

    #[test]
    fn test_serialize_deserialize_state() {
        let mut union = union_with_lg(6);
        union.update(&exact_sketch(vec![5, 10, 15, 20])).unwrap();

        let bytes = union.serialize();
        assert_eq!(bytes[0], 3);
        assert_eq!(bytes[2], Family::UNION.id);

        let mut restored = ThetaUnion::deserialize(&bytes).unwrap();
        assert_eq!(restored.num_retained(), 4);
        assert_eq!(restored.theta64(), union.theta64());

        // The heapified union keeps accumulating
        restored.update(&exact_sketch(vec![25])).unwrap();
        assert_eq!(restored.result().estimate(), 5.0);
    }

    #[test]
    fn test_deserialize_rejects_wrong_family() {
        let union = union_with_lg(6);
        let mut bytes = union.serialize();
        bytes[2] = Family::INTERSECTION.id;
        assert!(ThetaUnion::deserialize(&bytes).is_err());
    }

    #[test]
    fn test_deserialize_rejects_truncated_cache() {
        let mut union = union_with_lg(6);
        union.update(&exact_sketch(vec![5, 10])).unwrap();
        let bytes = union.serialize();
        assert!(ThetaUnion::deserialize(&bytes[..bytes.len() - 8]).is_err());
    }
}
