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

/// Maximum theta value (signed max for compatibility with Java).
/// Denotes 1.0, i.e. exact mode with no truncation.
pub(crate) const MAX_THETA: u64 = i64::MAX as u64;

/// Minimum log2 of the cache array size
pub(crate) const MIN_LG_ARR_LONGS: u8 = 5;

/// Minimum log2 of nominal entries (nominal entries >= 16)
pub(crate) const MIN_LG_NOM_LONGS: u8 = 4;

/// Maximum log2 of nominal entries
pub(crate) const MAX_LG_NOM_LONGS: u8 = 26;

/// Resize threshold (0.5 = 50% load factor)
const RESIZE_THRESHOLD: f64 = 0.5;

/// Rebuild threshold (15/16 = 93.75% load factor)
pub(crate) const REBUILD_THRESHOLD: f64 = 15.0 / 16.0;

/// Stride hash bits (7 bits for stride calculation)
const STRIDE_HASH_BITS: u8 = 7;

/// Stride mask
const STRIDE_MASK: u64 = (1 << STRIDE_HASH_BITS) - 1;

/// Outcome of presenting one hash to the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InsertResult {
    /// The hash was new; the retained count grew by one.
    Inserted,
    /// The hash is already present.
    Duplicate,
    /// The hash is zero or not below theta.
    RejectedOverTheta,
}

/// Open-addressed hash cache shared by the set operation engines.
///
/// Slots hold raw 64-bit hashes; 0 marks an empty slot. The array
/// capacity is `2^lg_cur_size`, at most `2^(lg_nom_size + 1)`:
/// * below the cap, crossing the load threshold extends the array by
///   the resize factor;
/// * at the cap, crossing the threshold rebuilds: theta drops to the
///   k-th smallest entry and only the lesser entries survive, so the
///   retained set stays exactly `{h | 0 < h < theta}`.
#[derive(Debug)]
pub(crate) struct ThetaHashTable {
    lg_cur_size: u8,
    lg_nom_size: u8,
    lg_max_size: u8,
    resize_factor: ResizeFactor,
    sampling_probability: f32,
    seed_hash: u16,

    // Logical emptiness of the source set. This can be false even when
    // `num_retained` is 0 (e.g. all updates screened by theta).
    is_empty: bool,

    theta: u64,

    entries: Vec<u64>,

    // Number of retained non-zero hashes currently stored in `entries`.
    num_retained: usize,
}

impl ThetaHashTable {
    /// Create a new cache for accumulating under the given nominal size.
    pub fn new(
        lg_nom_size: u8,
        resize_factor: ResizeFactor,
        sampling_probability: f32,
        seed_hash: u16,
    ) -> Self {
        let lg_max_size = lg_nom_size + 1;
        let lg_cur_size =
            starting_sub_multiple(lg_max_size, MIN_LG_ARR_LONGS, resize_factor.lg_value());
        Self::from_raw_parts(
            lg_cur_size,
            lg_nom_size,
            resize_factor,
            sampling_probability,
            starting_theta_from_sampling_probability(sampling_probability),
            seed_hash,
            true,
        )
    }

    /// Create a table with explicit state.
    ///
    /// # Panics
    ///
    /// Panics if `lg_cur_size > lg_nom_size + 1`.
    pub fn from_raw_parts(
        lg_cur_size: u8,
        lg_nom_size: u8,
        resize_factor: ResizeFactor,
        sampling_probability: f32,
        theta: u64,
        seed_hash: u16,
        is_empty: bool,
    ) -> Self {
        let lg_max_size = lg_nom_size + 1;
        assert!(
            lg_cur_size <= lg_max_size,
            "lg_cur_size must be <= lg_nom_size + 1, got lg_cur_size={lg_cur_size}, lg_nom_size={lg_nom_size}"
        );
        let size = if lg_cur_size > 0 { 1 << lg_cur_size } else { 0 };
        let entries = vec![0u64; size];
        Self {
            lg_cur_size,
            lg_nom_size,
            lg_max_size,
            resize_factor,
            sampling_probability,
            seed_hash,
            is_empty,
            theta,
            entries,
            num_retained: 0,
        }
    }

    /// Find index in a given entries array.
    ///
    /// Returns the index of the matching or first empty slot, or None if
    /// the probe wrapped without finding either (full table).
    fn find_in_entries(entries: &[u64], key: u64, lg_size: u8) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }

        let size = entries.len();
        let mask = size - 1;
        let stride = Self::get_stride(key, lg_size);
        let mut index = (key as usize) & mask;
        let loop_index = index;

        loop {
            let probe = entries[index];
            if probe == 0 || probe == key {
                return Some(index);
            }
            index = (index + stride) & mask;
            if index == loop_index {
                return None;
            }
        }
    }

    /// Inserts a pre-hashed value into the table.
    pub fn try_insert_hash(&mut self, hash: u64) -> InsertResult {
        if hash == 0 || hash >= self.theta {
            return InsertResult::RejectedOverTheta;
        }

        let Some(index) = Self::find_in_entries(&self.entries, hash, self.lg_cur_size) else {
            unreachable!(
                "Resize or rebuild should be called to make sure it always can find the entry."
            );
        };

        if self.entries[index] == hash {
            return InsertResult::Duplicate;
        }

        debug_assert_eq!(self.entries[index], 0, "entry should be empty");
        self.entries[index] = hash;
        self.num_retained += 1;

        // Check if we need to resize or rebuild
        let capacity = self.get_capacity();
        if self.num_retained > capacity {
            if self.lg_cur_size <= self.lg_nom_size {
                self.resize();
            } else {
                self.rebuild();
            }
        }
        InsertResult::Inserted
    }

    /// Whether the table currently retains the given hash.
    pub fn contains_hash(&self, hash: u64) -> bool {
        match Self::find_in_entries(&self.entries, hash, self.lg_cur_size) {
            Some(index) => self.entries[index] == hash,
            None => false,
        }
    }

    /// Get capacity threshold
    fn get_capacity(&self) -> usize {
        let fraction = if self.lg_cur_size <= self.lg_nom_size {
            RESIZE_THRESHOLD
        } else {
            REBUILD_THRESHOLD
        };
        (fraction * self.entries.len() as f64) as usize
    }

    /// Resize the hash table
    fn resize(&mut self) {
        let new_lg_size = std::cmp::min(
            self.lg_cur_size + self.resize_factor.lg_value(),
            self.lg_max_size,
        );
        let new_size = 1 << new_lg_size;

        let mut new_entries = vec![0u64; new_size];
        for &entry in &self.entries {
            if entry != 0 {
                let Some(idx) = Self::find_in_entries(&new_entries, entry, new_lg_size) else {
                    unreachable!(
                        "find_in_entries should always return Some if the entry is not empty."
                    );
                };
                new_entries[idx] = entry;
            }
        }

        self.entries = new_entries;
        self.lg_cur_size = new_lg_size;
    }

    /// Rebuild the hash table: theta drops to the k-th smallest entry
    /// and the retained count is reduced to the nominal size k.
    fn rebuild(&mut self) {
        self.entries.retain(|&e| e != 0);
        let k = 1usize << self.lg_nom_size;
        let (lesser, kth, _) = self.entries.select_nth_unstable(k);
        self.theta = *kth;

        let size = 1 << self.lg_cur_size;
        let mut new_entries = vec![0u64; size];
        let mut num_inserted = 0;
        for entry in lesser {
            let Some(idx) = Self::find_in_entries(&new_entries, *entry, self.lg_cur_size) else {
                unreachable!(
                    "find_in_entries should always return Some if the entry is not empty."
                );
            };
            new_entries[idx] = *entry;
            num_inserted += 1;
        }

        debug_assert_eq!(num_inserted, k, "number of inserted entries should be k");
        self.num_retained = num_inserted;
        self.entries = new_entries;
    }

    /// Reset the table to its initial empty state
    pub fn reset(&mut self) {
        let init_theta = starting_theta_from_sampling_probability(self.sampling_probability);
        let init_lg_cur = starting_sub_multiple(
            self.lg_nom_size + 1,
            MIN_LG_ARR_LONGS,
            self.resize_factor.lg_value(),
        );

        if self.entries.len() != 1 << init_lg_cur {
            self.entries.resize(1 << init_lg_cur, 0);
        }
        self.entries.fill(0);
        self.num_retained = 0;
        self.theta = init_theta;
        self.is_empty = true;
        self.lg_cur_size = init_lg_cur;
    }

    pub fn num_retained(&self) -> usize {
        self.num_retained
    }

    pub fn theta(&self) -> u64 {
        self.theta
    }

    pub fn set_theta(&mut self, theta: u64) {
        self.theta = theta;
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn set_empty(&mut self, is_empty: bool) {
        self.is_empty = is_empty;
    }

    /// Iterate the retained (non-zero) hashes in storage order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().copied().filter(|&e| e != 0)
    }

    /// The raw cache including empty slots, for persisting.
    pub fn cache(&self) -> &[u64] {
        &self.entries
    }

    pub fn lg_cur_size(&self) -> u8 {
        self.lg_cur_size
    }

    pub fn lg_nom_size(&self) -> u8 {
        self.lg_nom_size
    }

    pub fn sampling_probability(&self) -> f32 {
        self.sampling_probability
    }

    pub fn seed_hash(&self) -> u16 {
        self.seed_hash
    }

    /// Get stride for hash table probing
    fn get_stride(key: u64, lg_size: u8) -> usize {
        (2 * ((key >> lg_size) & STRIDE_MASK) + 1) as usize
    }
}

/// Compute initial lg_size for hash table based on target lg_size, minimum lg_size, and resize
/// factor. Make sure `lg_target = lg_init + n * lg_resize_factor`, where `n` is an integer and
/// `lg_init >= lg_min`
pub(crate) fn starting_sub_multiple(lg_target: u8, lg_min: u8, lg_resize_factor: u8) -> u8 {
    if lg_target <= lg_min {
        lg_min
    } else if lg_resize_factor == 0 {
        lg_target
    } else {
        ((lg_target - lg_min) % lg_resize_factor) + lg_min
    }
}

/// Compute initial theta for a cache based on sampling probability.
pub(crate) fn starting_theta_from_sampling_probability(sampling_probability: f32) -> u64 {
    if sampling_probability < 1.0 {
        (MAX_THETA as f64 * sampling_probability as f64) as u64
    } else {
        MAX_THETA
    }
}

/// lg of a cache sized to hold `count` entries with room to spare:
/// twice the smallest power of two with `count / size <= threshold`,
/// never below the minimum array size. Loading `count` entries into a
/// cache of this size can never cross the rebuild threshold.
pub(crate) fn lg_size_from_count(count: usize, threshold: f64) -> u8 {
    let target = ceil_pow2((count as f64 / threshold).ceil().max(1.0) as usize);
    std::cmp::max(MIN_LG_ARR_LONGS, lg_of_pow2(target) + 1)
}

/// Build a probe table from an existing retained set, keeping only
/// hashes below `theta`. Used to answer membership queries during
/// intersection and A-not-B filtering.
pub(crate) fn convert_to_hash_table(
    hashes: impl Iterator<Item = u64>,
    count: usize,
    theta: u64,
    seed_hash: u16,
) -> ThetaHashTable {
    let lg_size = lg_size_from_count(count, REBUILD_THRESHOLD);
    let mut table = ThetaHashTable::from_raw_parts(
        lg_size,
        lg_size - 1,
        ResizeFactor::X1,
        1.0,
        theta,
        seed_hash,
        false,
    );
    for hash in hashes {
        if hash != 0 && hash < theta {
            table.try_insert_hash(hash);
        }
    }
    table
}

/// Densify a raw cache: all non-zero hashes below `theta`, ascending if
/// `ordered` is requested.
pub(crate) fn compact_cache(
    raw: impl Iterator<Item = u64>,
    theta: u64,
    ordered: bool,
) -> Vec<u64> {
    let mut out: Vec<u64> = raw.filter(|&h| h != 0 && h < theta).collect();
    if ordered {
        out.sort_unstable();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::DEFAULT_UPDATE_SEED;
    use crate::hash::compute_seed_hash;

    fn seed_hash() -> u16 {
        compute_seed_hash(DEFAULT_UPDATE_SEED)
    }

    // Mixer borrowed from splitmix64 so the tests can fabricate
    // well-spread hashes without a producing sketch.
    fn scramble(i: u64) -> u64 {
        let mut z = i.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        (z ^ (z >> 31)) >> 1
    }

    #[test]
    fn test_new_hash_table() {
        let table = ThetaHashTable::new(8, ResizeFactor::X8, 1.0, seed_hash());

        assert_eq!(
            table.lg_cur_size,
            starting_sub_multiple(8 + 1, MIN_LG_ARR_LONGS, ResizeFactor::X8.lg_value())
        );
        assert_eq!(table.theta(), MAX_THETA);
        assert_eq!(table.num_retained(), 0);
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn test_try_insert_hash() {
        let mut table = ThetaHashTable::new(5, ResizeFactor::X8, 1.0, seed_hash());

        assert_eq!(table.try_insert_hash(42), InsertResult::Inserted);
        assert_eq!(table.num_retained(), 1);

        assert_eq!(table.try_insert_hash(42), InsertResult::Duplicate);
        assert_eq!(table.num_retained(), 1);

        assert_eq!(table.try_insert_hash(0), InsertResult::RejectedOverTheta);

        table.set_theta(10);
        assert_eq!(table.try_insert_hash(10), InsertResult::RejectedOverTheta);
        assert_eq!(table.try_insert_hash(11), InsertResult::RejectedOverTheta);
        assert_eq!(table.try_insert_hash(9), InsertResult::Inserted);
        assert_eq!(table.num_retained(), 2);
    }

    #[test]
    fn test_contains_hash() {
        let mut table = ThetaHashTable::new(8, ResizeFactor::X8, 1.0, seed_hash());
        for i in 1..=10u64 {
            table.try_insert_hash(scramble(i));
        }
        for i in 1..=10u64 {
            assert!(table.contains_hash(scramble(i)));
        }
        assert!(!table.contains_hash(scramble(11)));
    }

    #[test]
    fn test_resize() {
        let mut table = ThetaHashTable::new(8, ResizeFactor::X2, 1.0, seed_hash());

        assert_eq!(table.entries.len(), 32);

        // Insert enough values to trigger resize (50% threshold):
        // capacity = 32 * 0.5 = 16
        let mut inserted = 0;
        for i in 1..=20u64 {
            if table.try_insert_hash(scramble(i)) == InsertResult::Inserted {
                inserted += 1;
            }
        }

        assert_eq!(table.num_retained(), inserted);
        assert_eq!(table.entries.len(), 64);
    }

    #[test]
    fn test_rebuild_lowers_theta_and_keeps_lesser_entries() {
        let mut table = ThetaHashTable::new(5, ResizeFactor::X8, 1.0, seed_hash());

        assert_eq!(table.lg_cur_size, 6);
        assert_eq!(table.entries.len(), 64);
        assert_eq!(table.theta(), MAX_THETA);

        let mut inserted_hashes = vec![];
        for i in 1..=100u64 {
            let hash = scramble(i);
            if table.try_insert_hash(hash) == InsertResult::Inserted {
                inserted_hashes.push(hash);
            }
        }

        let new_theta = table.theta();
        assert!(new_theta < MAX_THETA, "theta should drop after rebuild");
        // A rebuild cuts back to k; later inserts may land below theta
        // again, but the count stays under the rebuild threshold.
        assert!(table.num_retained() >= 32);
        assert!(table.num_retained() <= 60);
        assert!(table.iter().all(|e| e < new_theta));

        // Theta is the k-th smallest of everything inserted before the
        // last rebuild, so every retained entry is among the smallest.
        inserted_hashes.sort_unstable();
        for entry in table.iter() {
            assert!(inserted_hashes.binary_search(&entry).is_ok());
        }
    }

    #[test]
    fn test_reset() {
        let mut table = ThetaHashTable::new(8, ResizeFactor::X8, 1.0, seed_hash());
        let init_theta = table.theta();
        let init_lg_cur = table.lg_cur_size;
        let init_entries = table.entries.len();

        for i in 1..=10u64 {
            table.try_insert_hash(scramble(i));
        }
        table.set_empty(false);
        assert!(table.num_retained() > 0);

        table.reset();

        assert!(table.is_empty());
        assert_eq!(table.num_retained(), 0);
        assert_eq!(table.theta(), init_theta);
        assert_eq!(table.lg_cur_size, init_lg_cur);
        assert_eq!(table.entries.len(), init_entries);
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn test_sampling_probability_lowers_starting_theta() {
        let table = ThetaHashTable::new(8, ResizeFactor::X8, 0.5, seed_hash());
        assert_eq!(table.theta(), (MAX_THETA as f64 * 0.5) as u64);
    }

    #[test]
    fn test_lg_size_from_count() {
        // Minimum array size applies to tiny counts.
        assert_eq!(lg_size_from_count(1, REBUILD_THRESHOLD), MIN_LG_ARR_LONGS);
        assert_eq!(lg_size_from_count(0, REBUILD_THRESHOLD), MIN_LG_ARR_LONGS);
        // 100 / (15/16) = 106.7 -> 128 -> doubled to 256
        assert_eq!(lg_size_from_count(100, REBUILD_THRESHOLD), 8);
        // Loading count entries never crosses the rebuild threshold.
        for count in [1usize, 15, 16, 17, 100, 1000, 4096] {
            let lg = lg_size_from_count(count, REBUILD_THRESHOLD);
            let capacity = (REBUILD_THRESHOLD * (1u64 << lg) as f64) as usize;
            assert!(count <= capacity, "count {count} exceeds capacity {capacity}");
        }
    }

    #[test]
    fn test_convert_to_hash_table_screens_theta() {
        let hashes = [1u64, 5, 9, 20, 30];
        let table = convert_to_hash_table(hashes.iter().copied(), hashes.len(), 10, seed_hash());
        assert_eq!(table.num_retained(), 3);
        assert!(table.contains_hash(1));
        assert!(table.contains_hash(5));
        assert!(table.contains_hash(9));
        assert!(!table.contains_hash(20));
    }

    #[test]
    fn test_compact_cache() {
        let raw = [0u64, 30, 0, 5, 9, 0, 20, 1];
        let compacted = compact_cache(raw.iter().copied(), 25, true);
        assert_eq!(compacted, vec![1, 5, 9, 20]);

        let unordered = compact_cache(raw.iter().copied(), 25, false);
        assert_eq!(unordered.len(), 4);
        assert!(!unordered.contains(&0));
        assert!(!unordered.contains(&30));
    }
}
