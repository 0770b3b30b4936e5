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

use byteorder::ByteOrder;
use byteorder::LittleEndian;

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
use crate::theta::hash_table::MAX_THETA;
use crate::theta::hash_table::MIN_LG_ARR_LONGS;
use crate::theta::hash_table::REBUILD_THRESHOLD;
use crate::theta::hash_table::ThetaHashTable;
use crate::theta::hash_table::compact_cache;
use crate::theta::hash_table::lg_size_from_count;
use crate::theta::preamble::*;

/// Stateful intersection operator for theta sketches.
///
/// A virgin intersection (before any update) represents the universal
/// set and has no defined result; use [`has_result`](Self::has_result)
/// to check, or match the `IllegalState` error from
/// [`result`](Self::result).
#[derive(Debug)]
pub struct ThetaIntersection {
    is_valid: bool,
    table: ThetaHashTable,
}

impl ThetaIntersection {
    /// Creates a new intersection operator for the given `seed`.
    pub fn new(seed: u64) -> Self {
        Self::from_seed_hash(compute_seed_hash(seed))
    }

    /// Creates a new intersection operator with the default seed.
    pub fn new_with_default_seed() -> Self {
        Self::new(DEFAULT_UPDATE_SEED)
    }

    pub(crate) fn from_seed_hash(seed_hash: u16) -> Self {
        Self {
            is_valid: false,
            table: ThetaHashTable::from_raw_parts(
                0,
                0,
                ResizeFactor::X1,
                1.0,
                MAX_THETA,
                seed_hash,
                false,
            ),
        }
    }

    /// Updates the intersection with a given sketch.
    ///
    /// The intersection can be viewed as starting from the "universe"
    /// set, and every update can reduce the current set to leave the
    /// overlapping subset only.
    ///
    /// # Errors
    ///
    /// Returns an error if the input carries a different seed hash, or
    /// if the input turns out to be internally inconsistent.
    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        let new_default_table = |table: &ThetaHashTable| {
            ThetaHashTable::from_raw_parts(
                0,
                0,
                ResizeFactor::X1,
                1.0,
                table.theta(),
                table.seed_hash(),
                table.is_empty(),
            )
        };

        // The empty state is terminal.
        if self.table.is_empty() {
            return Ok(());
        }

        if !sketch.is_empty() && sketch.seed_hash() != self.table.seed_hash() {
            return Err(Error::seed_mismatch(
                self.table.seed_hash(),
                sketch.seed_hash(),
            ));
        }

        self.table
            .set_empty(self.table.is_empty() || sketch.is_empty());
        let theta = if self.table.is_empty() {
            MAX_THETA
        } else {
            self.table.theta().min(sketch.theta64())
        };
        self.table.set_theta(theta);

        if self.is_valid && self.table.num_retained() == 0 {
            return Ok(());
        }

        if sketch.num_retained() == 0 {
            self.is_valid = true;
            self.table = new_default_table(&self.table);
            return Ok(());
        }

        if !self.is_valid {
            // first update, load the incoming sketch
            self.is_valid = true;
            let lg_size = lg_size_from_count(sketch.num_retained(), REBUILD_THRESHOLD);
            self.table = ThetaHashTable::from_raw_parts(
                lg_size,
                lg_size - 1,
                ResizeFactor::X1,
                1.0,
                self.table.theta(),
                self.table.seed_hash(),
                self.table.is_empty(),
            );
            for hash in sketch.iter() {
                if self.table.try_insert_hash(hash) != InsertResult::Inserted {
                    return Err(Error::invalid_argument(
                        "insert entries from sketch fail, possibly corrupted input sketch",
                    ));
                }
            }
            // Safety check.
            if self.table.num_retained() != sketch.num_retained() {
                return Err(Error::invalid_argument(
                    "num entries mismatch, possibly corrupted input sketch",
                ));
            }
        } else {
            let max_matches = self.table.num_retained().min(sketch.num_retained());
            let mut matched_entries = Vec::with_capacity(max_matches);
            let mut count = 0;
            for hash in sketch.iter() {
                if hash < self.table.theta() {
                    if self.table.contains_hash(hash) {
                        if matched_entries.len() == max_matches {
                            return Err(Error::invalid_argument(
                                "max matches exceeded, possibly corrupted input sketch",
                            ));
                        }
                        matched_entries.push(hash);
                    }
                } else if sketch.is_ordered() {
                    break; // early stop for ordered sketches
                }
                count += 1;
            }
            // Safety check.
            if count > sketch.num_retained() {
                return Err(Error::invalid_argument(
                    "more keys than expected, possibly corrupted input sketch",
                ));
            } else if !sketch.is_ordered() && count < sketch.num_retained() {
                return Err(Error::invalid_argument(
                    "fewer keys than expected, possibly corrupted input sketch",
                ));
            }
            if matched_entries.is_empty() {
                self.table = new_default_table(&self.table);
                if self.table.theta() == MAX_THETA {
                    self.table.set_empty(true);
                }
            } else {
                let lg_size = lg_size_from_count(matched_entries.len(), REBUILD_THRESHOLD);
                self.table = ThetaHashTable::from_raw_parts(
                    lg_size,
                    lg_size - 1,
                    ResizeFactor::X1,
                    1.0,
                    self.table.theta(),
                    self.table.seed_hash(),
                    self.table.is_empty(),
                );
                for hash in matched_entries {
                    if self.table.try_insert_hash(hash) != InsertResult::Inserted {
                        return Err(Error::invalid_argument(
                            "duplicate key, possibly corrupted input sketch",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns whether this operator has received at least one update.
    pub fn has_result(&self) -> bool {
        self.is_valid
    }

    /// Returns the intersection result as an ordered compact sketch.
    ///
    /// # Errors
    ///
    /// Returns an `IllegalState` error when called before the first
    /// [`update`](Self::update).
    pub fn result(&self) -> Result<CompactThetaSketch, Error> {
        self.result_with_ordered(true)
    }

    /// Returns the intersection result as a compact sketch.
    ///
    /// # Errors
    ///
    /// Returns an `IllegalState` error when called before the first
    /// [`update`](Self::update).
    pub fn result_with_ordered(&self, ordered: bool) -> Result<CompactThetaSketch, Error> {
        if !self.is_valid {
            return Err(Error::illegal_state(
                "result() called before the first update()",
            ));
        }
        let entries = compact_cache(self.table.iter(), self.table.theta(), ordered);
        Ok(CompactThetaSketch::from_parts(
            entries,
            self.table.theta(),
            self.table.seed_hash(),
            ordered,
            self.table.is_empty(),
        ))
    }

    /// Persist the full working state: a 3-long preamble followed by
    /// the cache array (absent when there is no cache).
    ///
    /// A virgin operator is encoded as non-empty with zero retained at
    /// full theta; that tuple cannot describe a valid state, which the
    /// correction rule would have normalized to empty.
    pub fn serialize(&self) -> Vec<u8> {
        let cache = self.table.cache();
        let lg_arr_longs = if cache.is_empty() {
            0
        } else {
            self.table.lg_cur_size()
        };
        let mut bytes = SketchBytes::with_capacity(24 + cache.len() * HASH_SIZE_BYTES);

        let mut flags = 0u8;
        if self.table.is_empty() {
            flags |= FLAG_IS_EMPTY;
        }
        Preamble {
            pre_longs: PREAMBLE_LONGS_ESTIMATION,
            ser_ver: SERIAL_VERSION,
            family_id: Family::INTERSECTION.id,
            lg_arr_longs,
            lg_nom_longs: 0,
            flags,
            seed_hash: self.table.seed_hash(),
        }
        .write(&mut bytes);
        bytes.write_u32_le(self.table.num_retained() as u32);
        bytes.write_u32_le(DEFAULT_P_FLOAT_BITS);
        bytes.write_u64_le(self.table.theta());
        for &slot in cache {
            bytes.write_u64_le(slot);
        }

        bytes.into_bytes()
    }

    /// Heapify a persisted intersection state, using the default seed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Heapify a persisted intersection state produced under the given
    /// seed.
    pub fn deserialize_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        let header = IntersectionImage::parse(bytes, seed)?;

        if header.lg_arr_longs == 0 {
            let table = ThetaHashTable::from_raw_parts(
                0,
                0,
                ResizeFactor::X1,
                1.0,
                header.theta,
                header.seed_hash,
                header.empty,
            );
            return Ok(Self {
                is_valid: header.is_valid(),
                table,
            });
        }

        let mut table = ThetaHashTable::from_raw_parts(
            header.lg_arr_longs,
            header.lg_arr_longs - 1,
            ResizeFactor::X1,
            1.0,
            header.theta,
            header.seed_hash,
            header.empty,
        );
        for slot in header.cache_iter(bytes) {
            if slot == 0 {
                continue;
            }
            if slot >= header.theta {
                return Err(Error::malformed(format!(
                    "cache entry {slot} violates hash < theta ({})",
                    header.theta
                )));
            }
            if table.try_insert_hash(slot) != InsertResult::Inserted {
                return Err(Error::malformed(
                    "duplicate entry in persisted intersection cache",
                ));
            }
        }
        if table.num_retained() != header.num_entries {
            return Err(Error::malformed(format!(
                "persisted count {} does not match cache population {}",
                header.num_entries,
                table.num_retained()
            )));
        }

        Ok(Self {
            is_valid: true,
            table,
        })
    }

    /// Wrap a persisted intersection state read-only, using the default
    /// seed. The buffer is aliased, not copied.
    pub fn wrap(bytes: &[u8]) -> Result<WrappedIntersection<'_>, Error> {
        Self::wrap_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Wrap a persisted intersection state read-only.
    pub fn wrap_with_seed(bytes: &[u8], seed: u64) -> Result<WrappedIntersection<'_>, Error> {
        let header = IntersectionImage::parse(bytes, seed)?;
        let mut population = 0usize;
        for slot in header.cache_iter(bytes) {
            if slot == 0 {
                continue;
            }
            if slot >= header.theta {
                return Err(Error::malformed(format!(
                    "cache entry {slot} violates hash < theta ({})",
                    header.theta
                )));
            }
            population += 1;
        }
        if population != header.num_entries {
            return Err(Error::malformed(format!(
                "persisted count {} does not match cache population {population}",
                header.num_entries
            )));
        }
        Ok(WrappedIntersection {
            image: bytes,
            header,
        })
    }
}

// Validated header of a persisted intersection image.
#[derive(Debug, Clone, Copy)]
struct IntersectionImage {
    lg_arr_longs: u8,
    theta: u64,
    seed_hash: u16,
    num_entries: usize,
    empty: bool,
}

impl IntersectionImage {
    fn parse(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        if bytes.len() < 24 {
            return Err(Error::insufficient_data("intersection preamble"));
        }
        let mut cursor = SketchSlice::new(bytes);
        let pre = Preamble::parse(&mut cursor)?;
        Family::INTERSECTION.validate_id(pre.family_id)?;
        Family::INTERSECTION.validate_pre_longs(pre.pre_longs)?;
        if pre.ser_ver != SERIAL_VERSION {
            return Err(Error::malformed(format!(
                "set operation state is ser-ver {SERIAL_VERSION} only, got {}",
                pre.ser_ver
            )));
        }
        let seed_hash = pre.validate_seed_hash(compute_seed_hash(seed))?;

        if pre.lg_arr_longs != 0 && pre.lg_arr_longs < MIN_LG_ARR_LONGS {
            return Err(Error::malformed(format!(
                "lg_arr_longs {} below minimum {MIN_LG_ARR_LONGS}",
                pre.lg_arr_longs
            )));
        }

        let num_entries = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("num_entries"))? as usize;
        let _p_bits = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("sampling_p"))?;
        let theta = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("theta"))?;
        if theta == 0 || theta > MAX_THETA {
            return Err(Error::malformed(format!("theta out of range: {theta}")));
        }

        if pre.lg_arr_longs == 0 {
            if num_entries != 0 {
                return Err(Error::malformed(
                    "retained count without a cache in intersection image",
                ));
            }
        } else {
            let needed = 24 + (1usize << pre.lg_arr_longs) * HASH_SIZE_BYTES;
            if bytes.len() < needed {
                return Err(Error::insufficient_data(format!(
                    "image needs {needed} bytes, got {}",
                    bytes.len()
                )));
            }
        }

        Ok(Self {
            lg_arr_longs: pre.lg_arr_longs,
            theta,
            seed_hash,
            num_entries,
            empty: pre.is_empty_flag(),
        })
    }

    // Virgin is the one state a cache-less, non-empty, exact-mode image
    // can describe.
    fn is_valid(&self) -> bool {
        self.empty || self.num_entries > 0 || self.theta < MAX_THETA
    }

    fn cache_iter<'a>(&self, bytes: &'a [u8]) -> impl Iterator<Item = u64> + 'a {
        let count = if self.lg_arr_longs == 0 {
            0
        } else {
            1usize << self.lg_arr_longs
        };
        (0..count).map(move |i| LittleEndian::read_u64(&bytes[24 + i * 8..24 + i * 8 + 8]))
    }
}

/// Read-only view over a persisted intersection state.
#[derive(Debug, Clone, Copy)]
pub struct WrappedIntersection<'a> {
    image: &'a [u8],
    header: IntersectionImage,
}

impl WrappedIntersection<'_> {
    /// Whether the persisted operator had received at least one update.
    pub fn has_result(&self) -> bool {
        self.header.is_valid()
    }

    /// Number of hashes retained by the persisted working set.
    pub fn num_retained(&self) -> usize {
        self.header.num_entries
    }

    /// Theta of the persisted working set, as u64.
    pub fn theta64(&self) -> u64 {
        self.header.theta
    }

    /// Returns the persisted result as an ordered compact sketch.
    ///
    /// # Errors
    ///
    /// Returns an `IllegalState` error when the persisted operator was
    /// virgin.
    pub fn result(&self) -> Result<CompactThetaSketch, Error> {
        self.result_with_ordered(true)
    }

    /// Returns the persisted result as a compact sketch.
    pub fn result_with_ordered(&self, ordered: bool) -> Result<CompactThetaSketch, Error> {
        if !self.has_result() {
            return Err(Error::illegal_state(
                "result() on a persisted virgin intersection",
            ));
        }
        let entries = compact_cache(
            self.header.cache_iter(self.image),
            self.header.theta,
            ordered,
        );
        Ok(CompactThetaSketch::from_parts(
            entries,
            self.header.theta,
            self.header.seed_hash,
            ordered,
            self.header.empty,
        ))
    }
}
