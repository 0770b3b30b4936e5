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

//! Compact theta sketch
//!
//! A compact sketch is the immutable, wire-format-ready form of a theta
//! sketch: theta, the emptiness and ordering state, the seed hash, and
//! a dense list of retained hashes. It is what the set operation
//! engines consume and produce.
//!
//! Internally the sketch is a tagged variant (empty, single item, heap
//! list); the distinction never leaks through the read API but drives
//! the serialized shape: an empty sketch is 8 bytes, a single-item
//! sketch 16 bytes, everything else a 2- or 3-long preamble followed by
//! the hash list.

use crate::codec::Family;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::theta::ThetaSketchView;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::preamble::*;

/// An immutable, compact theta sketch.
///
/// # Example
///
/// ```
/// use theta_setops::theta::CompactThetaSketch;
/// use theta_setops::theta::ThetaSketchView;
///
/// let sketch =
///     CompactThetaSketch::from_hashes(vec![10, 20, 30], i64::MAX as u64, 9001, true).unwrap();
/// assert_eq!(sketch.estimate(), 3.0);
///
/// let bytes = sketch.serialize();
/// let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
/// assert_eq!(restored.estimate(), 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct CompactThetaSketch {
    repr: Repr,
    seed_hash: u16,
}

#[derive(Debug, Clone)]
enum Repr {
    Empty,
    SingleItem { hash: u64 },
    Heap { theta: u64, ordered: bool, entries: Vec<u64> },
}

impl CompactThetaSketch {
    /// The empty sketch for the given update seed.
    pub fn empty(seed: u64) -> Self {
        Self::empty_from_seed_hash(compute_seed_hash(seed))
    }

    /// The empty sketch for the default update seed.
    pub fn empty_with_default_seed() -> Self {
        Self::empty(DEFAULT_UPDATE_SEED)
    }

    /// The single-item sketch holding one hash, for the given seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the hash is 0 or not below `i64::MAX`.
    pub fn single_item(hash: u64, seed: u64) -> Result<Self, Error> {
        if hash == 0 || hash >= MAX_THETA {
            return Err(Error::invalid_argument(format!(
                "single-item hash must be in [1, 2^63 - 1), got {hash}"
            )));
        }
        Ok(Self {
            repr: Repr::SingleItem { hash },
            seed_hash: compute_seed_hash(seed),
        })
    }

    /// Build a compact sketch from a raw retained set.
    ///
    /// Every hash must satisfy `0 < hash < theta` and appear once. When
    /// `ordered` is requested the hashes are sorted; otherwise the given
    /// order is kept. A sketch with no hashes at full theta is the empty
    /// sketch; one hash at full theta is the single-item sketch.
    ///
    /// # Errors
    ///
    /// Returns an error if theta is out of range, any hash violates the
    /// retention invariant, or a hash appears twice.
    pub fn from_hashes(
        hashes: Vec<u64>,
        theta: u64,
        seed: u64,
        ordered: bool,
    ) -> Result<Self, Error> {
        if theta == 0 || theta > MAX_THETA {
            return Err(Error::invalid_argument(format!(
                "theta must be in [1, 2^63 - 1], got {theta}"
            )));
        }
        for &hash in &hashes {
            if hash == 0 || hash >= theta {
                return Err(Error::invalid_argument(format!(
                    "retained hash {hash} violates 0 < hash < theta ({theta})"
                )));
            }
        }
        let mut sorted = hashes.clone();
        sorted.sort_unstable();
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::invalid_argument(
                "retained hashes must be distinct",
            ));
        }
        let entries = if ordered { sorted } else { hashes };
        Ok(Self::from_parts(
            entries,
            theta,
            compute_seed_hash(seed),
            ordered,
            false,
        ))
    }

    /// Assemble a sketch from engine parts, selecting the variant.
    ///
    /// Zero retained at full theta collapses to the empty variant (the
    /// emptiness correction rule); one retained at full theta upgrades
    /// to the single-item variant.
    pub(crate) fn from_parts(
        entries: Vec<u64>,
        theta: u64,
        seed_hash: u16,
        ordered: bool,
        is_empty: bool,
    ) -> Self {
        if is_empty || (entries.is_empty() && theta == MAX_THETA) {
            return Self::empty_from_seed_hash(seed_hash);
        }
        if entries.len() == 1 && theta == MAX_THETA {
            return Self {
                repr: Repr::SingleItem { hash: entries[0] },
                seed_hash,
            };
        }
        Self {
            repr: Repr::Heap {
                theta,
                ordered,
                entries,
            },
            seed_hash,
        }
    }

    pub(crate) fn empty_from_seed_hash(seed_hash: u16) -> Self {
        Self {
            repr: Repr::Empty,
            seed_hash,
        }
    }

    /// Whether this sketch is the single-item variant.
    pub fn is_single_item(&self) -> bool {
        matches!(self.repr, Repr::SingleItem { .. })
    }

    fn hash_slice(&self) -> &[u64] {
        match &self.repr {
            Repr::Empty => &[],
            Repr::SingleItem { hash } => std::slice::from_ref(hash),
            Repr::Heap { entries, .. } => entries,
        }
    }

    /// Return a copy with the requested ordering.
    ///
    /// Identity (a clone) when the ordering already matches or when no
    /// ordering is requested; otherwise the hash list is sorted.
    pub fn compact(&self, ordered: bool) -> CompactThetaSketch {
        match &self.repr {
            Repr::Empty | Repr::SingleItem { .. } => self.clone(),
            Repr::Heap {
                theta,
                ordered: current,
                entries,
            } => {
                if *current || !ordered {
                    return self.clone();
                }
                let mut sorted = entries.clone();
                sorted.sort_unstable();
                Self::from_parts(sorted, *theta, self.seed_hash, true, false)
            }
        }
    }

    /// Number of bytes `serialize` will produce.
    pub fn serialized_size_bytes(&self) -> usize {
        let pre_longs = match &self.repr {
            Repr::Empty | Repr::SingleItem { .. } => PREAMBLE_LONGS_EMPTY,
            Repr::Heap { theta, .. } if *theta == MAX_THETA => PREAMBLE_LONGS_EXACT,
            Repr::Heap { .. } => PREAMBLE_LONGS_ESTIMATION,
        };
        (pre_longs as usize) * 8 + self.num_retained() * HASH_SIZE_BYTES
    }

    /// Serialize to the compact wire format.
    ///
    /// Empty: 8 bytes. Single item: 16 bytes (the dedicated flag is
    /// set). Exact mode: 2-long preamble. Estimation mode: 3-long
    /// preamble carrying theta.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.serialized_size_bytes());

        match &self.repr {
            Repr::Empty => {
                Preamble {
                    pre_longs: PREAMBLE_LONGS_EMPTY,
                    ser_ver: SERIAL_VERSION,
                    family_id: Family::COMPACT.id,
                    lg_arr_longs: 0,
                    lg_nom_longs: 0,
                    flags: FLAG_IS_READ_ONLY | FLAG_IS_EMPTY | FLAG_IS_COMPACT | FLAG_IS_ORDERED,
                    seed_hash: self.seed_hash,
                }
                .write(&mut bytes);
            }
            Repr::SingleItem { hash } => {
                Preamble {
                    pre_longs: PREAMBLE_LONGS_EMPTY,
                    ser_ver: SERIAL_VERSION,
                    family_id: Family::COMPACT.id,
                    lg_arr_longs: 0,
                    lg_nom_longs: 0,
                    flags: FLAG_IS_READ_ONLY
                        | FLAG_IS_COMPACT
                        | FLAG_IS_ORDERED
                        | FLAG_HAS_SINGLE_ITEM,
                    seed_hash: self.seed_hash,
                }
                .write(&mut bytes);
                bytes.write_u64_le(*hash);
            }
            Repr::Heap {
                theta,
                ordered,
                entries,
            } => {
                let estimation = *theta < MAX_THETA;
                let pre_longs = if estimation {
                    PREAMBLE_LONGS_ESTIMATION
                } else {
                    PREAMBLE_LONGS_EXACT
                };
                let mut flags = FLAG_IS_READ_ONLY | FLAG_IS_COMPACT;
                if *ordered {
                    flags |= FLAG_IS_ORDERED;
                }
                Preamble {
                    pre_longs,
                    ser_ver: SERIAL_VERSION,
                    family_id: Family::COMPACT.id,
                    lg_arr_longs: 0,
                    lg_nom_longs: 0,
                    flags,
                    seed_hash: self.seed_hash,
                }
                .write(&mut bytes);
                bytes.write_u32_le(entries.len() as u32);
                bytes.write_u32_le(DEFAULT_P_FLOAT_BITS);
                if estimation {
                    bytes.write_u64_le(*theta);
                }
                for hash in entries {
                    bytes.write_u64_le(*hash);
                }
            }
        }

        bytes.into_bytes()
    }

    /// Serialize into a caller-provided buffer, returning the number of
    /// bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination is too small.
    pub fn serialize_into(&self, dst: &mut [u8]) -> Result<usize, Error> {
        let bytes = self.serialize();
        if dst.len() < bytes.len() {
            return Err(Error::invalid_argument(format!(
                "destination buffer too small: need {}, got {}",
                bytes.len(),
                dst.len()
            )));
        }
        dst[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Heapify a compact image, using the default seed for validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is malformed or was produced under
    /// a different seed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Heapify a compact image produced under the given seed.
    ///
    /// Ser-ver 3 is the canonical format; ser-ver 1 and 2 images are
    /// upgraded to the in-memory form on load.
    pub fn deserialize_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        if bytes.len() < 8 {
            return Err(Error::insufficient_data("preamble"));
        }
        let mut cursor = SketchSlice::new(bytes);
        let pre = Preamble::parse(&mut cursor)?;
        Family::COMPACT.validate_id(pre.family_id)?;

        match pre.ser_ver {
            SERIAL_VERSION => Self::from_image_v3(&pre, &mut cursor, seed),
            SERIAL_VERSION_2 => Self::from_image_v2(&pre, &mut cursor, seed),
            SERIAL_VERSION_1 => Self::from_image_v1(&pre, &mut cursor),
            _ => unreachable!("Preamble::parse validated the serial version"),
        }
    }

    fn from_image_v3(
        pre: &Preamble,
        cursor: &mut SketchSlice<'_>,
        seed: u64,
    ) -> Result<Self, Error> {
        Family::COMPACT.validate_pre_longs(pre.pre_longs)?;
        if !pre.is_compact() || !pre.is_read_only() {
            return Err(Error::malformed(
                "compact image must carry the compact and read-only flags",
            ));
        }
        let seed_hash = pre.validate_seed_hash(compute_seed_hash(seed))?;

        if pre.is_empty_flag() {
            if pre.pre_longs >= PREAMBLE_LONGS_EXACT {
                let num_entries = cursor
                    .read_u32_le()
                    .map_err(|_| Error::insufficient_data("num_entries"))?;
                if num_entries > 0 {
                    return Err(Error::malformed(
                        "empty flag set with non-zero retained count",
                    ));
                }
            }
            return Ok(Self::empty_from_seed_hash(seed_hash));
        }

        if pre.is_single_item()? {
            let hash = cursor
                .read_u64_le()
                .map_err(|_| Error::insufficient_data("single_item_hash"))?;
            if hash == 0 || hash >= MAX_THETA {
                return Err(Error::malformed(format!(
                    "single-item hash out of range: {hash}"
                )));
            }
            return Ok(Self {
                repr: Repr::SingleItem { hash },
                seed_hash,
            });
        }

        if pre.pre_longs < PREAMBLE_LONGS_EXACT {
            return Err(Error::invalid_preamble_longs(
                Family::COMPACT.name,
                pre.pre_longs,
            ));
        }

        let (entries, theta) = read_hash_list(pre, cursor)?;
        Ok(Self::from_parts(
            entries,
            theta,
            seed_hash,
            pre.is_ordered(),
            false,
        ))
    }

    // Ser-ver 2 carries a seed-hash field but no single-item flag;
    // emptiness is encoded as a 1-long preamble.
    fn from_image_v2(
        pre: &Preamble,
        cursor: &mut SketchSlice<'_>,
        seed: u64,
    ) -> Result<Self, Error> {
        Family::COMPACT.validate_pre_longs(pre.pre_longs)?;
        let expected = compute_seed_hash(seed);
        if pre.pre_longs == PREAMBLE_LONGS_EMPTY {
            return Ok(Self::empty_from_seed_hash(expected));
        }
        let seed_hash = pre.validate_seed_hash(expected)?;
        let (entries, theta) = read_hash_list(pre, cursor)?;
        Ok(Self::from_parts(
            entries,
            theta,
            seed_hash,
            pre.is_ordered(),
            false,
        ))
    }

    // Ser-ver 1 has a fixed 3-long preamble and no seed-hash field; the
    // in-memory seed hash is synthesized from the default seed.
    fn from_image_v1(pre: &Preamble, cursor: &mut SketchSlice<'_>) -> Result<Self, Error> {
        if pre.pre_longs != PREAMBLE_LONGS_ESTIMATION {
            return Err(Error::invalid_preamble_longs(
                Family::COMPACT.name,
                pre.pre_longs,
            ));
        }
        let num_entries = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("num_entries"))?;
        let _unused = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("padding"))?;
        let theta = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("theta"))?;
        validate_theta(theta)?;

        let entries = read_entries(cursor, num_entries as usize, theta, false)?;
        let is_empty = entries.is_empty() && theta == MAX_THETA;
        let seed_hash = compute_seed_hash(DEFAULT_UPDATE_SEED);
        Ok(Self::from_parts(entries, theta, seed_hash, false, is_empty))
    }
}

impl ThetaSketchView for CompactThetaSketch {
    fn theta64(&self) -> u64 {
        match &self.repr {
            Repr::Empty | Repr::SingleItem { .. } => MAX_THETA,
            Repr::Heap { theta, .. } => *theta,
        }
    }

    fn seed_hash(&self) -> u16 {
        self.seed_hash
    }

    fn is_empty(&self) -> bool {
        matches!(self.repr, Repr::Empty)
    }

    fn is_ordered(&self) -> bool {
        match &self.repr {
            Repr::Empty | Repr::SingleItem { .. } => true,
            Repr::Heap { ordered, .. } => *ordered,
        }
    }

    fn num_retained(&self) -> usize {
        self.hash_slice().len()
    }

    fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.hash_slice().iter().copied()
    }
}

fn validate_theta(theta: u64) -> Result<(), Error> {
    if theta == 0 || theta > MAX_THETA {
        return Err(Error::malformed(format!("theta out of range: {theta}")));
    }
    Ok(())
}

// Shared tail of the v2/v3 parse: count and p from long 1, theta from
// long 2 when present, then the hash list.
fn read_hash_list(
    pre: &Preamble,
    cursor: &mut SketchSlice<'_>,
) -> Result<(Vec<u64>, u64), Error> {
    let num_entries = cursor
        .read_u32_le()
        .map_err(|_| Error::insufficient_data("num_entries"))?;
    let _p_bits = cursor
        .read_u32_le()
        .map_err(|_| Error::insufficient_data("sampling_p"))?;
    let theta = if pre.pre_longs >= PREAMBLE_LONGS_ESTIMATION {
        cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("theta"))?
    } else {
        MAX_THETA
    };
    validate_theta(theta)?;
    let entries = read_entries(cursor, num_entries as usize, theta, pre.is_ordered())?;
    Ok((entries, theta))
}

fn read_entries(
    cursor: &mut SketchSlice<'_>,
    num_entries: usize,
    theta: u64,
    ordered: bool,
) -> Result<Vec<u64>, Error> {
    let mut entries = Vec::with_capacity(num_entries);
    let mut prev = 0u64;
    for i in 0..num_entries {
        let hash = cursor.read_u64_le().map_err(|_| {
            Error::insufficient_data(format!("expected {num_entries} entries, failed at index {i}"))
        })?;
        if hash == 0 || hash >= theta {
            return Err(Error::malformed(format!(
                "retained hash {hash} violates 0 < hash < theta ({theta})"
            )));
        }
        if ordered && hash <= prev {
            return Err(Error::malformed(
                "ordered flag set but hash list is not strictly ascending",
            ));
        }
        prev = hash;
        entries.push(hash);
    }
    Ok(entries)
}
