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

//! Memory-backed compact theta sketch.
//!
//! Wrapping aliases a serialized compact image instead of copying it;
//! the wrapped sketch borrows the buffer for its lifetime and reads
//! hashes lazily. Only canonical (ser-ver 3) images can be wrapped;
//! legacy images must be heapified.

use byteorder::ByteOrder;
use byteorder::LittleEndian;

use crate::codec::Family;
use crate::codec::SketchSlice;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::theta::CompactThetaSketch;
use crate::theta::ThetaSketchView;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::preamble::*;

/// A compact theta sketch aliasing a caller-owned byte buffer.
///
/// # Example
///
/// ```
/// use theta_setops::theta::CompactThetaSketch;
/// use theta_setops::theta::ThetaSketchView;
/// use theta_setops::theta::WrappedCompactThetaSketch;
///
/// let heap =
///     CompactThetaSketch::from_hashes(vec![10, 20, 30], i64::MAX as u64, 9001, true).unwrap();
/// let bytes = heap.serialize();
/// let wrapped = WrappedCompactThetaSketch::wrap(&bytes).unwrap();
/// assert_eq!(wrapped.estimate(), heap.estimate());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WrappedCompactThetaSketch<'a> {
    image: &'a [u8],
    theta: u64,
    seed_hash: u16,
    num_entries: usize,
    ordered: bool,
    empty: bool,
    entries_offset: usize,
}

impl<'a> WrappedCompactThetaSketch<'a> {
    /// Wrap a compact image, validating against the default seed.
    pub fn wrap(bytes: &'a [u8]) -> Result<Self, Error> {
        Self::wrap_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Wrap a compact image produced under the given seed.
    ///
    /// The buffer is aliased read-only; nothing is copied. The image is
    /// fully validated up front so iteration cannot fail later.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is not a well-formed ser-ver 3
    /// compact image or carries a different seed hash.
    pub fn wrap_with_seed(bytes: &'a [u8], seed: u64) -> Result<Self, Error> {
        if bytes.len() < 8 {
            return Err(Error::insufficient_data("preamble"));
        }
        let mut cursor = SketchSlice::new(bytes);
        let pre = Preamble::parse(&mut cursor)?;
        Family::COMPACT.validate_id(pre.family_id)?;
        if pre.ser_ver != SERIAL_VERSION {
            return Err(Error::malformed(format!(
                "only ser-ver {SERIAL_VERSION} images can be wrapped, got {}; heapify instead",
                pre.ser_ver
            )));
        }
        Family::COMPACT.validate_pre_longs(pre.pre_longs)?;
        if !pre.is_compact() || !pre.is_read_only() {
            return Err(Error::malformed(
                "compact image must carry the compact and read-only flags",
            ));
        }
        let seed_hash = pre.validate_seed_hash(compute_seed_hash(seed))?;

        if pre.is_empty_flag() {
            return Ok(Self {
                image: &bytes[..8],
                theta: MAX_THETA,
                seed_hash,
                num_entries: 0,
                ordered: true,
                empty: true,
                entries_offset: 8,
            });
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
                image: &bytes[..16],
                theta: MAX_THETA,
                seed_hash,
                num_entries: 1,
                ordered: true,
                empty: false,
                entries_offset: 8,
            });
        }

        if pre.pre_longs < PREAMBLE_LONGS_EXACT {
            return Err(Error::invalid_preamble_longs(
                Family::COMPACT.name,
                pre.pre_longs,
            ));
        }

        let num_entries = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("num_entries"))? as usize;
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
        if theta == 0 || theta > MAX_THETA {
            return Err(Error::malformed(format!("theta out of range: {theta}")));
        }

        let entries_offset = (pre.pre_longs as usize) * 8;
        let total = entries_offset + num_entries * HASH_SIZE_BYTES;
        if bytes.len() < total {
            return Err(Error::insufficient_data(format!(
                "image needs {total} bytes, got {}",
                bytes.len()
            )));
        }

        // One validation pass so lazy reads cannot surface garbage.
        let mut prev = 0u64;
        for i in 0..num_entries {
            let offset = entries_offset + i * HASH_SIZE_BYTES;
            let hash = LittleEndian::read_u64(&bytes[offset..offset + 8]);
            if hash == 0 || hash >= theta {
                return Err(Error::malformed(format!(
                    "retained hash {hash} violates 0 < hash < theta ({theta})"
                )));
            }
            if pre.is_ordered() && hash <= prev {
                return Err(Error::malformed(
                    "ordered flag set but hash list is not strictly ascending",
                ));
            }
            prev = hash;
        }

        Ok(Self {
            image: &bytes[..total],
            theta,
            seed_hash,
            num_entries,
            ordered: pre.is_ordered(),
            empty: false,
            entries_offset,
        })
    }

    /// Copy into an owned heap sketch.
    pub fn to_heap(&self) -> CompactThetaSketch {
        CompactThetaSketch::from_parts(
            self.iter().collect(),
            self.theta,
            self.seed_hash,
            self.ordered,
            self.empty,
        )
    }

    /// The wrapped image bytes (already canonical ser-ver 3).
    pub fn as_bytes(&self) -> &'a [u8] {
        self.image
    }

    /// Serialize: a copy of the wrapped image.
    pub fn serialize(&self) -> Vec<u8> {
        self.image.to_vec()
    }
}

impl ThetaSketchView for WrappedCompactThetaSketch<'_> {
    fn theta64(&self) -> u64 {
        self.theta
    }

    fn seed_hash(&self) -> u16 {
        self.seed_hash
    }

    fn is_empty(&self) -> bool {
        self.empty
    }

    fn is_ordered(&self) -> bool {
        self.ordered
    }

    fn num_retained(&self) -> usize {
        self.num_entries
    }

    fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.num_entries).map(move |i| {
            let offset = self.entries_offset + i * HASH_SIZE_BYTES;
            LittleEndian::read_u64(&self.image[offset..offset + 8])
        })
    }
}
