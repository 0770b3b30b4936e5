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

//! Memory-backed union.
//!
//! The union below keeps its entire working state in a byte buffer laid
//! out exactly as the persisted union image (3-long preamble followed
//! by the cache array), so the buffer is a valid image at every point
//! in time and can be re-attached with [`MemoryUnion::wrap`]. The
//! buffer is caller-owned; when a resize needs more room than the
//! buffer offers, a [`MemoryRequestServer`] is asked for a replacement,
//! which the union then owns.

use std::fmt;

use byteorder::ByteOrder;
use byteorder::LittleEndian;

use crate::codec::Family;
use crate::codec::SketchSlice;
use crate::common::ResizeFactor;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::mem::MemoryRequestServer;
use crate::theta::CompactThetaSketch;
use crate::theta::ThetaSketchView;
use crate::theta::hash_table::MAX_LG_NOM_LONGS;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::hash_table::MIN_LG_ARR_LONGS;
use crate::theta::hash_table::MIN_LG_NOM_LONGS;
use crate::theta::hash_table::compact_cache;
use crate::theta::hash_table::starting_sub_multiple;
use crate::theta::hash_table::starting_theta_from_sampling_probability;
use crate::theta::preamble::*;

const PREAMBLE_BYTES: usize = 24;

const COUNT_OFFSET: usize = 8;
const P_OFFSET: usize = 12;
const THETA_OFFSET: usize = 16;
const FLAGS_OFFSET: usize = 5;
const LG_ARR_OFFSET: usize = 3;

const RESIZE_THRESHOLD: f64 = 0.5;
const REBUILD_THRESHOLD: f64 = 15.0 / 16.0;

const STRIDE_MASK: u64 = (1 << 7) - 1;

/// Bytes needed for a union image with a cache of `2^lg_arr_longs`.
pub(crate) fn union_image_bytes(lg_arr_longs: u8) -> usize {
    PREAMBLE_BYTES + (1usize << lg_arr_longs) * HASH_SIZE_BYTES
}

enum Backing<'a> {
    Borrowed(&'a mut [u8]),
    Owned(Vec<u8>),
}

impl Backing<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Borrowed(buf) => buf,
            Backing::Owned(buf) => buf,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Backing::Borrowed(buf) => buf,
            Backing::Owned(buf) => buf,
        }
    }
}

/// A theta union whose working state lives in a caller-provided buffer.
///
/// Built through
/// [`SetOperationBuilder::build_union_in`](crate::theta::SetOperationBuilder::build_union_in)
/// or re-attached to an existing image with [`wrap`](Self::wrap). The
/// semantics match [`ThetaUnion`](crate::theta::ThetaUnion); only the
/// storage differs.
pub struct MemoryUnion<'a> {
    backing: Backing<'a>,
    request: Option<&'a dyn MemoryRequestServer>,
    resize_factor: ResizeFactor,
    lg_arr_longs: u8,
    lg_nom_longs: u8,
    theta: u64,
    num_retained: usize,
    seed_hash: u16,
    is_empty: bool,
}

impl fmt::Debug for MemoryUnion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryUnion")
            .field("lg_arr_longs", &self.lg_arr_longs)
            .field("lg_nom_longs", &self.lg_nom_longs)
            .field("theta", &self.theta)
            .field("num_retained", &self.num_retained)
            .field("is_empty", &self.is_empty)
            .field("owned", &matches!(self.backing, Backing::Owned(_)))
            .finish()
    }
}

impl<'a> MemoryUnion<'a> {
    /// Initialize a fresh union image in `dst`.
    pub(crate) fn initialize(
        dst: &'a mut [u8],
        lg_nom_longs: u8,
        resize_factor: ResizeFactor,
        sampling_probability: f32,
        seed_hash: u16,
        request: Option<&'a dyn MemoryRequestServer>,
    ) -> Result<Self, Error> {
        let lg_arr_longs = starting_sub_multiple(
            lg_nom_longs + 1,
            MIN_LG_ARR_LONGS,
            resize_factor.lg_value(),
        );
        let needed = union_image_bytes(lg_arr_longs);
        if dst.len() < needed {
            return Err(Error::invalid_argument(format!(
                "destination buffer too small: need {needed}, got {}",
                dst.len()
            )));
        }

        let theta = starting_theta_from_sampling_probability(sampling_probability);

        dst[..needed].fill(0);
        dst[0] = PREAMBLE_LONGS_ESTIMATION;
        dst[1] = SERIAL_VERSION;
        dst[2] = Family::UNION.id;
        dst[LG_ARR_OFFSET] = lg_arr_longs;
        dst[4] = lg_nom_longs;
        dst[FLAGS_OFFSET] = FLAG_IS_EMPTY;
        LittleEndian::write_u16(&mut dst[6..8], seed_hash);
        LittleEndian::write_f32(&mut dst[P_OFFSET..P_OFFSET + 4], sampling_probability);
        LittleEndian::write_u64(&mut dst[THETA_OFFSET..THETA_OFFSET + 8], theta);

        Ok(Self {
            backing: Backing::Borrowed(dst),
            request,
            resize_factor,
            lg_arr_longs,
            lg_nom_longs,
            theta,
            num_retained: 0,
            seed_hash,
            is_empty: true,
        })
    }

    /// Re-attach to an existing union image for further updating, using
    /// the default seed.
    pub fn wrap(dst: &'a mut [u8]) -> Result<Self, Error> {
        Self::wrap_with_seed(dst, DEFAULT_UPDATE_SEED, None)
    }

    /// Re-attach to an existing union image for further updating.
    ///
    /// The buffer is aliased writable (the union family allows it); a
    /// request server may be supplied for growth.
    pub fn wrap_with_seed(
        dst: &'a mut [u8],
        seed: u64,
        request: Option<&'a dyn MemoryRequestServer>,
    ) -> Result<Self, Error> {
        if dst.len() < PREAMBLE_BYTES {
            return Err(Error::insufficient_data("union preamble"));
        }
        let (lg_arr_longs, lg_nom_longs, theta, num_retained, seed_hash, is_empty) = {
            let mut cursor = SketchSlice::new(dst);
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
            if dst.len() < union_image_bytes(pre.lg_arr_longs) {
                return Err(Error::insufficient_data(format!(
                    "image needs {} bytes, got {}",
                    union_image_bytes(pre.lg_arr_longs),
                    dst.len()
                )));
            }

            let num_entries = cursor
                .read_u32_le()
                .map_err(|_| Error::insufficient_data("num_entries"))?
                as usize;
            let _p = cursor
                .read_f32_le()
                .map_err(|_| Error::insufficient_data("sampling_p"))?;
            let theta = cursor
                .read_u64_le()
                .map_err(|_| Error::insufficient_data("theta"))?;
            if theta == 0 || theta > MAX_THETA {
                return Err(Error::malformed(format!("theta out of range: {theta}")));
            }

            // One validation pass over the cache.
            let mut population = 0usize;
            for i in 0..(1usize << pre.lg_arr_longs) {
                let offset = PREAMBLE_BYTES + i * 8;
                let slot = LittleEndian::read_u64(&dst[offset..offset + 8]);
                if slot == 0 {
                    continue;
                }
                if slot >= theta {
                    return Err(Error::malformed(format!(
                        "cache entry {slot} violates hash < theta ({theta})"
                    )));
                }
                population += 1;
            }
            if population != num_entries {
                return Err(Error::malformed(format!(
                    "persisted count {num_entries} does not match cache population {population}"
                )));
            }

            (
                pre.lg_arr_longs,
                pre.lg_nom_longs,
                theta,
                num_entries,
                seed_hash,
                pre.is_empty_flag(),
            )
        };

        Ok(Self {
            backing: Backing::Borrowed(dst),
            request,
            resize_factor: ResizeFactor::X8,
            lg_arr_longs,
            lg_nom_longs,
            theta,
            num_retained,
            seed_hash,
            is_empty,
        })
    }

    /// Incorporate a sketch into the union. Same semantics as
    /// [`ThetaUnion::update`](crate::theta::ThetaUnion::update), plus:
    ///
    /// # Errors
    ///
    /// Returns an `InsufficientCapacity` error when the cache must grow
    /// beyond the buffer and no replacement can be obtained; the
    /// triggering insert is not applied and the buffer remains a valid
    /// image.
    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        if sketch.is_empty() {
            return Ok(());
        }
        if sketch.seed_hash() != self.seed_hash {
            return Err(Error::seed_mismatch(self.seed_hash, sketch.seed_hash()));
        }

        let theta = self.theta.min(sketch.theta64());
        self.set_empty(false);
        self.set_theta(theta);

        for hash in sketch.iter() {
            if hash < theta {
                self.try_insert(hash)?;
            } else if sketch.is_ordered() {
                break; // early stop for ordered sketches
            }
        }
        Ok(())
    }

    /// Present a single raw hash, the seam used by concurrent
    /// producers. Zero hashes are ignored; anything else marks the
    /// union non-empty and is inserted if below theta.
    ///
    /// # Errors
    ///
    /// Returns an `InsufficientCapacity` error when the cache must grow
    /// beyond the buffer and no replacement can be obtained.
    pub fn update_hash(&mut self, hash: u64) -> Result<(), Error> {
        if hash == 0 {
            return Ok(());
        }
        self.set_empty(false);
        self.try_insert(hash)
    }

    /// Returns the union result as an ordered compact sketch.
    pub fn result(&self) -> CompactThetaSketch {
        self.result_with_ordered(true)
    }

    /// Returns the union result as a compact sketch, materialized on
    /// the heap; the working image is untouched.
    pub fn result_with_ordered(&self, ordered: bool) -> CompactThetaSketch {
        let entries = compact_cache(self.cache_iter(), self.theta, ordered);
        CompactThetaSketch::from_parts(entries, self.theta, self.seed_hash, ordered, self.is_empty)
    }

    /// The current state image: always a valid persisted union.
    pub fn as_bytes(&self) -> &[u8] {
        &self.backing.bytes()[..union_image_bytes(self.lg_arr_longs)]
    }

    /// Whether the union has taken over a replacement buffer obtained
    /// from the request server.
    pub fn is_owned(&self) -> bool {
        matches!(self.backing, Backing::Owned(_))
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn num_retained(&self) -> usize {
        self.num_retained
    }

    pub fn theta64(&self) -> u64 {
        self.theta
    }

    fn cache_len(&self) -> usize {
        1usize << self.lg_arr_longs
    }

    fn cache_iter(&self) -> impl Iterator<Item = u64> + '_ {
        let bytes = self.backing.bytes();
        (0..self.cache_len())
            .map(move |i| LittleEndian::read_u64(&bytes[PREAMBLE_BYTES + i * 8..][..8]))
            .filter(|&slot| slot != 0)
    }

    fn set_theta(&mut self, theta: u64) {
        self.theta = theta;
        let bytes = self.backing.bytes_mut();
        LittleEndian::write_u64(&mut bytes[THETA_OFFSET..THETA_OFFSET + 8], theta);
    }

    fn set_empty(&mut self, is_empty: bool) {
        self.is_empty = is_empty;
        let bytes = self.backing.bytes_mut();
        if is_empty {
            bytes[FLAGS_OFFSET] |= FLAG_IS_EMPTY;
        } else {
            bytes[FLAGS_OFFSET] &= !FLAG_IS_EMPTY;
        }
    }

    fn set_count(&mut self, count: usize) {
        self.num_retained = count;
        let bytes = self.backing.bytes_mut();
        LittleEndian::write_u32(&mut bytes[COUNT_OFFSET..COUNT_OFFSET + 4], count as u32);
    }

    fn capacity(&self) -> usize {
        let fraction = if self.lg_arr_longs <= self.lg_nom_longs {
            RESIZE_THRESHOLD
        } else {
            REBUILD_THRESHOLD
        };
        (fraction * self.cache_len() as f64) as usize
    }

    // Probe for `key`; Some(index of match or first empty slot).
    fn find_slot(bytes: &[u8], lg_size: u8, key: u64) -> Option<usize> {
        let size = 1usize << lg_size;
        let mask = size - 1;
        let stride = (2 * ((key >> lg_size) & STRIDE_MASK) + 1) as usize;
        let mut index = (key as usize) & mask;
        let loop_index = index;

        loop {
            let offset = PREAMBLE_BYTES + index * 8;
            let probe = LittleEndian::read_u64(&bytes[offset..offset + 8]);
            if probe == 0 || probe == key {
                return Some(index);
            }
            index = (index + stride) & mask;
            if index == loop_index {
                return None;
            }
        }
    }

    fn try_insert(&mut self, hash: u64) -> Result<(), Error> {
        if hash == 0 || hash >= self.theta {
            return Ok(());
        }
        let Some(index) = Self::find_slot(self.backing.bytes(), self.lg_arr_longs, hash) else {
            unreachable!("resize or rebuild keeps the cache below full");
        };
        let offset = PREAMBLE_BYTES + index * 8;
        if LittleEndian::read_u64(&self.backing.bytes()[offset..offset + 8]) == hash {
            return Ok(());
        }

        // Grow before writing so a failed growth leaves a valid image.
        if self.num_retained + 1 > self.capacity() {
            if self.lg_arr_longs <= self.lg_nom_longs {
                self.resize()?;
            } else {
                self.rebuild();
                if hash >= self.theta {
                    return Ok(());
                }
            }
            let Some(index) = Self::find_slot(self.backing.bytes(), self.lg_arr_longs, hash)
            else {
                unreachable!("resize or rebuild keeps the cache below full");
            };
            let offset = PREAMBLE_BYTES + index * 8;
            let bytes = self.backing.bytes_mut();
            LittleEndian::write_u64(&mut bytes[offset..offset + 8], hash);
        } else {
            let bytes = self.backing.bytes_mut();
            LittleEndian::write_u64(&mut bytes[offset..offset + 8], hash);
        }
        self.set_count(self.num_retained + 1);
        Ok(())
    }

    fn resize(&mut self) -> Result<(), Error> {
        let new_lg = std::cmp::min(
            self.lg_arr_longs + self.resize_factor.lg_value(),
            self.lg_nom_longs + 1,
        );
        let needed = union_image_bytes(new_lg);
        let entries: Vec<u64> = self.cache_iter().collect();

        if self.backing.bytes().len() < needed {
            let Some(replacement) = self.request.and_then(|server| server.request(needed)) else {
                return Err(Error::new(
                    ErrorKind::InsufficientCapacity,
                    format!(
                        "union cache must grow to {needed} bytes and no replacement buffer is available"
                    ),
                ));
            };
            if replacement.len() < needed {
                return Err(Error::new(
                    ErrorKind::InsufficientCapacity,
                    format!(
                        "replacement buffer holds {} bytes, {needed} needed",
                        replacement.len()
                    ),
                ));
            }
            let mut owned = replacement;
            owned[..PREAMBLE_BYTES].copy_from_slice(&self.backing.bytes()[..PREAMBLE_BYTES]);
            self.backing = Backing::Owned(owned);
        }

        let bytes = self.backing.bytes_mut();
        bytes[PREAMBLE_BYTES..needed].fill(0);
        bytes[LG_ARR_OFFSET] = new_lg;
        self.lg_arr_longs = new_lg;
        for entry in entries {
            let Some(index) = Self::find_slot(self.backing.bytes(), new_lg, entry) else {
                unreachable!("fresh cache cannot be full");
            };
            let offset = PREAMBLE_BYTES + index * 8;
            let bytes = self.backing.bytes_mut();
            LittleEndian::write_u64(&mut bytes[offset..offset + 8], entry);
        }
        Ok(())
    }

    // Theta drops to the k-th smallest entry; the lesser entries are
    // re-inserted into the zeroed cache. Never needs more room.
    fn rebuild(&mut self) {
        let mut entries: Vec<u64> = self.cache_iter().collect();
        let k = 1usize << self.lg_nom_longs;
        let (lesser, kth, _) = entries.select_nth_unstable(k);
        let new_theta = *kth;
        let lesser = lesser.to_vec();

        let end = union_image_bytes(self.lg_arr_longs);
        self.backing.bytes_mut()[PREAMBLE_BYTES..end].fill(0);
        for entry in &lesser {
            let Some(index) = Self::find_slot(self.backing.bytes(), self.lg_arr_longs, *entry)
            else {
                unreachable!("fresh cache cannot be full");
            };
            let offset = PREAMBLE_BYTES + index * 8;
            let bytes = self.backing.bytes_mut();
            LittleEndian::write_u64(&mut bytes[offset..offset + 8], *entry);
        }
        self.set_theta(new_theta);
        self.set_count(lesser.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::HeapRequestServer;
    use crate::theta::ThetaUnion;

    fn seed_hash() -> u16 {
        compute_seed_hash(DEFAULT_UPDATE_SEED)
    }

    fn exact_sketch(hashes: Vec<u64>) -> CompactThetaSketch {
        CompactThetaSketch::from_hashes(hashes, MAX_THETA, DEFAULT_UPDATE_SEED, true).unwrap()
    }

    fn spread(i: u64) -> u64 {
        let mut z = i.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        (z ^ (z >> 31)) >> 1
    }

    #[test]
    fn test_initialize_writes_valid_image() {
        let mut buf = vec![0u8; union_image_bytes(9)];
        let union =
            MemoryUnion::initialize(&mut buf, 8, ResizeFactor::X1, 1.0, seed_hash(), None)
                .unwrap();
        assert!(union.is_empty());
        assert_eq!(union.theta64(), MAX_THETA);

        let image = union.as_bytes().to_vec();
        assert_eq!(image[0], 3);
        assert_eq!(image[2], Family::UNION.id);
        // The image doubles as a heapifiable union state
        let heapified = ThetaUnion::deserialize(&image).unwrap();
        assert!(heapified.is_empty());
    }

    #[test]
    fn test_initialize_rejects_small_buffer() {
        let mut buf = vec![0u8; 16];
        assert!(
            MemoryUnion::initialize(&mut buf, 8, ResizeFactor::X1, 1.0, seed_hash(), None)
                .is_err()
        );
    }

    #[test]
    fn test_memory_union_matches_heap_union() {
        let a = exact_sketch(vec![10, 20, 30]);
        let b = exact_sketch(vec![20, 40]);

        let mut buf = vec![0u8; union_image_bytes(9)];
        let mut mem_union =
            MemoryUnion::initialize(&mut buf, 8, ResizeFactor::X1, 1.0, seed_hash(), None)
                .unwrap();
        mem_union.update(&a).unwrap();
        mem_union.update(&b).unwrap();

        let mut heap_union = ThetaUnion::deserialize(mem_union.as_bytes()).unwrap();
        heap_union.update(&exact_sketch(vec![50])).unwrap();

        assert_eq!(mem_union.result().estimate(), 4.0);
        assert_eq!(heap_union.result().estimate(), 5.0);
    }

    #[test]
    fn test_wrap_resumes_updating() {
        let mut buf = vec![0u8; union_image_bytes(9)];
        {
            let mut union =
                MemoryUnion::initialize(&mut buf, 8, ResizeFactor::X1, 1.0, seed_hash(), None)
                    .unwrap();
            union.update(&exact_sketch(vec![1, 2, 3])).unwrap();
        }

        let mut wrapped = MemoryUnion::wrap(&mut buf).unwrap();
        assert_eq!(wrapped.num_retained(), 3);
        wrapped.update(&exact_sketch(vec![4])).unwrap();
        assert_eq!(wrapped.result().estimate(), 4.0);
    }

    #[test]
    fn test_growth_without_server_fails_cleanly() {
        // X4 on lg_nom 8 starts the cache at 2^5; resize wants 2^7.
        let mut buf = vec![0u8; union_image_bytes(5)];
        let mut union =
            MemoryUnion::initialize(&mut buf, 8, ResizeFactor::X4, 1.0, seed_hash(), None)
                .unwrap();

        let hashes: Vec<u64> = (1..=40u64).map(spread).collect();
        let s = CompactThetaSketch::from_hashes(hashes, MAX_THETA, DEFAULT_UPDATE_SEED, false)
            .unwrap();
        let err = union.update(&s).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientCapacity);

        // The buffer is still a valid image
        let image = union.as_bytes().to_vec();
        drop(union);
        assert!(ThetaUnion::deserialize(&image).is_ok());
    }

    #[test]
    fn test_growth_through_request_server() {
        let server = HeapRequestServer;
        let mut buf = vec![0u8; union_image_bytes(5)];
        let mut union = MemoryUnion::initialize(
            &mut buf,
            8,
            ResizeFactor::X4,
            1.0,
            seed_hash(),
            Some(&server),
        )
        .unwrap();

        let hashes: Vec<u64> = (1..=40u64).map(spread).collect();
        let s = CompactThetaSketch::from_hashes(
            hashes.clone(),
            MAX_THETA,
            DEFAULT_UPDATE_SEED,
            false,
        )
        .unwrap();
        union.update(&s).unwrap();

        assert!(union.is_owned());
        assert_eq!(union.num_retained(), 40);
        let result = union.result();
        assert_eq!(result.num_retained(), 40);
        let mut expected = hashes;
        expected.sort_unstable();
        assert_eq!(result.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_rebuild_in_place() {
        // Full-size cache from the start: rebuild, never resize.
        let mut buf = vec![0u8; union_image_bytes(5)];
        let mut union =
            MemoryUnion::initialize(&mut buf, 4, ResizeFactor::X1, 1.0, seed_hash(), None)
                .unwrap();

        let hashes: Vec<u64> = (1..=100u64).map(spread).collect();
        let s = CompactThetaSketch::from_hashes(hashes, MAX_THETA, DEFAULT_UPDATE_SEED, false)
            .unwrap();
        union.update(&s).unwrap();

        assert!(union.theta64() < MAX_THETA);
        assert!(union.num_retained() <= 32);
        let result = union.result();
        assert!(result.iter().all(|h| h < union.theta64()));
    }

    #[test]
    fn test_seed_mismatch() {
        let other = CompactThetaSketch::from_hashes(vec![1], MAX_THETA, 1234, true).unwrap();
        let mut buf = vec![0u8; union_image_bytes(9)];
        let mut union =
            MemoryUnion::initialize(&mut buf, 8, ResizeFactor::X1, 1.0, seed_hash(), None)
                .unwrap();
        assert_eq!(
            union.update(&other).unwrap_err().kind(),
            ErrorKind::SeedMismatch
        );
        assert!(union.is_empty());
    }
}
