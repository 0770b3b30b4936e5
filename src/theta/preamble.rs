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

//! Binary preamble of serialized theta images.
//!
//! Every image starts with 1 to 3 little-endian longs of preamble.
//! Byte layout of long 0:
//!
//! ```text
//! byte 0: preamble longs
//! byte 1: serial version (3 current; 1 and 2 readable legacies)
//! byte 2: family id (compact=3, union=4, intersection=5, a-not-b=6)
//! byte 3: lg of the cache array size (0 for compact images)
//! byte 4: lg of nominal entries (0 for compact images)
//! byte 5: flags
//! bytes 6..7: seed hash
//! ```
//!
//! Long 1, when present, packs the retained count in its low 32 bits
//! and the sampling probability float bits in its high 32 bits; in a
//! single-item image, long 1 is instead the single hash. Long 2, when
//! present, is theta.

use crate::codec::Family;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;

/// Current serialization version
pub(crate) const SERIAL_VERSION: u8 = 3;

/// Legacy serial versions that can still be heapified
pub(crate) const SERIAL_VERSION_1: u8 = 1;
pub(crate) const SERIAL_VERSION_2: u8 = 2;

/// Preamble size for empty or single-item images (8 bytes = 1 long)
pub(crate) const PREAMBLE_LONGS_EMPTY: u8 = 1;

/// Preamble size for exact-mode images (16 bytes = 2 longs)
pub(crate) const PREAMBLE_LONGS_EXACT: u8 = 2;

/// Preamble size for estimation-mode and set-operation images (24 bytes = 3 longs)
pub(crate) const PREAMBLE_LONGS_ESTIMATION: u8 = 3;

// Flags (byte 5) - bit masks
/// Flag: data is in big-endian format (we always use little-endian)
#[allow(dead_code)]
pub(crate) const FLAG_IS_BIG_ENDIAN: u8 = 1 << 0;
/// Flag: sketch is read-only (compact sketches are read-only)
pub(crate) const FLAG_IS_READ_ONLY: u8 = 1 << 1;
/// Flag: sketch is empty
pub(crate) const FLAG_IS_EMPTY: u8 = 1 << 2;
/// Flag: sketch is in compact format
pub(crate) const FLAG_IS_COMPACT: u8 = 1 << 3;
/// Flag: hash values are ordered (sorted)
pub(crate) const FLAG_IS_ORDERED: u8 = 1 << 4;
/// Flag: sketch contains a single item (special case)
pub(crate) const FLAG_HAS_SINGLE_ITEM: u8 = 1 << 5;

/// Size of a single hash entry in bytes (u64)
pub(crate) const HASH_SIZE_BYTES: usize = 8;

/// Float bits of the default sampling probability 1.0
pub(crate) const DEFAULT_P_FLOAT_BITS: u32 = 0x3F80_0000;

/// Parsed first preamble long, common to every family.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Preamble {
    pub pre_longs: u8,
    pub ser_ver: u8,
    pub family_id: u8,
    pub lg_arr_longs: u8,
    pub lg_nom_longs: u8,
    pub flags: u8,
    pub seed_hash: u16,
}

impl Preamble {
    /// Parse the first preamble long from the cursor.
    pub fn parse(cursor: &mut SketchSlice<'_>) -> Result<Self, Error> {
        let make_error = |tag: &'static str| move |_| Error::insufficient_data(tag);

        let pre_longs = cursor.read_u8().map_err(make_error("preamble_longs"))?;
        let ser_ver = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let lg_arr_longs = cursor.read_u8().map_err(make_error("lg_arr_longs"))?;
        let lg_nom_longs = cursor.read_u8().map_err(make_error("lg_nom_longs"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let seed_hash = cursor.read_u16_le().map_err(make_error("seed_hash"))?;

        if !matches!(ser_ver, SERIAL_VERSION | SERIAL_VERSION_1 | SERIAL_VERSION_2) {
            return Err(Error::unsupported_serial_version(ser_ver));
        }
        if ![
            Family::COMPACT.id,
            Family::UNION.id,
            Family::INTERSECTION.id,
            Family::A_NOT_B.id,
        ]
        .contains(&family_id)
        {
            return Err(Error::malformed(format!(
                "unknown theta family id: {family_id}"
            )));
        }

        Ok(Self {
            pre_longs,
            ser_ver,
            family_id,
            lg_arr_longs,
            lg_nom_longs,
            flags,
            seed_hash,
        })
    }

    /// Write the first preamble long.
    pub fn write(&self, out: &mut SketchBytes) {
        out.write_u8(self.pre_longs);
        out.write_u8(self.ser_ver);
        out.write_u8(self.family_id);
        out.write_u8(self.lg_arr_longs);
        out.write_u8(self.lg_nom_longs);
        out.write_u8(self.flags);
        out.write_u16_le(self.seed_hash);
    }

    pub fn is_empty_flag(&self) -> bool {
        (self.flags & FLAG_IS_EMPTY) != 0
    }

    pub fn is_compact(&self) -> bool {
        (self.flags & FLAG_IS_COMPACT) != 0
    }

    pub fn is_read_only(&self) -> bool {
        (self.flags & FLAG_IS_READ_ONLY) != 0
    }

    pub fn is_ordered(&self) -> bool {
        (self.flags & FLAG_IS_ORDERED) != 0
    }

    /// Single-item detection: the dedicated flag bit and the preamble
    /// shape (1 pre-long, ser-ver 3, compact family, ordered, compact,
    /// read-only, not empty) must agree.
    pub fn is_single_item(&self) -> Result<bool, Error> {
        let flag = (self.flags & FLAG_HAS_SINGLE_ITEM) != 0;
        let shape = self.pre_longs == PREAMBLE_LONGS_EMPTY
            && self.ser_ver == SERIAL_VERSION
            && self.family_id == Family::COMPACT.id
            && self.is_ordered()
            && self.is_compact()
            && self.is_read_only()
            && !self.is_empty_flag();
        if flag != shape {
            return Err(Error::malformed(format!(
                "single-item flag ({flag}) disagrees with preamble shape ({shape})"
            )));
        }
        Ok(flag)
    }

    /// Validate the stored seed hash against the caller's seed.
    ///
    /// A stored value of 0 means the image carries no seed hash (legacy)
    /// and the expected value is adopted. Empty images skip the check.
    pub fn validate_seed_hash(&self, expected: u16) -> Result<u16, Error> {
        if self.is_empty_flag() || self.seed_hash == 0 {
            return Ok(expected);
        }
        if self.seed_hash != expected {
            return Err(Error::seed_mismatch(expected, self.seed_hash));
        }
        Ok(self.seed_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(bytes: &[u8]) -> Result<Preamble, Error> {
        let mut cursor = SketchSlice::new(bytes);
        Preamble::parse(&mut cursor)
    }

    #[test]
    fn test_flag_masks() {
        // Verify flag masks are distinct powers of 2
        assert_eq!(FLAG_IS_BIG_ENDIAN, 1);
        assert_eq!(FLAG_IS_READ_ONLY, 2);
        assert_eq!(FLAG_IS_EMPTY, 4);
        assert_eq!(FLAG_IS_COMPACT, 8);
        assert_eq!(FLAG_IS_ORDERED, 16);
        assert_eq!(FLAG_HAS_SINGLE_ITEM, 32);
    }

    #[test]
    fn test_parse_round_trip() {
        let pre = Preamble {
            pre_longs: 3,
            ser_ver: SERIAL_VERSION,
            family_id: Family::UNION.id,
            lg_arr_longs: 6,
            lg_nom_longs: 5,
            flags: FLAG_IS_EMPTY,
            seed_hash: 0xBEEF,
        };
        let mut out = SketchBytes::with_capacity(8);
        pre.write(&mut out);
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 8);

        let parsed = image(&bytes).unwrap();
        assert_eq!(parsed.pre_longs, 3);
        assert_eq!(parsed.family_id, Family::UNION.id);
        assert_eq!(parsed.lg_arr_longs, 6);
        assert_eq!(parsed.lg_nom_longs, 5);
        assert!(parsed.is_empty_flag());
        assert_eq!(parsed.seed_hash, 0xBEEF);
    }

    #[test]
    fn test_rejects_unknown_family() {
        let bytes = [1u8, 3, 99, 0, 0, 0, 0, 0];
        assert!(image(&bytes).is_err());
    }

    #[test]
    fn test_rejects_unknown_serial_version() {
        let bytes = [1u8, 4, 3, 0, 0, 0, 0, 0];
        assert!(image(&bytes).is_err());
    }

    #[test]
    fn test_single_item_agreement() {
        let flags = FLAG_IS_READ_ONLY | FLAG_IS_COMPACT | FLAG_IS_ORDERED | FLAG_HAS_SINGLE_ITEM;
        let ok = image(&[1, 3, 3, 0, 0, flags, 0xAA, 0xBB]).unwrap();
        assert!(ok.is_single_item().unwrap());

        // Flag set but wrong shape (2 pre-longs)
        let bad = image(&[2, 3, 3, 0, 0, flags, 0xAA, 0xBB]).unwrap();
        assert!(bad.is_single_item().is_err());

        // Shape matches but flag missing
        let flags = FLAG_IS_READ_ONLY | FLAG_IS_COMPACT | FLAG_IS_ORDERED;
        let bad = image(&[1, 3, 3, 0, 0, flags, 0xAA, 0xBB]).unwrap();
        assert!(bad.is_single_item().is_err());

        // Empty image is not a single item and the flag is clear: agreement
        let flags = FLAG_IS_READ_ONLY | FLAG_IS_COMPACT | FLAG_IS_ORDERED | FLAG_IS_EMPTY;
        let empty = image(&[1, 3, 3, 0, 0, flags, 0xAA, 0xBB]).unwrap();
        assert!(!empty.is_single_item().unwrap());
    }

    #[test]
    fn test_seed_hash_validation() {
        let flags = FLAG_IS_READ_ONLY | FLAG_IS_COMPACT;
        let pre = image(&[2, 3, 3, 0, 0, flags, 0xAA, 0xBB]).unwrap();
        assert_eq!(pre.validate_seed_hash(0xBBAA).unwrap(), 0xBBAA);
        assert!(pre.validate_seed_hash(0x1234).is_err());

        // Empty images skip the check
        let pre = image(&[1, 3, 3, 0, 0, flags | FLAG_IS_EMPTY, 0xAA, 0xBB]).unwrap();
        assert_eq!(pre.validate_seed_hash(0x1234).unwrap(), 0x1234);

        // Stored zero means "no seed hash": adopt the caller's
        let pre = image(&[2, 2, 3, 0, 0, flags, 0x00, 0x00]).unwrap();
        assert_eq!(pre.validate_seed_hash(0x1234).unwrap(), 0x1234);
    }
}
