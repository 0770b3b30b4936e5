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

//! Little-endian byte plumbing for sketch images.
//!
//! All serialized theta images are little-endian; the writer and reader
//! here are thin wrappers so the format code reads as a sequence of
//! typed fields rather than raw slice arithmetic.

mod family;

pub(crate) use family::Family;

use std::io;
use std::io::Cursor;

use byteorder::LittleEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

pub(crate) struct SketchBytes {
    bytes: Vec<u8>,
}

impl SketchBytes {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_u8(&mut self, n: u8) {
        // Vec<u8> writes cannot fail
        WriteBytesExt::write_u8(&mut self.bytes, n).unwrap();
    }

    pub fn write_u16_le(&mut self, n: u16) {
        self.bytes.write_u16::<LittleEndian>(n).unwrap();
    }

    pub fn write_u32_le(&mut self, n: u32) {
        self.bytes.write_u32::<LittleEndian>(n).unwrap();
    }

    pub fn write_u64_le(&mut self, n: u64) {
        self.bytes.write_u64::<LittleEndian>(n).unwrap();
    }

    pub fn write_f32_le(&mut self, n: f32) {
        self.bytes.write_f32::<LittleEndian>(n).unwrap();
    }
}

pub(crate) struct SketchSlice<'a> {
    slice: Cursor<&'a [u8]>,
}

impl SketchSlice<'_> {
    pub fn new(slice: &[u8]) -> SketchSlice<'_> {
        SketchSlice {
            slice: Cursor::new(slice),
        }
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        ReadBytesExt::read_u8(&mut self.slice)
    }

    pub fn read_u16_le(&mut self) -> io::Result<u16> {
        self.slice.read_u16::<LittleEndian>()
    }

    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        self.slice.read_u32::<LittleEndian>()
    }

    pub fn read_u64_le(&mut self) -> io::Result<u64> {
        self.slice.read_u64::<LittleEndian>()
    }

    pub fn read_f32_le(&mut self) -> io::Result<f32> {
        self.slice.read_f32::<LittleEndian>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut bytes = SketchBytes::with_capacity(16);
        bytes.write_u8(3);
        bytes.write_u16_le(0x1234);
        bytes.write_u32_le(7);
        bytes.write_u64_le(u64::MAX - 1);
        bytes.write_f32_le(1.0);
        let buf = bytes.into_bytes();

        let mut slice = SketchSlice::new(&buf);
        assert_eq!(slice.read_u8().unwrap(), 3);
        assert_eq!(slice.read_u16_le().unwrap(), 0x1234);
        assert_eq!(slice.read_u32_le().unwrap(), 7);
        assert_eq!(slice.read_u64_le().unwrap(), u64::MAX - 1);
        assert_eq!(slice.read_f32_le().unwrap(), 1.0);
    }

    #[test]
    fn test_read_past_end_errors() {
        let mut slice = SketchSlice::new(&[1, 2, 3]);
        assert!(slice.read_u64_le().is_err());
    }

    #[test]
    fn test_little_endian_layout() {
        let mut bytes = SketchBytes::with_capacity(8);
        bytes.write_u64_le(0x0102_0304_0506_0708);
        assert_eq!(
            bytes.into_bytes(),
            [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
    }
}
