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

//! Common types shared across the crate.

pub mod binomial_bounds;

/// Number of standard deviations for confidence bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumStdDev {
    /// One standard deviation (~68% confidence).
    One,
    /// Two standard deviations (~95% confidence).
    Two,
    /// Three standard deviations (~99% confidence).
    Three,
}

impl NumStdDev {
    /// Return the number of standard deviations as u8.
    pub fn as_u8(&self) -> u8 {
        match self {
            NumStdDev::One => 1,
            NumStdDev::Two => 2,
            NumStdDev::Three => 3,
        }
    }
}

/// Resize factor for the open-addressed caches of set operations.
///
/// Controls how much a cache grows each time it crosses its load
/// threshold, until it reaches its maximum size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeFactor {
    /// No resizing: allocate the maximum size up front.
    X1,
    /// Double the cache on each resize.
    X2,
    /// Quadruple the cache on each resize.
    X4,
    /// Grow the cache by 8x on each resize.
    X8,
}

impl ResizeFactor {
    /// Return log2 of the growth multiple.
    pub fn lg_value(&self) -> u8 {
        match self {
            ResizeFactor::X1 => 0,
            ResizeFactor::X2 => 1,
            ResizeFactor::X4 => 2,
            ResizeFactor::X8 => 3,
        }
    }
}

/// Smallest power of two >= n. n must be > 0 and representable.
pub(crate) fn ceil_pow2(n: usize) -> usize {
    n.next_power_of_two()
}

/// log2 of a power of two.
pub(crate) fn lg_of_pow2(n: usize) -> u8 {
    debug_assert!(n.is_power_of_two());
    n.trailing_zeros() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_std_dev_as_u8() {
        assert_eq!(NumStdDev::One.as_u8(), 1);
        assert_eq!(NumStdDev::Two.as_u8(), 2);
        assert_eq!(NumStdDev::Three.as_u8(), 3);
    }

    #[test]
    fn test_resize_factor_lg_value() {
        assert_eq!(ResizeFactor::X1.lg_value(), 0);
        assert_eq!(ResizeFactor::X2.lg_value(), 1);
        assert_eq!(ResizeFactor::X4.lg_value(), 2);
        assert_eq!(ResizeFactor::X8.lg_value(), 3);
    }

    #[test]
    fn test_ceil_pow2() {
        assert_eq!(ceil_pow2(1), 1);
        assert_eq!(ceil_pow2(3), 4);
        assert_eq!(ceil_pow2(16), 16);
        assert_eq!(ceil_pow2(17), 32);
    }

    #[test]
    fn test_lg_of_pow2() {
        assert_eq!(lg_of_pow2(1), 0);
        assert_eq!(lg_of_pow2(32), 5);
        assert_eq!(lg_of_pow2(1 << 20), 20);
    }
}
