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

//! Update seed and seed hash.
//!
//! The producing sketch hashes its input with MurmurHash3 x64/128 keyed
//! by a 64-bit update seed. Set operations never re-hash values; they
//! only need to detect cross-seed inputs, which is what the 16-bit seed
//! hash is for.

/// The default update seed shared by all DataSketches implementations.
pub const DEFAULT_UPDATE_SEED: u64 = 9001;

/// Compute the 16-bit hash of a 64-bit update seed.
///
/// This is the low 16 bits of MurmurHash3 x64/128 over the
/// little-endian bytes of the seed, with hash seed 0, matching the
/// value the producing sketch stores in its serialized preamble.
///
/// # Examples
///
/// ```
/// use theta_setops::hash::DEFAULT_UPDATE_SEED;
/// use theta_setops::hash::compute_seed_hash;
///
/// let h = compute_seed_hash(DEFAULT_UPDATE_SEED);
/// assert_ne!(h, 0);
/// assert_ne!(h, compute_seed_hash(1234));
/// ```
pub fn compute_seed_hash(seed: u64) -> u16 {
    let (h1, _) = mur3::murmurhash3_x64_128(&seed.to_le_bytes(), 0);
    (h1 & 0xFFFF) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_hash_is_stable() {
        assert_eq!(
            compute_seed_hash(DEFAULT_UPDATE_SEED),
            compute_seed_hash(DEFAULT_UPDATE_SEED)
        );
    }

    #[test]
    fn test_seed_hash_differs_across_seeds() {
        let a = compute_seed_hash(1);
        let b = compute_seed_hash(2);
        let c = compute_seed_hash(DEFAULT_UPDATE_SEED);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_default_seed_hash_nonzero() {
        // Zero is reserved to mean "no seed hash" in legacy images.
        assert_ne!(compute_seed_hash(DEFAULT_UPDATE_SEED), 0);
    }
}
