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

//! Set operations over theta sketches.
//!
//! Theta sketches summarize large sets as a uniform sample of 64-bit
//! hashes below a threshold theta. Because the sample is uniform, set
//! algebra carries over: this crate implements union, intersection and
//! difference (A-not-B) directly on the samples, with bit-exact
//! serialized images that round-trip across DataSketches
//! implementations.
//!
//! ```
//! use theta_setops::theta::CompactThetaSketch;
//! use theta_setops::theta::SetOperationBuilder;
//! use theta_setops::theta::ThetaSketchView;
//!
//! let max = i64::MAX as u64;
//! let a = CompactThetaSketch::from_hashes(vec![10, 20, 30], max, 9001, true).unwrap();
//! let b = CompactThetaSketch::from_hashes(vec![20, 40], max, 9001, true).unwrap();
//!
//! let mut union = SetOperationBuilder::default().build_union().unwrap();
//! union.update(&a).unwrap();
//! union.update(&b).unwrap();
//!
//! let result = union.result();
//! assert_eq!(result.estimate(), 4.0);
//! let bytes = result.serialize();
//! let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
//! assert_eq!(restored.estimate(), 4.0);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub(crate) mod codec;
pub mod common;
pub mod error;
pub mod hash;
pub mod mem;
pub mod theta;
