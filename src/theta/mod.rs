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

//! Theta sketch set operations.
//!
//! The engines here consume read-only theta sketch views and produce
//! compact sketches:
//!
//! * [`ThetaUnion`] / [`MemoryUnion`]: A ∪ B, heap- or buffer-backed
//! * [`ThetaIntersection`]: A ∩ B
//! * [`ThetaAnotB`] / [`a_not_b`]: A \ B, stateful or single-shot
//!
//! All of them maintain the theta sketch sampling property: after any
//! sequence of updates the retained set is exactly
//! `{hash | 0 < hash < theta}` with theta at most the minimum theta of
//! the inputs, so estimates stay unbiased.

mod a_not_b;
mod builder;
mod compact;
mod concurrent;
pub(crate) mod hash_table;
mod intersection;
mod memory_union;
pub(crate) mod preamble;
mod sketch;
mod union;
mod wrapped;

pub use a_not_b::ThetaAnotB;
pub use a_not_b::a_not_b;
pub use builder::SetOperationBuilder;
pub use builder::max_a_not_b_result_bytes;
pub use builder::max_intersection_bytes;
pub use builder::max_union_bytes;
pub use compact::CompactThetaSketch;
pub use concurrent::ConcurrentSharedSketch;
pub use intersection::ThetaIntersection;
pub use intersection::WrappedIntersection;
pub use memory_union::MemoryUnion;
pub use sketch::ThetaSketchView;
pub use union::ThetaUnion;
pub use wrapped::WrappedCompactThetaSketch;
