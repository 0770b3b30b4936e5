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

//! Interface of the concurrent producer layer.
//!
//! Many producer threads feed one shared union-like sketch. Producers
//! own local hash buffers and hand them over as propagation messages;
//! the shared sketch applies them under mutual exclusion and publishes
//! its theta through a single atomic store, so producers can trim their
//! local buffers early against a slightly stale threshold.
//!
//! This crate defines the contract only; implementations live with the
//! streaming producer, outside this core.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// A shared theta sketch accepting propagations from many producers.
///
/// Contract:
/// * At most one eager propagation is in flight at a time; the
///   [`start_eager_propagation`](Self::start_eager_propagation) /
///   [`end_propagation`](Self::end_propagation) bracket is exclusive.
/// * Lazy propagations may be executed on a bounded worker pool keyed
///   by `producer_id % pool_size`, which preserves per-producer order;
///   ordering across producers is not guaranteed. Idempotence under
///   duplicate hashes makes the result order-insensitive.
/// * `done` is owned by the caller; it is set exactly once, when the
///   propagated buffer has been fully applied and may be reused.
/// * [`volatile_theta`](Self::volatile_theta) is monotonically
///   non-increasing and may lag the true threshold; it never runs
///   ahead of it.
/// * Cancellation is not supported; callers drain through
///   [`await_bg_propagation_termination`](Self::await_bg_propagation_termination)
///   before shutdown.
pub trait ConcurrentSharedSketch {
    /// Propagate a producer's local buffer of hashes.
    fn propagate(&self, producer_id: u64, hashes: Vec<u64>, done: Arc<AtomicBool>);

    /// Propagate a single hash eagerly.
    fn propagate_hash(&self, hash: u64);

    /// The published theta, readable without locking.
    fn volatile_theta(&self) -> u64;

    /// Enter the exclusive propagation bracket.
    fn start_eager_propagation(&self);

    /// Leave the exclusive propagation bracket.
    fn end_propagation(&self);

    /// Block until all background propagations have been applied.
    fn await_bg_propagation_termination(&self);
}
