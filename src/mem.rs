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

//! Interface to the caller-owned memory layer.
//!
//! Memory-backed engines alias buffers owned by the caller and never
//! allocate on them. When such an engine outgrows its buffer it asks a
//! [`MemoryRequestServer`] for a replacement; everything else about
//! buffer lifecycle (allocation, pooling, release) belongs to the
//! caller.

/// Callback through which a memory-backed union obtains a larger
/// backing buffer.
///
/// Returning `None` means no capacity is available; the requesting
/// operation fails with `InsufficientCapacity` and leaves its state
/// unchanged.
pub trait MemoryRequestServer {
    /// Request a buffer of at least `capacity_bytes` bytes.
    fn request(&self, capacity_bytes: usize) -> Option<Vec<u8>>;
}

/// A request server that always allocates from the heap.
#[derive(Debug, Default)]
pub struct HeapRequestServer;

impl MemoryRequestServer for HeapRequestServer {
    fn request(&self, capacity_bytes: usize) -> Option<Vec<u8>> {
        Some(vec![0u8; capacity_bytes])
    }
}
