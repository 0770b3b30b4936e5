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

use theta_setops::error::ErrorKind;
use theta_setops::hash::DEFAULT_UPDATE_SEED;
use theta_setops::theta::CompactThetaSketch;
use theta_setops::theta::SetOperationBuilder;
use theta_setops::theta::ThetaSketchView;
use theta_setops::theta::WrappedCompactThetaSketch;
use theta_setops::theta::a_not_b;

const MAX_THETA: u64 = i64::MAX as u64;

fn exact_sketch(hashes: Vec<u64>) -> CompactThetaSketch {
    CompactThetaSketch::from_hashes(hashes, MAX_THETA, DEFAULT_UPDATE_SEED, true).unwrap()
}

#[test]
fn test_self_difference_correction() {
    let a = exact_sketch(vec![7]);
    let r = a_not_b(&a, &a, true).unwrap();

    assert!(r.is_empty());
    assert_eq!(r.num_retained(), 0);
    assert_eq!(r.theta64(), MAX_THETA);

    // The correction rule makes this exactly the 8-byte empty image
    let bytes = r.serialize();
    assert_eq!(bytes.len(), 8);
    assert_ne!(bytes[5] & (1 << 2), 0, "empty flag should be set");
}

#[test]
fn test_basic_difference() {
    let a = exact_sketch(vec![1, 2, 3, 4, 5]);
    let b = exact_sketch(vec![4, 5, 6, 7]);

    let r = a_not_b(&a, &b, true).unwrap();
    assert_eq!(r.estimate(), 3.0);
    assert_eq!(r.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn test_absorbing_elements() {
    let a = exact_sketch(vec![10, 20]);
    let empty = CompactThetaSketch::empty_with_default_seed();

    // a \ empty == a
    let r = a_not_b(&a, &empty, true).unwrap();
    assert_eq!(r.iter().collect::<Vec<_>>(), vec![10, 20]);
    assert!(!r.is_empty());

    // empty \ a == empty
    let r = a_not_b(&empty, &a, true).unwrap();
    assert!(r.is_empty());
}

#[test]
fn test_stateful_repeatable_not_b() {
    let a = exact_sketch(vec![1, 2, 3, 4, 5, 6]);
    let b1 = exact_sketch(vec![2, 4]);
    let b2 = exact_sketch(vec![6, 8]);

    let mut op = SetOperationBuilder::default().build_a_not_b().unwrap();
    op.set_a(&a).unwrap();
    op.not_b(&b1).unwrap();
    op.not_b(&b2).unwrap();

    let r = op.result();
    assert_eq!(r.iter().collect::<Vec<_>>(), vec![1, 3, 5]);

    // Repeated subtraction of the same set changes nothing
    op.not_b(&b1).unwrap();
    assert_eq!(op.result().iter().collect::<Vec<_>>(), vec![1, 3, 5]);
}

#[test]
fn test_min_theta_applies() {
    let a = CompactThetaSketch::from_hashes(vec![5, 15, 25], 30, DEFAULT_UPDATE_SEED, true)
        .unwrap();
    let b = CompactThetaSketch::from_hashes(vec![15], 20, DEFAULT_UPDATE_SEED, true).unwrap();

    let r = a_not_b(&a, &b, true).unwrap();
    assert_eq!(r.theta64(), 20);
    assert_eq!(r.iter().collect::<Vec<_>>(), vec![5]);
    assert!(r.is_estimation_mode());
}

#[test]
fn test_set_a_replaces_previous_state() {
    let mut op = SetOperationBuilder::default().build_a_not_b().unwrap();
    op.set_a(&exact_sketch(vec![1, 2])).unwrap();
    op.not_b(&exact_sketch(vec![1])).unwrap();

    op.set_a(&exact_sketch(vec![9])).unwrap();
    assert_eq!(op.result().iter().collect::<Vec<_>>(), vec![9]);
}

#[test]
fn test_seed_mismatch() {
    let a = exact_sketch(vec![1]);
    let other = CompactThetaSketch::from_hashes(vec![1], MAX_THETA, 777, true).unwrap();

    let err = a_not_b(&a, &other, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SeedMismatch);
}

#[test]
fn test_wrapped_inputs() {
    let bytes_a = exact_sketch(vec![1, 2, 3]).serialize();
    let bytes_b = exact_sketch(vec![3]).serialize();

    let r = a_not_b(
        &WrappedCompactThetaSketch::wrap(&bytes_a).unwrap(),
        &WrappedCompactThetaSketch::wrap(&bytes_b).unwrap(),
        true,
    )
    .unwrap();
    assert_eq!(r.iter().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_result_goes_into_caller_buffer() {
    // A-not-B never persists its own state; results are compact
    // sketches and can be written to a caller buffer.
    let a = exact_sketch(vec![50, 60]);
    let b = exact_sketch(vec![60]);

    let r = a_not_b(&a, &b, true).unwrap();
    let mut dst = vec![0u8; theta_setops::theta::max_a_not_b_result_bytes(16)];
    let written = r.serialize_into(&mut dst).unwrap();
    let restored = CompactThetaSketch::deserialize(&dst[..written]).unwrap();
    assert_eq!(restored.iter().collect::<Vec<_>>(), vec![50]);
}

#[test]
fn test_single_item_upgrade_on_result() {
    let a = exact_sketch(vec![100, 200]);
    let b = exact_sketch(vec![200]);

    let r = a_not_b(&a, &b, true).unwrap();
    assert!(r.is_single_item());
    assert_eq!(r.serialize().len(), 16);
}
