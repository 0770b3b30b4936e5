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

//! Two-sided binomial bounds for theta sketch estimates.
//!
//! A theta sketch retains each distinct hash independently with
//! probability theta, so the retained count is binomially distributed
//! around `n * theta`. The bounds below invert the continuous normal
//! approximation of that distribution at 1, 2 or 3 standard deviations.
//! The lower bound is clamped to the retained count, which is always a
//! certain lower bound on the true cardinality.

use crate::common::NumStdDev;
use crate::error::Error;

fn check_theta(theta: f64) -> Result<(), Error> {
    if !(theta > 0.0 && theta <= 1.0) {
        return Err(Error::invalid_argument(format!(
            "theta must be in (0.0, 1.0], got {theta}"
        )));
    }
    Ok(())
}

// Continuous approximation of the binomial lower bound. The 0.5
// continuity correction and the quadratic solve come from inverting
// n_hat = (count +- z * sqrt(count * (1 - theta))) / theta.
fn cont_classic_lb(num_samples: f64, theta: f64, num_std_dev: f64) -> f64 {
    let n_hat = (num_samples - 0.5) / theta;
    let b = num_std_dev * ((1.0 - theta) / theta).sqrt();
    let d = 0.5 * b * ((b * b) + (4.0 * n_hat)).sqrt();
    let center = n_hat + (0.5 * (b * b));
    center - d
}

fn cont_classic_ub(num_samples: f64, theta: f64, num_std_dev: f64) -> f64 {
    let n_hat = (num_samples + 0.5) / theta;
    let b = num_std_dev * ((1.0 - theta) / theta).sqrt();
    let d = 0.5 * b * ((b * b) + (4.0 * n_hat)).sqrt();
    let center = n_hat + (0.5 * (b * b));
    center + d
}

/// Approximate lower bound on the number of distinct items, at the
/// given number of standard deviations.
///
/// # Errors
///
/// Returns an error if `theta` is not in (0.0, 1.0].
pub fn lower_bound(num_samples: u64, theta: f64, num_std_dev: NumStdDev) -> Result<f64, Error> {
    check_theta(theta)?;
    let n = num_samples as f64;
    if theta == 1.0 || num_samples == 0 {
        return Ok(n);
    }
    let lb = cont_classic_lb(n, theta, num_std_dev.as_u8() as f64);
    // The retained count itself is a certain lower bound.
    Ok(lb.max(n))
}

/// Approximate upper bound on the number of distinct items, at the
/// given number of standard deviations.
///
/// # Errors
///
/// Returns an error if `theta` is not in (0.0, 1.0].
pub fn upper_bound(
    num_samples: u64,
    theta: f64,
    num_std_dev: NumStdDev,
    is_empty: bool,
) -> Result<f64, Error> {
    check_theta(theta)?;
    if is_empty {
        return Ok(0.0);
    }
    let n = num_samples as f64;
    if theta == 1.0 {
        return Ok(n);
    }
    let estimate = n / theta;
    let ub = cont_classic_ub(n, theta, num_std_dev.as_u8() as f64);
    Ok(ub.max(estimate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_mode_bounds_equal_count() {
        assert_eq!(lower_bound(100, 1.0, NumStdDev::Two).unwrap(), 100.0);
        assert_eq!(upper_bound(100, 1.0, NumStdDev::Two, false).unwrap(), 100.0);
    }

    #[test]
    fn test_bounds_bracket_estimate() {
        let theta = 0.25;
        let n = 1000u64;
        let estimate = n as f64 / theta;
        for sd in [NumStdDev::One, NumStdDev::Two, NumStdDev::Three] {
            let lb = lower_bound(n, theta, sd).unwrap();
            let ub = upper_bound(n, theta, sd, false).unwrap();
            assert!(lb <= estimate, "lb {lb} > estimate {estimate}");
            assert!(ub >= estimate, "ub {ub} < estimate {estimate}");
        }
    }

    #[test]
    fn test_bounds_widen_with_std_dev() {
        let theta = 0.1;
        let n = 500u64;
        let lb1 = lower_bound(n, theta, NumStdDev::One).unwrap();
        let lb3 = lower_bound(n, theta, NumStdDev::Three).unwrap();
        let ub1 = upper_bound(n, theta, NumStdDev::One, false).unwrap();
        let ub3 = upper_bound(n, theta, NumStdDev::Three, false).unwrap();
        assert!(lb3 <= lb1);
        assert!(ub3 >= ub1);
    }

    #[test]
    fn test_lower_bound_never_below_retained() {
        let lb = lower_bound(3, 0.9999, NumStdDev::Three).unwrap();
        assert!(lb >= 3.0);
    }

    #[test]
    fn test_empty_upper_bound_is_zero() {
        assert_eq!(upper_bound(0, 0.5, NumStdDev::Two, true).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_theta_rejected() {
        assert!(lower_bound(1, 0.0, NumStdDev::One).is_err());
        assert!(lower_bound(1, 1.5, NumStdDev::One).is_err());
        assert!(upper_bound(1, -0.1, NumStdDev::One, false).is_err());
    }
}
