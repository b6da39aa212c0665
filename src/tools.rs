//! # Tools
//!
//! $$
//! f(y^\*)=x,\quad y^\*\in(\varepsilon,1-\varepsilon)
//! $$
//!
use ndarray::Array1;
use ndarray::Array2;
use ndarray_stats::QuantileExt;

use crate::error::VineError;

/// Interior clamp applied to h-function and inverse outputs so that later
/// quantile transforms stay finite.
pub const UNIT_EPS: f64 = 1e-10;

/// Default bisection bracket, kept away from boundary singularities of
/// quantile-type functions.
pub const INVERT_LOWER: f64 = 1e-20;
pub const INVERT_UPPER: f64 = 1.0 - 1e-20;

/// Default bisection depth; 35 halvings resolve the unit bracket to about
/// 3e-11.
pub const INVERT_ITERATIONS: usize = 35;

/// Bisection search for `f(y) = x`, vectorized over `x`.
///
/// `f` must be monotone increasing in each coordinate over
/// `(lower, upper)`. Pure function of its inputs; safe to call from
/// several threads with different data.
pub fn invert_monotone<F>(
  x: &Array1<f64>,
  f: F,
  lower: f64,
  upper: f64,
  iterations: usize,
) -> Array1<f64>
where
  F: Fn(&Array1<f64>) -> Array1<f64>,
{
  let n = x.len();
  let mut lo = Array1::from_elem(n, lower);
  let mut hi = Array1::from_elem(n, upper);

  for _ in 0..iterations {
    let mid = (&lo + &hi) * 0.5;
    let fm = f(&mid);
    for i in 0..n {
      if fm[i] <= x[i] {
        lo[i] = mid[i];
      } else {
        hi[i] = mid[i];
      }
    }
  }

  (lo + hi) * 0.5
}

/// Bisection with the default bracket and depth.
pub fn invert<F>(x: &Array1<f64>, f: F) -> Array1<f64>
where
  F: Fn(&Array1<f64>) -> Array1<f64>,
{
  invert_monotone(x, f, INVERT_LOWER, INVERT_UPPER, INVERT_ITERATIONS)
}

/// Checks that every entry of `u` lies strictly inside the unit interval.
/// Violations are a construction-time error, never silently clamped.
pub fn check_unit_interior(u: &Array2<f64>) -> Result<(), VineError> {
  if u.is_empty() {
    return Err(VineError::InvalidData("empty observation matrix".into()));
  }
  if u.iter().any(|v| !v.is_finite()) {
    return Err(VineError::InvalidData(
      "observations contain non-finite values".into(),
    ));
  }
  let min = *u
    .min()
    .map_err(|e| VineError::InvalidData(e.to_string()))?;
  let max = *u
    .max()
    .map_err(|e| VineError::InvalidData(e.to_string()))?;
  if min <= 0.0 || max >= 1.0 {
    return Err(VineError::InvalidData(format!(
      "observations must lie in the open interval (0, 1), found range [{}, {}]",
      min, max
    )));
  }
  Ok(())
}

/// Checks an n x 2 matrix of pair-copula arguments.
pub fn check_pair_data(u: &Array2<f64>) -> Result<(), VineError> {
  if u.ncols() != 2 {
    return Err(VineError::InvalidData(format!(
      "pair-copula input must have 2 columns, got {}",
      u.ncols()
    )));
  }
  check_unit_interior(u)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::arr2;
  use ndarray::Array1;

  use super::*;

  #[test]
  fn inverts_cubic_to_bisection_resolution() {
    let x = Array1::from(vec![0.001, 0.125, 0.5, 0.729, 0.999]);
    let y = invert(&x, |v| v.mapv(|t| t * t * t));
    for i in 0..x.len() {
      assert_abs_diff_eq!(y[i].powi(3), x[i], epsilon = 1e-9);
    }
  }

  #[test]
  fn invert_handles_per_row_functions() {
    // f_i(y) = y^(i+1): mixed monotone maps inverted in one call
    let x = Array1::from(vec![0.5, 0.5, 0.5]);
    let y = invert(&x, |v| {
      Array1::from_iter(v.iter().enumerate().map(|(i, t)| t.powi(i as i32 + 1)))
    });
    assert_abs_diff_eq!(y[0], 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(y[1], 0.5f64.sqrt(), epsilon = 1e-9);
    assert_abs_diff_eq!(y[2], 0.5f64.cbrt(), epsilon = 1e-9);
  }

  #[test]
  fn rejects_boundary_and_non_finite_data() {
    assert!(check_unit_interior(&arr2(&[[0.5, 0.0], [0.2, 0.3]])).is_err());
    assert!(check_unit_interior(&arr2(&[[0.5, 1.0], [0.2, 0.3]])).is_err());
    assert!(check_unit_interior(&arr2(&[[0.5, f64::NAN]])).is_err());
    assert!(check_unit_interior(&arr2(&[[0.5, 0.4], [0.2, 0.3]])).is_ok());
  }
}
