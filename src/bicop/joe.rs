//! # Joe
//!
//! $$
//! C(u,v)=1-\left[(1-u)^\theta+(1-v)^\theta-(1-u)^\theta(1-v)^\theta\right]^{1/\theta},
//! \quad\theta\ge 1
//! $$
//!
//! `hinv1` has no closed form; the dispatch layer inverts `hfunc1` by
//! bisection.
use roots::find_root_brent;
use roots::SimpleConvergency;

use crate::bicop::JOE_THETA_MAX;

fn powers(theta: f64, u1: f64, u2: f64) -> (f64, f64, f64) {
  let x = (1.0 - u1).powf(theta);
  let y = (1.0 - u2).powf(theta);
  (x, y, x + y - x * y)
}

pub(crate) fn pdf(theta: f64, u1: f64, u2: f64) -> f64 {
  let (_, _, s) = powers(theta, u1, u2);
  s.powf(1.0 / theta - 2.0)
    * (1.0 - u1).powf(theta - 1.0)
    * (1.0 - u2).powf(theta - 1.0)
    * (theta - 1.0 + s)
}

pub(crate) fn cdf(theta: f64, u1: f64, u2: f64) -> f64 {
  let (_, _, s) = powers(theta, u1, u2);
  1.0 - s.powf(1.0 / theta)
}

pub(crate) fn hfunc1(theta: f64, u1: f64, u2: f64) -> f64 {
  let (_, y, s) = powers(theta, u1, u2);
  s.powf(1.0 / theta - 1.0) * (1.0 - u1).powf(theta - 1.0) * (1.0 - y)
}

/// Series expansion of Kendall's tau for the Joe copula,
/// tau = 1 - 4 sum_k 1 / (k (theta k + 2) (theta (k - 1) + 2)).
pub(crate) fn tau(theta: f64) -> f64 {
  let mut acc = 0.0;
  for k in 1..=2000u32 {
    let k = k as f64;
    acc += 1.0 / (k * (theta * k + 2.0) * (theta * (k - 1.0) + 2.0));
  }
  1.0 - 4.0 * acc
}

pub(crate) fn par_from_tau(target: f64) -> f64 {
  let t = target.max(0.0);
  if t < 1e-10 {
    return 1.0;
  }
  let hi = JOE_THETA_MAX - 1e-6;
  if t >= tau(hi) {
    return hi;
  }
  let mut conv = SimpleConvergency {
    eps: 1e-10,
    max_iter: 100,
  };
  find_root_brent(1.0, hi, |th| tau(th) - t, &mut conv).unwrap_or(1.0)
}
