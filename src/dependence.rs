//! # Dependence
//!
//! $$
//! \tau=\frac{c-d}{\binom{n}{2}},\qquad
//! \rho_S=\operatorname{corr}(\operatorname{rank}X,\operatorname{rank}Y)
//! $$
//!
//! Rank-based dependence measures used as spanning-tree edge weights and
//! for method-of-moments parameter starts.
use std::cmp::Ordering;

use ndarray::Array1;

use crate::error::VineError;

/// Pairwise dependence measure used to weight candidate spanning-tree
/// edges during structure selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeCriterion {
  /// Kendall's tau-b.
  Tau,
  /// Spearman's rank correlation.
  Rho,
  /// Hoeffding's D.
  HoeffdingD,
}

/// Kendall's tau-b between two columns.
pub fn kendall_tau(x: &Array1<f64>, y: &Array1<f64>) -> Result<f64, VineError> {
  let (tau, ..) = kendalls::tau_b_with_comparator(&x.to_vec(), &y.to_vec(), |a, b| {
    a.partial_cmp(b).unwrap_or(Ordering::Greater)
  })
  .map_err(|e| VineError::InvalidData(e.to_string()))?;
  Ok(tau)
}

/// Average ranks in 1..=n, ties sharing their mean rank.
pub(crate) fn ranks(x: &Array1<f64>) -> Vec<f64> {
  let n = x.len();
  let mut idx: Vec<usize> = (0..n).collect();
  idx.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(Ordering::Equal));

  let mut out = vec![0.0; n];
  let mut i = 0;
  while i < n {
    let mut j = i;
    while j + 1 < n && x[idx[j + 1]] == x[idx[i]] {
      j += 1;
    }
    let mean_rank = (i + j) as f64 / 2.0 + 1.0;
    for k in i..=j {
      out[idx[k]] = mean_rank;
    }
    i = j + 1;
  }
  out
}

/// Spearman's rho: Pearson correlation of the rank transforms.
pub fn spearman_rho(x: &Array1<f64>, y: &Array1<f64>) -> Result<f64, VineError> {
  if x.len() != y.len() || x.len() < 2 {
    return Err(VineError::InvalidData(
      "spearman_rho needs two equal-length columns with n >= 2".into(),
    ));
  }
  let rx = ranks(x);
  let ry = ranks(y);
  let n = rx.len() as f64;
  let mean = (n + 1.0) / 2.0;

  let mut sxy = 0.0;
  let mut sxx = 0.0;
  let mut syy = 0.0;
  for i in 0..rx.len() {
    let dx = rx[i] - mean;
    let dy = ry[i] - mean;
    sxy += dx * dy;
    sxx += dx * dx;
    syy += dy * dy;
  }
  if sxx <= 0.0 || syy <= 0.0 {
    return Ok(0.0);
  }
  Ok(sxy / (sxx * syy).sqrt())
}

/// Hoeffding's D statistic; ranges over [-0.5, 1] with 0 under
/// independence. Requires n >= 5.
pub fn hoeffding_d(x: &Array1<f64>, y: &Array1<f64>) -> Result<f64, VineError> {
  let n = x.len();
  if y.len() != n || n < 5 {
    return Err(VineError::InvalidData(
      "hoeffding_d needs two equal-length columns with n >= 5".into(),
    ));
  }
  let r = ranks(x);
  let s = ranks(y);

  // bivariate ranks: q_i = 1 + #{j : x_j < x_i, y_j < y_i}, ties by halves
  let mut q = vec![0.0; n];
  for i in 0..n {
    let mut c = 0.0;
    for j in 0..n {
      if j == i {
        continue;
      }
      let lx = if x[j] < x[i] {
        1.0
      } else if x[j] == x[i] {
        0.5
      } else {
        0.0
      };
      let ly = if y[j] < y[i] {
        1.0
      } else if y[j] == y[i] {
        0.5
      } else {
        0.0
      };
      c += lx * ly;
    }
    q[i] = 1.0 + c;
  }

  let mut d1 = 0.0;
  let mut d2 = 0.0;
  let mut d3 = 0.0;
  for i in 0..n {
    d1 += (q[i] - 1.0) * (q[i] - 2.0);
    d2 += (r[i] - 1.0) * (r[i] - 2.0) * (s[i] - 1.0) * (s[i] - 2.0);
    d3 += (r[i] - 2.0) * (s[i] - 2.0) * (q[i] - 1.0);
  }

  let nf = n as f64;
  let num = 30.0 * ((nf - 2.0) * (nf - 3.0) * d1 + d2 - 2.0 * (nf - 2.0) * d3);
  let den = nf * (nf - 1.0) * (nf - 2.0) * (nf - 3.0) * (nf - 4.0);
  Ok(num / den)
}

/// Dependence measure between two columns under the configured criterion.
pub fn pairwise(
  x: &Array1<f64>,
  y: &Array1<f64>,
  criterion: TreeCriterion,
) -> Result<f64, VineError> {
  match criterion {
    TreeCriterion::Tau => kendall_tau(x, y),
    TreeCriterion::Rho => spearman_rho(x, y),
    TreeCriterion::HoeffdingD => hoeffding_d(x, y),
  }
}
