//! # Independence
//!
//! $$
//! C(u,v)=uv
//! $$
//!

pub(crate) fn pdf(_u1: f64, _u2: f64) -> f64 {
  1.0
}

pub(crate) fn cdf(u1: f64, u2: f64) -> f64 {
  u1 * u2
}

pub(crate) fn hfunc1(_u1: f64, u2: f64) -> f64 {
  u2
}

pub(crate) fn hinv1(_u1: f64, y: f64) -> f64 {
  y
}
