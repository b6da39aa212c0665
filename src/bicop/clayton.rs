//! # Clayton
//!
//! $$
//! C(u,v)=\left(u^{-\theta}+v^{-\theta}-1\right)^{-1/\theta},\quad\theta>0
//! $$
//!

pub(crate) fn pdf(theta: f64, u1: f64, u2: f64) -> f64 {
  let s = u1.powf(-theta) + u2.powf(-theta) - 1.0;
  (1.0 + theta) * (u1 * u2).powf(-theta - 1.0) * s.powf(-(2.0 * theta + 1.0) / theta)
}

pub(crate) fn cdf(theta: f64, u1: f64, u2: f64) -> f64 {
  let s = u1.powf(-theta) + u2.powf(-theta) - 1.0;
  s.max(0.0).powf(-1.0 / theta)
}

pub(crate) fn hfunc1(theta: f64, u1: f64, u2: f64) -> f64 {
  let s = u1.powf(-theta) + u2.powf(-theta) - 1.0;
  u1.powf(-theta - 1.0) * s.powf(-(theta + 1.0) / theta)
}

pub(crate) fn hinv1(theta: f64, u1: f64, y: f64) -> f64 {
  let a = (y * u1.powf(theta + 1.0)).powf(-theta / (theta + 1.0));
  (a + 1.0 - u1.powf(-theta)).powf(-1.0 / theta)
}

pub(crate) fn tau(theta: f64) -> f64 {
  theta / (theta + 2.0)
}

pub(crate) fn par_from_tau(tau: f64) -> f64 {
  2.0 * tau / (1.0 - tau)
}
