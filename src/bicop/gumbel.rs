//! # Gumbel
//!
//! $$
//! C(u,v)=\exp\left(-\left[(-\ln u)^\theta+(-\ln v)^\theta\right]^{1/\theta}\right),
//! \quad\theta\ge 1
//! $$
//!
//! The inverse h-function has no closed form; the dispatch layer inverts
//! `hfunc1` by bisection.

pub(crate) fn pdf(theta: f64, u1: f64, u2: f64) -> f64 {
  if theta == 1.0 {
    return 1.0;
  }
  let s = (-u1.ln()).powf(theta) + (-u2.ln()).powf(theta);
  cdf(theta, u1, u2)
    * (u1 * u2).recip()
    * s.powf(2.0 / theta - 2.0)
    * (u1.ln() * u2.ln()).powf(theta - 1.0)
    * (1.0 + (theta - 1.0) * s.powf(-1.0 / theta))
}

pub(crate) fn cdf(theta: f64, u1: f64, u2: f64) -> f64 {
  if theta == 1.0 {
    return u1 * u2;
  }
  let s = (-u1.ln()).powf(theta) + (-u2.ln()).powf(theta);
  (-s.powf(1.0 / theta)).exp()
}

pub(crate) fn hfunc1(theta: f64, u1: f64, u2: f64) -> f64 {
  if theta == 1.0 {
    return u2;
  }
  let s = (-u1.ln()).powf(theta) + (-u2.ln()).powf(theta);
  cdf(theta, u1, u2) * (-u1.ln()).powf(theta - 1.0) * s.powf(1.0 / theta - 1.0) / u1
}

pub(crate) fn tau(theta: f64) -> f64 {
  1.0 - 1.0 / theta
}

pub(crate) fn par_from_tau(tau: f64) -> f64 {
  1.0 / (1.0 - tau)
}
