//! # Gaussian
//!
//! $$
//! c(u,v)=\frac{\phi_2\left(\Phi^{-1}(u),\Phi^{-1}(v);\rho\right)}
//! {\phi\left(\Phi^{-1}(u)\right)\phi\left(\Phi^{-1}(v)\right)}
//! $$
//!
use gauss_quad::GaussLegendre;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::Normal;

const QUANTILE_EPS: f64 = 1e-12;

fn qnorm(norm: &Normal, p: f64) -> f64 {
  norm.inverse_cdf(p.clamp(QUANTILE_EPS, 1.0 - QUANTILE_EPS))
}

pub(crate) fn pdf(rho: f64, u1: f64, u2: f64) -> f64 {
  let norm = Normal::new(0.0, 1.0).unwrap();
  let t1 = qnorm(&norm, u1);
  let t2 = qnorm(&norm, u2);
  let r2 = 1.0 - rho * rho;
  ((2.0 * rho * t1 * t2 - rho * rho * (t1 * t1 + t2 * t2)) / (2.0 * r2)).exp() / r2.sqrt()
}

/// No closed form; integrates the conditional distribution over the first
/// argument with Gauss-Legendre nodes.
pub(crate) fn cdf(rho: f64, u1: f64, u2: f64) -> f64 {
  let quad = GaussLegendre::new(50).unwrap();
  quad.integrate(0.0, u1, |s| hfunc1(rho, s, u2))
}

pub(crate) fn hfunc1(rho: f64, u1: f64, u2: f64) -> f64 {
  let norm = Normal::new(0.0, 1.0).unwrap();
  let t1 = qnorm(&norm, u1);
  let t2 = qnorm(&norm, u2);
  let z = (t2 - rho * t1) / (1.0 - rho * rho).sqrt();
  if z.is_finite() {
    norm.cdf(z)
  } else if t2 - rho * t1 < 0.0 {
    0.0
  } else {
    1.0
  }
}

pub(crate) fn hinv1(rho: f64, u1: f64, y: f64) -> f64 {
  let norm = Normal::new(0.0, 1.0).unwrap();
  let t1 = qnorm(&norm, u1);
  let ty = qnorm(&norm, y);
  norm.cdf(ty * (1.0 - rho * rho).sqrt() + rho * t1)
}

pub(crate) fn tau(rho: f64) -> f64 {
  (2.0 / std::f64::consts::PI) * rho.asin()
}

pub(crate) fn par_from_tau(tau: f64) -> f64 {
  (tau * std::f64::consts::PI / 2.0).sin()
}
