//! # Student
//!
//! $$
//! c(u,v)=\frac{f_{2,\nu,\rho}\left(T_\nu^{-1}(u),T_\nu^{-1}(v)\right)}
//! {f_\nu\left(T_\nu^{-1}(u)\right)f_\nu\left(T_\nu^{-1}(v)\right)}
//! $$
//!
use gauss_quad::GaussLegendre;
use statrs::distribution::Continuous;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::StudentsT;
use statrs::function::gamma::ln_gamma;

const QUANTILE_EPS: f64 = 1e-12;

fn qt(dist: &StudentsT, p: f64) -> f64 {
  dist.inverse_cdf(p.clamp(QUANTILE_EPS, 1.0 - QUANTILE_EPS))
}

pub(crate) fn pdf(rho: f64, nu: f64, u1: f64, u2: f64) -> f64 {
  let dist = StudentsT::new(0.0, 1.0, nu).unwrap();
  let t1 = qt(&dist, u1);
  let t2 = qt(&dist, u2);
  let r2 = 1.0 - rho * rho;

  // bivariate t density over the product of univariate t densities
  let ln_f2 = ln_gamma((nu + 2.0) / 2.0)
    - ln_gamma(nu / 2.0)
    - (nu * std::f64::consts::PI * r2.sqrt()).ln()
    - (nu + 2.0) / 2.0 * (1.0 + (t1 * t1 - 2.0 * rho * t1 * t2 + t2 * t2) / (nu * r2)).ln();
  (ln_f2 - dist.pdf(t1).ln() - dist.pdf(t2).ln()).exp()
}

pub(crate) fn cdf(rho: f64, nu: f64, u1: f64, u2: f64) -> f64 {
  let quad = GaussLegendre::new(50).unwrap();
  quad.integrate(0.0, u1, |s| hfunc1(rho, nu, s, u2))
}

pub(crate) fn hfunc1(rho: f64, nu: f64, u1: f64, u2: f64) -> f64 {
  let dist = StudentsT::new(0.0, 1.0, nu).unwrap();
  let cond = StudentsT::new(0.0, 1.0, nu + 1.0).unwrap();
  let t1 = qt(&dist, u1);
  let t2 = qt(&dist, u2);
  let scale = ((nu + t1 * t1) * (1.0 - rho * rho) / (nu + 1.0)).sqrt();
  cond.cdf((t2 - rho * t1) / scale)
}

pub(crate) fn hinv1(rho: f64, nu: f64, u1: f64, y: f64) -> f64 {
  let dist = StudentsT::new(0.0, 1.0, nu).unwrap();
  let cond = StudentsT::new(0.0, 1.0, nu + 1.0).unwrap();
  let t1 = qt(&dist, u1);
  let scale = ((nu + t1 * t1) * (1.0 - rho * rho) / (nu + 1.0)).sqrt();
  dist.cdf(qt(&cond, y) * scale + rho * t1)
}

/// Same arcsine relation as the Gaussian copula; tau does not depend on
/// the degrees of freedom.
pub(crate) fn tau(rho: f64) -> f64 {
  (2.0 / std::f64::consts::PI) * rho.asin()
}

pub(crate) fn par_from_tau(tau: f64) -> f64 {
  (tau * std::f64::consts::PI / 2.0).sin()
}
