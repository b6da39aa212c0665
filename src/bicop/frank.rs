//! # Frank
//!
//! $$
//! C(u,v)=-\frac{1}{\theta}\ln\left(1+
//! \frac{(e^{-\theta u}-1)(e^{-\theta v}-1)}{e^{-\theta}-1}\right),
//! \quad\theta\in\mathbb{R}\setminus\{0\}
//! $$
//!
use gauss_quad::GaussLegendre;
use roots::find_root_brent;
use roots::SimpleConvergency;

use crate::bicop::FRANK_THETA_MAX;

pub(crate) fn pdf(theta: f64, u1: f64, u2: f64) -> f64 {
  let em = 1.0 - (-theta).exp();
  let e1 = 1.0 - (-theta * u1).exp();
  let e2 = 1.0 - (-theta * u2).exp();
  let den = em - e1 * e2;
  theta * em * (-theta * (u1 + u2)).exp() / (den * den)
}

pub(crate) fn cdf(theta: f64, u1: f64, u2: f64) -> f64 {
  let em = (-theta).exp() - 1.0;
  let e1 = (-theta * u1).exp() - 1.0;
  let e2 = (-theta * u2).exp() - 1.0;
  -(1.0 + e1 * e2 / em).ln() / theta
}

pub(crate) fn hfunc1(theta: f64, u1: f64, u2: f64) -> f64 {
  let em = (-theta).exp() - 1.0;
  let e1 = (-theta * u1).exp() - 1.0;
  let e2 = (-theta * u2).exp() - 1.0;
  (e1 + 1.0) * e2 / (em + e1 * e2)
}

pub(crate) fn hinv1(theta: f64, u1: f64, y: f64) -> f64 {
  let em = (-theta).exp() - 1.0;
  let a = (-theta * u1).exp();
  let w = y * em / (a - y * (a - 1.0));
  -(1.0 + w).ln() / theta
}

/// First Debye function, by Gauss-Legendre quadrature.
fn debye1(theta: f64) -> f64 {
  let quad = GaussLegendre::new(30).unwrap();
  quad.integrate(0.0, theta, |t| t / t.exp_m1()) / theta
}

// Below this the 1 - D_1(theta) cancellation swamps the quadrature and the
// Debye series takes over.
const TAU_SERIES_CUTOFF: f64 = 1e-3;

/// No closed form: tau goes through the Debye integral, odd in theta.
/// Near zero the expansion tau = theta/9 - theta^3/900 + ... is used instead.
pub(crate) fn tau(theta: f64) -> f64 {
  let t = theta.abs();
  if t < 1e-10 {
    return 0.0;
  }
  if t < TAU_SERIES_CUTOFF {
    return (t / 9.0 * (1.0 - t * t / 100.0)).copysign(theta);
  }
  let tau = 1.0 - 4.0 / t * (1.0 - debye1(t));
  tau.copysign(theta)
}

/// Inverts the tau integral by scalar bisection over the positive branch.
pub(crate) fn par_from_tau(target: f64) -> f64 {
  let t = target.abs();
  if t < 1e-10 {
    return 1e-10f64.copysign(target);
  }
  let hi = FRANK_THETA_MAX - 1e-6;
  if t >= tau(hi) {
    return hi.copysign(target);
  }
  // Small targets sit on the linear part of the series branch.
  if t < 1e-4 {
    return (9.0 * t).copysign(target);
  }
  let mut conv = SimpleConvergency {
    eps: 1e-10,
    max_iter: 100,
  };
  let theta = find_root_brent(1e-4, hi, |th| tau(th) - t, &mut conv).unwrap_or(1.0);
  theta.copysign(target)
}
