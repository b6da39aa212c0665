//! # Bicop
//!
//! $$
//! h_1(u_2\mid u_1)=\frac{\partial C(u_1,u_2)}{\partial u_1},\qquad
//! h_2(u_1\mid u_2)=\frac{\partial C(u_1,u_2)}{\partial u_2}
//! $$
//!
//! Bivariate copula families behind a single tagged dispatch: canonical
//! (rotation 0) math lives in one module per family, the four rotations
//! are argument substitutions applied here, never re-derived per family.
use ndarray::stack;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::error::VineError;
use crate::tools;

pub mod clayton;
pub mod fit;
pub mod frank;
pub mod gaussian;
pub mod gumbel;
pub mod independence;
pub mod joe;
pub mod student;

pub(crate) const CLAYTON_THETA_MIN: f64 = 1e-10;
pub(crate) const CLAYTON_THETA_MAX: f64 = 28.0;
pub(crate) const GUMBEL_THETA_MAX: f64 = 50.0;
pub(crate) const FRANK_THETA_MAX: f64 = 35.0;
pub(crate) const JOE_THETA_MAX: f64 = 30.0;
pub(crate) const STUDENT_NU_MIN: f64 = 2.0;
pub(crate) const STUDENT_NU_MAX: f64 = 50.0;

/// The fixed family enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BicopFamily {
  Independence,
  Gaussian,
  Student,
  Clayton,
  Gumbel,
  Frank,
  Joe,
}

impl BicopFamily {
  /// All families, in deterministic candidate order.
  pub const ALL: [BicopFamily; 7] = [
    BicopFamily::Independence,
    BicopFamily::Gaussian,
    BicopFamily::Student,
    BicopFamily::Clayton,
    BicopFamily::Gumbel,
    BicopFamily::Frank,
    BicopFamily::Joe,
  ];

  pub fn name(self) -> &'static str {
    match self {
      BicopFamily::Independence => "independence",
      BicopFamily::Gaussian => "gaussian",
      BicopFamily::Student => "student",
      BicopFamily::Clayton => "clayton",
      BicopFamily::Gumbel => "gumbel",
      BicopFamily::Frank => "frank",
      BicopFamily::Joe => "joe",
    }
  }

  /// Number of free parameters.
  pub fn npars(self) -> usize {
    match self {
      BicopFamily::Independence => 0,
      BicopFamily::Student => 2,
      _ => 1,
    }
  }

  /// Families covering only positive dependence in canonical form; these
  /// admit all four rotations. The remaining families cover both signs
  /// through their parameter and only admit rotation 0.
  pub fn rotatable(self) -> bool {
    matches!(
      self,
      BicopFamily::Clayton | BicopFamily::Gumbel | BicopFamily::Joe
    )
  }

  /// Per-parameter bounds of the canonical parameterization.
  pub fn bounds(self) -> Vec<(f64, f64)> {
    match self {
      BicopFamily::Independence => vec![],
      BicopFamily::Gaussian => vec![(-1.0, 1.0)],
      BicopFamily::Student => vec![(-1.0, 1.0), (STUDENT_NU_MIN, STUDENT_NU_MAX)],
      BicopFamily::Clayton => vec![(CLAYTON_THETA_MIN, CLAYTON_THETA_MAX)],
      BicopFamily::Gumbel => vec![(1.0, GUMBEL_THETA_MAX)],
      BicopFamily::Frank => vec![(-FRANK_THETA_MAX, FRANK_THETA_MAX)],
      BicopFamily::Joe => vec![(1.0, JOE_THETA_MAX)],
    }
  }
}

/// Counter-clockwise rotation of the canonical copula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
  R0,
  R90,
  R180,
  R270,
}

impl Rotation {
  pub fn degrees(self) -> u16 {
    match self {
      Rotation::R0 => 0,
      Rotation::R90 => 90,
      Rotation::R180 => 180,
      Rotation::R270 => 270,
    }
  }

  pub fn from_degrees(deg: u16) -> Result<Self, VineError> {
    match deg {
      0 => Ok(Rotation::R0),
      90 => Ok(Rotation::R90),
      180 => Ok(Rotation::R180),
      270 => Ok(Rotation::R270),
      _ => Err(VineError::InvalidRotation {
        family: "any",
        rotation: deg,
      }),
    }
  }

  /// Whether the rotation negates Kendall's tau relative to canonical.
  fn negates_tau(self) -> bool {
    matches!(self, Rotation::R90 | Rotation::R270)
  }
}

/// Model selection criterion for pair-copula fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitCriterion {
  LogLik,
  Aic,
  Bic,
}

/// A bivariate copula: family tag, rotation and validated parameters.
/// Immutable once fitted; refitting produces a new instance.
#[derive(Debug, Clone)]
pub struct Bicop {
  family: BicopFamily,
  rotation: Rotation,
  parameters: Array1<f64>,
}

impl Default for Bicop {
  fn default() -> Self {
    Self::independence()
  }
}

impl Bicop {
  /// Builds a copula, failing fast on inadmissible rotations or
  /// out-of-bounds parameters.
  pub fn new(
    family: BicopFamily,
    rotation: Rotation,
    parameters: Array1<f64>,
  ) -> Result<Self, VineError> {
    if rotation != Rotation::R0 && !family.rotatable() {
      return Err(VineError::InvalidRotation {
        family: family.name(),
        rotation: rotation.degrees(),
      });
    }

    let bounds = family.bounds();
    if parameters.len() != bounds.len() {
      return Err(VineError::InvalidData(format!(
        "{} expects {} parameters, got {}",
        family.name(),
        bounds.len(),
        parameters.len()
      )));
    }
    for (i, (&p, &(lo, hi))) in parameters.iter().zip(bounds.iter()).enumerate() {
      let inclusive_lower = matches!(family, BicopFamily::Gumbel | BicopFamily::Joe) && i == 0;
      let ok = p.is_finite() && p < hi && (p > lo || (inclusive_lower && p == lo));
      if !ok {
        return Err(VineError::ParameterBounds {
          family: family.name(),
          index: i,
          value: p,
          lower: lo,
          upper: hi,
        });
      }
    }
    if family == BicopFamily::Frank && parameters[0].abs() < 1e-10 {
      return Err(VineError::ParameterBounds {
        family: family.name(),
        index: 0,
        value: parameters[0],
        lower: -FRANK_THETA_MAX,
        upper: FRANK_THETA_MAX,
      });
    }

    Ok(Self {
      family,
      rotation,
      parameters,
    })
  }

  pub fn independence() -> Self {
    Self {
      family: BicopFamily::Independence,
      rotation: Rotation::R0,
      parameters: Array1::zeros(0),
    }
  }

  pub fn family(&self) -> BicopFamily {
    self.family
  }

  pub fn rotation(&self) -> Rotation {
    self.rotation
  }

  pub fn parameters(&self) -> &Array1<f64> {
    &self.parameters
  }

  pub fn npars(&self) -> usize {
    self.family.npars()
  }

  /// Swaps the roles of the two arguments. All canonical families are
  /// exchangeable, so this only trades rotation 90 for 270.
  pub fn flip(&mut self) {
    self.rotation = match self.rotation {
      Rotation::R90 => Rotation::R270,
      Rotation::R270 => Rotation::R90,
      r => r,
    };
  }

  /// Kendall's tau implied by the parameters, rotation included.
  pub fn tau(&self) -> f64 {
    let t = Self::parameters_to_tau(self.family, &self.parameters);
    if self.rotation.negates_tau() {
      -t
    } else {
      t
    }
  }

  /// Canonical (rotation 0) parameter-to-tau conversion.
  pub fn parameters_to_tau(family: BicopFamily, parameters: &Array1<f64>) -> f64 {
    match family {
      BicopFamily::Independence => 0.0,
      BicopFamily::Gaussian => gaussian::tau(parameters[0]),
      BicopFamily::Student => student::tau(parameters[0]),
      BicopFamily::Clayton => clayton::tau(parameters[0]),
      BicopFamily::Gumbel => gumbel::tau(parameters[0]),
      BicopFamily::Frank => frank::tau(parameters[0]),
      BicopFamily::Joe => joe::tau(parameters[0]),
    }
  }

  /// Canonical tau-to-parameter conversion (moment start for fitting).
  /// The Student start uses 5 degrees of freedom; tau pins down only the
  /// correlation.
  pub fn tau_to_parameters(family: BicopFamily, tau: f64) -> Array1<f64> {
    match family {
      BicopFamily::Independence => Array1::zeros(0),
      BicopFamily::Gaussian => {
        Array1::from(vec![gaussian::par_from_tau(tau).clamp(-0.99, 0.99)])
      }
      BicopFamily::Student => Array1::from(vec![
        student::par_from_tau(tau).clamp(-0.99, 0.99),
        5.0,
      ]),
      BicopFamily::Clayton => Array1::from(vec![clayton::par_from_tau(tau.max(1e-4)).clamp(
        CLAYTON_THETA_MIN,
        CLAYTON_THETA_MAX - 1e-6,
      )]),
      BicopFamily::Gumbel => Array1::from(vec![gumbel::par_from_tau(tau.max(0.0))
        .clamp(1.0, GUMBEL_THETA_MAX - 1e-6)]),
      BicopFamily::Frank => Array1::from(vec![frank::par_from_tau(tau)]),
      BicopFamily::Joe => Array1::from(vec![joe::par_from_tau(tau)]),
    }
  }

  fn pdf0(&self, u1: f64, u2: f64) -> f64 {
    let p = &self.parameters;
    match self.family {
      BicopFamily::Independence => independence::pdf(u1, u2),
      BicopFamily::Gaussian => gaussian::pdf(p[0], u1, u2),
      BicopFamily::Student => student::pdf(p[0], p[1], u1, u2),
      BicopFamily::Clayton => clayton::pdf(p[0], u1, u2),
      BicopFamily::Gumbel => gumbel::pdf(p[0], u1, u2),
      BicopFamily::Frank => frank::pdf(p[0], u1, u2),
      BicopFamily::Joe => joe::pdf(p[0], u1, u2),
    }
  }

  fn cdf0(&self, u1: f64, u2: f64) -> f64 {
    let p = &self.parameters;
    match self.family {
      BicopFamily::Independence => independence::cdf(u1, u2),
      BicopFamily::Gaussian => gaussian::cdf(p[0], u1, u2),
      BicopFamily::Student => student::cdf(p[0], p[1], u1, u2),
      BicopFamily::Clayton => clayton::cdf(p[0], u1, u2),
      BicopFamily::Gumbel => gumbel::cdf(p[0], u1, u2),
      BicopFamily::Frank => frank::cdf(p[0], u1, u2),
      BicopFamily::Joe => joe::cdf(p[0], u1, u2),
    }
  }

  fn h10(&self, u1: f64, u2: f64) -> f64 {
    let p = &self.parameters;
    match self.family {
      BicopFamily::Independence => independence::hfunc1(u1, u2),
      BicopFamily::Gaussian => gaussian::hfunc1(p[0], u1, u2),
      BicopFamily::Student => student::hfunc1(p[0], p[1], u1, u2),
      BicopFamily::Clayton => clayton::hfunc1(p[0], u1, u2),
      BicopFamily::Gumbel => gumbel::hfunc1(p[0], u1, u2),
      BicopFamily::Frank => frank::hfunc1(p[0], u1, u2),
      BicopFamily::Joe => joe::hfunc1(p[0], u1, u2),
    }
  }

  /// Canonical inverse of `h10` in its second argument; closed form where
  /// one exists, bisection otherwise.
  fn hinv10(&self, cond: &Array1<f64>, y: &Array1<f64>) -> Array1<f64> {
    let p = &self.parameters;
    match self.family {
      BicopFamily::Independence => y.clone(),
      BicopFamily::Gaussian => Array1::from_iter(
        cond
          .iter()
          .zip(y.iter())
          .map(|(&c, &t)| gaussian::hinv1(p[0], c, t)),
      ),
      BicopFamily::Student => Array1::from_iter(
        cond
          .iter()
          .zip(y.iter())
          .map(|(&c, &t)| student::hinv1(p[0], p[1], c, t)),
      ),
      BicopFamily::Clayton => Array1::from_iter(
        cond
          .iter()
          .zip(y.iter())
          .map(|(&c, &t)| clayton::hinv1(p[0], c, t)),
      ),
      BicopFamily::Frank => Array1::from_iter(
        cond
          .iter()
          .zip(y.iter())
          .map(|(&c, &t)| frank::hinv1(p[0], c, t)),
      ),
      BicopFamily::Gumbel | BicopFamily::Joe => tools::invert(y, |v| {
        Array1::from_iter(
          v.iter()
            .zip(cond.iter())
            .map(|(&vi, &ci)| self.h10(ci, vi)),
        )
      }),
    }
  }

  /// Copula density at each row of an n x 2 matrix.
  pub fn pdf(&self, u: &Array2<f64>) -> Result<Array1<f64>, VineError> {
    tools::check_pair_data(u)?;
    let mut out = Array1::zeros(u.nrows());
    for i in 0..u.nrows() {
      let (a, b) = self.rotate_args(u[[i, 0]], u[[i, 1]]);
      out[i] = clamp_density(self.pdf0(a, b));
    }
    Ok(out)
  }

  /// Copula distribution at each row of an n x 2 matrix.
  pub fn cdf(&self, u: &Array2<f64>) -> Result<Array1<f64>, VineError> {
    tools::check_pair_data(u)?;
    let mut out = Array1::zeros(u.nrows());
    for i in 0..u.nrows() {
      let (u1, u2) = (u[[i, 0]], u[[i, 1]]);
      let v = match self.rotation {
        Rotation::R0 => self.cdf0(u1, u2),
        Rotation::R90 => u1 - self.cdf0(1.0 - u2, u1),
        Rotation::R180 => u1 + u2 - 1.0 + self.cdf0(1.0 - u1, 1.0 - u2),
        Rotation::R270 => u2 - self.cdf0(u2, 1.0 - u1),
      };
      out[i] = v.clamp(0.0, 1.0);
    }
    Ok(out)
  }

  /// `h_1(u_2 | u_1)`: conditional distribution of the second argument
  /// given the first.
  pub fn hfunc1(&self, u: &Array2<f64>) -> Result<Array1<f64>, VineError> {
    tools::check_pair_data(u)?;
    let mut out = Array1::zeros(u.nrows());
    for i in 0..u.nrows() {
      let (u1, u2) = (u[[i, 0]], u[[i, 1]]);
      let v = match self.rotation {
        Rotation::R0 => self.h10(u1, u2),
        Rotation::R90 => 1.0 - self.h10(u1, 1.0 - u2),
        Rotation::R180 => 1.0 - self.h10(1.0 - u1, 1.0 - u2),
        Rotation::R270 => self.h10(1.0 - u1, u2),
      };
      out[i] = clamp_interior(v);
    }
    Ok(out)
  }

  /// `h_2(u_1 | u_2)`: conditional distribution of the first argument
  /// given the second. Canonical families are exchangeable, so this is
  /// `h_1` with swapped columns under the rotation map.
  pub fn hfunc2(&self, u: &Array2<f64>) -> Result<Array1<f64>, VineError> {
    tools::check_pair_data(u)?;
    let mut out = Array1::zeros(u.nrows());
    for i in 0..u.nrows() {
      let (u1, u2) = (u[[i, 0]], u[[i, 1]]);
      let v = match self.rotation {
        Rotation::R0 => self.h10(u2, u1),
        Rotation::R90 => self.h10(1.0 - u2, u1),
        Rotation::R180 => 1.0 - self.h10(1.0 - u2, 1.0 - u1),
        Rotation::R270 => 1.0 - self.h10(u2, 1.0 - u1),
      };
      out[i] = clamp_interior(v);
    }
    Ok(out)
  }

  /// Solves `hfunc1(u1, x) = y` for `x`; column 0 holds `u1`, column 1
  /// holds `y`.
  pub fn hinv1(&self, u: &Array2<f64>) -> Result<Array1<f64>, VineError> {
    tools::check_pair_data(u)?;
    let u1 = u.column(0).to_owned();
    let y = u.column(1).to_owned();
    let (cond, target, reflect) = match self.rotation {
      Rotation::R0 => (u1, y, false),
      Rotation::R90 => (u1, y.mapv(|v| 1.0 - v), true),
      Rotation::R180 => (u1.mapv(|v| 1.0 - v), y.mapv(|v| 1.0 - v), true),
      Rotation::R270 => (u1.mapv(|v| 1.0 - v), y, false),
    };
    let mut out = self.hinv10(&cond, &target);
    if reflect {
      out.mapv_inplace(|v| 1.0 - v);
    }
    out.mapv_inplace(clamp_interior);
    Ok(out)
  }

  /// Solves `hfunc2(x, u2) = y` for `x`; column 0 holds `y`, column 1
  /// holds `u2`.
  pub fn hinv2(&self, u: &Array2<f64>) -> Result<Array1<f64>, VineError> {
    tools::check_pair_data(u)?;
    let y = u.column(0).to_owned();
    let u2 = u.column(1).to_owned();
    let (cond, target, reflect) = match self.rotation {
      Rotation::R0 => (u2, y, false),
      Rotation::R90 => (u2.mapv(|v| 1.0 - v), y, false),
      Rotation::R180 => (u2.mapv(|v| 1.0 - v), y.mapv(|v| 1.0 - v), true),
      Rotation::R270 => (u2, y.mapv(|v| 1.0 - v), true),
    };
    let mut out = self.hinv10(&cond, &target);
    if reflect {
      out.mapv_inplace(|v| 1.0 - v);
    }
    out.mapv_inplace(clamp_interior);
    Ok(out)
  }

  /// Log-likelihood of the data under this copula.
  pub fn loglik(&self, u: &Array2<f64>) -> Result<f64, VineError> {
    Ok(self.pdf(u)?.mapv(f64::ln).sum())
  }

  /// Fits one family/rotation pair to data by maximum likelihood.
  pub fn fit(
    family: BicopFamily,
    rotation: Rotation,
    data: &Array2<f64>,
  ) -> Result<Self, VineError> {
    fit::fit(family, rotation, data)
  }

  /// Picks the best family/rotation candidate under the criterion.
  pub fn select(
    data: &Array2<f64>,
    families: &[BicopFamily],
    criterion: FitCriterion,
  ) -> Result<Self, VineError> {
    fit::select(data, families, criterion)
  }

  /// Draws n pairs by conditional inversion with an explicit generator.
  pub fn simulate<R: Rng + ?Sized>(
    &self,
    n: usize,
    rng: &mut R,
  ) -> Result<Array2<f64>, VineError> {
    let eps = tools::UNIT_EPS;
    let u1 = Array1::random_using(n, Uniform::new(eps, 1.0 - eps), rng);
    let w = Array1::random_using(n, Uniform::new(eps, 1.0 - eps), rng);
    let u2 = self.hinv1(&stack![Axis(1), u1, w])?;
    Ok(stack![Axis(1), u1, u2])
  }

  fn rotate_args(&self, u1: f64, u2: f64) -> (f64, f64) {
    match self.rotation {
      Rotation::R0 => (u1, u2),
      Rotation::R90 => (1.0 - u2, u1),
      Rotation::R180 => (1.0 - u1, 1.0 - u2),
      Rotation::R270 => (u2, 1.0 - u1),
    }
  }
}

/// Floating-point boundary policy: h-function and inverse outputs pushed
/// out of the unit interval are pulled back inside and logged, never
/// surfaced as errors.
fn clamp_interior(v: f64) -> f64 {
  if !v.is_finite() {
    tracing::debug!(value = v, "non-finite h-function output clamped");
    return 0.5;
  }
  if v < tools::UNIT_EPS {
    if v < 0.0 {
      tracing::trace!(value = v, "h-function output clamped to lower bound");
    }
    tools::UNIT_EPS
  } else if v > 1.0 - tools::UNIT_EPS {
    if v > 1.0 {
      tracing::trace!(value = v, "h-function output clamped to upper bound");
    }
    1.0 - tools::UNIT_EPS
  } else {
    v
  }
}

fn clamp_density(v: f64) -> f64 {
  if !v.is_finite() {
    tracing::debug!(value = v, "non-finite density clamped");
    return 1e-300;
  }
  v.max(1e-300)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use gauss_quad::GaussLegendre;
  use ndarray::array;
  use ndarray::stack;
  use ndarray::Array1;
  use ndarray::Axis;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::*;
  use crate::dependence::kendall_tau;

  fn test_copulas() -> Vec<Bicop> {
    vec![
      Bicop::independence(),
      Bicop::new(BicopFamily::Gaussian, Rotation::R0, array![0.5]).unwrap(),
      Bicop::new(BicopFamily::Gaussian, Rotation::R0, array![-0.7]).unwrap(),
      Bicop::new(BicopFamily::Student, Rotation::R0, array![0.4, 6.0]).unwrap(),
      Bicop::new(BicopFamily::Clayton, Rotation::R0, array![2.0]).unwrap(),
      Bicop::new(BicopFamily::Clayton, Rotation::R90, array![2.0]).unwrap(),
      Bicop::new(BicopFamily::Clayton, Rotation::R180, array![2.0]).unwrap(),
      Bicop::new(BicopFamily::Clayton, Rotation::R270, array![2.0]).unwrap(),
      Bicop::new(BicopFamily::Gumbel, Rotation::R0, array![1.8]).unwrap(),
      Bicop::new(BicopFamily::Gumbel, Rotation::R90, array![1.8]).unwrap(),
      Bicop::new(BicopFamily::Frank, Rotation::R0, array![4.0]).unwrap(),
      Bicop::new(BicopFamily::Frank, Rotation::R0, array![-4.0]).unwrap(),
      Bicop::new(BicopFamily::Joe, Rotation::R0, array![2.5]).unwrap(),
      Bicop::new(BicopFamily::Joe, Rotation::R270, array![2.5]).unwrap(),
    ]
  }

  fn grid_points() -> Array2<f64> {
    let vals = [0.1, 0.3, 0.5, 0.7, 0.9];
    let mut rows = Vec::new();
    for &a in &vals {
      for &b in &vals {
        rows.push([a, b]);
      }
    }
    Array2::from_shape_vec((rows.len(), 2), rows.concat()).unwrap()
  }

  #[test]
  fn hinv1_inverts_hfunc1() {
    let u = grid_points();
    for bc in test_copulas() {
      let y = bc.hfunc1(&u).unwrap();
      let back = bc
        .hinv1(&stack![Axis(1), u.column(0).to_owned(), y])
        .unwrap();
      for i in 0..u.nrows() {
        assert_abs_diff_eq!(back[i], u[[i, 1]], epsilon = 1e-8);
      }
    }
  }

  #[test]
  fn hinv2_inverts_hfunc2() {
    let u = grid_points();
    for bc in test_copulas() {
      let y = bc.hfunc2(&u).unwrap();
      let back = bc
        .hinv2(&stack![Axis(1), y, u.column(1).to_owned()])
        .unwrap();
      for i in 0..u.nrows() {
        assert_abs_diff_eq!(back[i], u[[i, 0]], epsilon = 1e-8);
      }
    }
  }

  #[test]
  fn tau_parameter_round_trips() {
    let cases = [
      (BicopFamily::Gaussian, 0.5),
      (BicopFamily::Gaussian, -0.6),
      (BicopFamily::Student, 0.4),
      (BicopFamily::Clayton, 0.3),
      (BicopFamily::Clayton, 0.7),
      (BicopFamily::Gumbel, 0.45),
      (BicopFamily::Frank, 0.5),
      (BicopFamily::Frank, -0.35),
      (BicopFamily::Joe, 0.4),
    ];
    for &(family, tau) in &cases {
      let pars = Bicop::tau_to_parameters(family, tau);
      let back = Bicop::parameters_to_tau(family, &pars);
      assert_abs_diff_eq!(back, tau, epsilon = 1e-6);
    }
    // parameter -> tau -> parameter
    for &(family, par) in &[
      (BicopFamily::Gaussian, 0.55),
      (BicopFamily::Clayton, 3.0),
      (BicopFamily::Gumbel, 2.2),
      (BicopFamily::Frank, 5.5),
      (BicopFamily::Joe, 2.0),
    ] {
      let tau = Bicop::parameters_to_tau(family, &array![par]);
      let back = Bicop::tau_to_parameters(family, tau);
      assert_abs_diff_eq!(back[0], par, epsilon = 1e-5);
    }
  }

  #[test]
  fn frank_tau_inversion_covers_weak_dependence() {
    // theta for tau = 0.5 from the Debye relation.
    let pars = Bicop::tau_to_parameters(BicopFamily::Frank, 0.5);
    assert_abs_diff_eq!(pars[0], 5.736, epsilon = 1e-3);
    for &target in &[1e-6, 1e-4, 5e-4, 0.01, 0.1, -0.1, -3e-5] {
      let pars = Bicop::tau_to_parameters(BicopFamily::Frank, target);
      let back = Bicop::parameters_to_tau(BicopFamily::Frank, &pars);
      assert_abs_diff_eq!(back, target, epsilon = 1e-6);
    }
    for &theta in &[1e-8, 1e-5, 5e-4, 2e-3] {
      assert!(Bicop::parameters_to_tau(BicopFamily::Frank, &array![theta]).abs() < 1.0);
      assert_abs_diff_eq!(
        Bicop::parameters_to_tau(BicopFamily::Frank, &array![theta]),
        theta / 9.0,
        epsilon = 1e-9
      );
    }
  }

  #[test]
  fn density_integrates_to_one() {
    let quad = GaussLegendre::new(128).unwrap();
    for bc in [
      Bicop::independence(),
      Bicop::new(BicopFamily::Gaussian, Rotation::R0, array![0.5]).unwrap(),
      Bicop::new(BicopFamily::Student, Rotation::R0, array![0.4, 8.0]).unwrap(),
      Bicop::new(BicopFamily::Clayton, Rotation::R0, array![2.0]).unwrap(),
      Bicop::new(BicopFamily::Clayton, Rotation::R90, array![2.0]).unwrap(),
      Bicop::new(BicopFamily::Gumbel, Rotation::R0, array![1.7]).unwrap(),
      Bicop::new(BicopFamily::Frank, Rotation::R0, array![4.0]).unwrap(),
      Bicop::new(BicopFamily::Joe, Rotation::R180, array![2.0]).unwrap(),
    ] {
      let mass = quad.integrate(0.0, 1.0, |a| {
        quad.integrate(0.0, 1.0, |b| {
          let (x, y) = bc.rotate_args(a, b);
          bc.pdf0(x.clamp(1e-14, 1.0 - 1e-14), y.clamp(1e-14, 1.0 - 1e-14))
        })
      });
      assert_abs_diff_eq!(mass, 1.0, epsilon = 1e-3);
    }
  }

  #[test]
  fn cdf_respects_frechet_bounds_and_margins() {
    let u = grid_points();
    for bc in test_copulas() {
      let c = bc.cdf(&u).unwrap();
      for i in 0..u.nrows() {
        let (a, b) = (u[[i, 0]], u[[i, 1]]);
        assert!(c[i] <= a.min(b) + 1e-6);
        assert!(c[i] >= (a + b - 1.0).max(0.0) - 1e-6);
      }
      let near_one = bc.cdf(&array![[0.4, 0.9999], [0.9999, 0.4]]).unwrap();
      assert_abs_diff_eq!(near_one[0], 0.4, epsilon = 5e-3);
      assert_abs_diff_eq!(near_one[1], 0.4, epsilon = 5e-3);
    }
  }

  #[test]
  fn rotation_flips_tau_sign() {
    let pos = Bicop::new(BicopFamily::Clayton, Rotation::R0, array![2.0]).unwrap();
    let neg = Bicop::new(BicopFamily::Clayton, Rotation::R90, array![2.0]).unwrap();
    assert!(pos.tau() > 0.0);
    assert_abs_diff_eq!(neg.tau(), -pos.tau(), epsilon = 1e-12);
  }

  #[test]
  fn flip_swaps_quarter_rotations_only() {
    let mut bc = Bicop::new(BicopFamily::Gumbel, Rotation::R90, array![2.0]).unwrap();
    bc.flip();
    assert_eq!(bc.rotation(), Rotation::R270);
    bc.flip();
    assert_eq!(bc.rotation(), Rotation::R90);

    let mut surv = Bicop::new(BicopFamily::Clayton, Rotation::R180, array![2.0]).unwrap();
    surv.flip();
    assert_eq!(surv.rotation(), Rotation::R180);
  }

  #[test]
  fn simulation_matches_model_tau() {
    let mut rng = StdRng::seed_from_u64(7);
    for bc in [
      Bicop::new(BicopFamily::Gaussian, Rotation::R0, array![0.6]).unwrap(),
      Bicop::new(BicopFamily::Clayton, Rotation::R90, array![3.0]).unwrap(),
      Bicop::new(BicopFamily::Gumbel, Rotation::R0, array![2.0]).unwrap(),
    ] {
      let u = bc.simulate(2000, &mut rng).unwrap();
      let tau_hat = kendall_tau(&u.column(0).to_owned(), &u.column(1).to_owned()).unwrap();
      assert_abs_diff_eq!(tau_hat, bc.tau(), epsilon = 0.06);
    }
  }

  #[test]
  fn construction_rejects_bad_parameters() {
    assert!(matches!(
      Bicop::new(BicopFamily::Gaussian, Rotation::R0, array![1.2]),
      Err(VineError::ParameterBounds { .. })
    ));
    assert!(matches!(
      Bicop::new(BicopFamily::Gumbel, Rotation::R0, array![0.8]),
      Err(VineError::ParameterBounds { .. })
    ));
    assert!(matches!(
      Bicop::new(BicopFamily::Gaussian, Rotation::R90, array![0.5]),
      Err(VineError::InvalidRotation { .. })
    ));
    assert!(Bicop::new(BicopFamily::Gumbel, Rotation::R0, array![1.0]).is_ok());
  }

  #[test]
  fn rejects_data_outside_open_interval() {
    let bc = Bicop::new(BicopFamily::Gaussian, Rotation::R0, array![0.5]).unwrap();
    let bad = array![[0.5, 1.0], [0.2, 0.4]];
    assert!(matches!(bc.pdf(&bad), Err(VineError::InvalidData(_))));
  }
}
