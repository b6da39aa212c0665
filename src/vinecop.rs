//! # Vinecop
//!
//! $$
//! c(u_1,\dots,u_d)=\prod_{t=0}^{d-2}\prod_{e}
//! c_{a_e,b_e\mid D_e}\bigl(F(u_{a_e}\mid D_e),\,F(u_{b_e}\mid D_e)\bigr)
//! $$
//!
//! A vine copula model: an R-vine structure matrix plus one pair-copula
//! per edge. Density and simulation chain h-functions between tree
//! levels; conditional margins are cached per (variable, conditioning
//! set) because higher trees reuse lower-tree outputs.
use std::collections::HashMap;

use ndarray::stack;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::bicop::Bicop;
use crate::error::VineError;
use crate::tools;
use crate::vinecop::select::FitControls;
use crate::vinecop::structure::RVineMatrix;

pub mod select;
pub mod structure;

type ObsCache = HashMap<(usize, Vec<usize>), Array1<f64>>;

/// A fitted (or directly constructed) vine copula model. The structure
/// and the triangular pair-copula grid are immutable once assembled;
/// refitting builds a new model.
#[derive(Debug, Clone)]
pub struct Vinecop {
  structure: RVineMatrix,
  // pair_copulas[t][e]: tree t, edge column e, full triangle with
  // truncated trees filled by independence
  pair_copulas: Vec<Vec<Bicop>>,
}

impl Vinecop {
  /// The independence vine of a given dimension: default structure,
  /// every edge independent, density identically one.
  pub fn independence(d: usize) -> Result<Self, VineError> {
    let structure = RVineMatrix::default_structure(d)?;
    let pair_copulas = (0..d - 1)
      .map(|t| vec![Bicop::independence(); d - 1 - t])
      .collect();
    Ok(Self {
      structure,
      pair_copulas,
    })
  }

  /// Assembles a model from a validated structure and a full triangular
  /// grid of pair-copulas.
  pub fn from_parts(
    structure: RVineMatrix,
    pair_copulas: Vec<Vec<Bicop>>,
  ) -> Result<Self, VineError> {
    let d = structure.dim();
    if pair_copulas.len() != d - 1 {
      return Err(VineError::InvalidData(format!(
        "pair-copula grid has {} trees, structure needs {}",
        pair_copulas.len(),
        d - 1
      )));
    }
    for (t, row) in pair_copulas.iter().enumerate() {
      if row.len() != d - 1 - t {
        return Err(VineError::InvalidData(format!(
          "tree {} has {} pair-copulas, structure needs {}",
          t,
          row.len(),
          d - 1 - t
        )));
      }
    }
    Ok(Self {
      structure,
      pair_copulas,
    })
  }

  /// Selects structure and pair-copulas from data, Dissmann-style.
  pub fn select(data: &Array2<f64>, controls: &FitControls) -> Result<Self, VineError> {
    select::select_vinecop(data, controls)
  }

  pub fn dim(&self) -> usize {
    self.structure.dim()
  }

  pub fn structure(&self) -> &RVineMatrix {
    &self.structure
  }

  pub fn pair_copula(&self, tree: usize, edge: usize) -> &Bicop {
    &self.pair_copulas[tree][edge]
  }

  /// Total count of free parameters across all pair-copulas.
  pub fn npars(&self) -> usize {
    self
      .pair_copulas
      .iter()
      .flatten()
      .map(|bc| bc.npars())
      .sum()
  }

  fn check_data(&self, u: &Array2<f64>) -> Result<(), VineError> {
    if u.ncols() != self.dim() {
      return Err(VineError::InvalidData(format!(
        "expected {} columns, got {}",
        self.dim(),
        u.ncols()
      )));
    }
    tools::check_unit_interior(u)
  }

  /// Log-density per observation, chaining pseudo-observations up the
  /// tree sequence with a per-(variable, conditioning set) cache.
  fn log_density(&self, u: &Array2<f64>) -> Result<Array1<f64>, VineError> {
    let d = self.dim();
    let n = u.nrows();
    let mut cache: ObsCache = HashMap::new();
    for v in 1..=d {
      cache.insert((v, Vec::new()), u.column(v - 1).to_owned());
    }

    let mut logp = Array1::zeros(n);
    for t in 0..d - 1 {
      for e in 0..self.structure.n_edges(t) {
        let bc = &self.pair_copulas[t][e];
        let (a, b) = self.structure.conditioned(t, e);
        let mut dset = self.structure.conditioning(t, e);
        dset.sort_unstable();

        let ua = cache
          .get(&(a, dset.clone()))
          .ok_or_else(|| VineError::InvalidData("pseudo-observation chain broken".to_string()))?
          .clone();
        let ub = cache
          .get(&(b, dset.clone()))
          .ok_or_else(|| VineError::InvalidData("pseudo-observation chain broken".to_string()))?
          .clone();
        let pair = stack![Axis(1), ua, ub];

        logp = logp + bc.pdf(&pair)?.mapv(f64::ln);

        if t + 1 < d - 1 {
          let mut with_b = dset.clone();
          with_b.push(b);
          with_b.sort_unstable();
          cache.insert((a, with_b), bc.hfunc2(&pair)?);
          let mut with_a = dset;
          with_a.push(a);
          with_a.sort_unstable();
          cache.insert((b, with_a), bc.hfunc1(&pair)?);
        }
      }
    }
    Ok(logp)
  }

  /// Vine density at each row of an n x d matrix.
  pub fn pdf(&self, u: &Array2<f64>) -> Result<Array1<f64>, VineError> {
    self.check_data(u)?;
    Ok(self.log_density(u)?.mapv(f64::exp))
  }

  pub fn loglik(&self, u: &Array2<f64>) -> Result<f64, VineError> {
    self.check_data(u)?;
    Ok(self.log_density(u)?.sum())
  }

  pub fn aic(&self, u: &Array2<f64>) -> Result<f64, VineError> {
    Ok(-2.0 * self.loglik(u)? + 2.0 * self.npars() as f64)
  }

  pub fn bic(&self, u: &Array2<f64>) -> Result<f64, VineError> {
    let n = u.nrows() as f64;
    Ok(-2.0 * self.loglik(u)? + self.npars() as f64 * n.ln())
  }

  /// Draws n observations by the inverse Rosenblatt transform: column
  /// variables are materialized right to left through chains of inverse
  /// h-functions, strictly sequential across trees.
  pub fn simulate<R: Rng + ?Sized>(
    &self,
    n: usize,
    rng: &mut R,
  ) -> Result<Array2<f64>, VineError> {
    let d = self.dim();
    let eps = tools::UNIT_EPS;
    let w = Array2::random_using((n, d), Uniform::new(eps, 1.0 - eps), rng);
    let mut out = Array2::zeros((n, d));
    let mut memo: ObsCache = HashMap::new();

    // every non-diagonal entry of a column is the diagonal of some
    // column further right, so right-to-left order keeps the recursion
    // grounded in already materialized variables
    for e in (0..d).rev() {
      let v = self.structure.diag(e);
      let mut x = w.column(e).to_owned();
      for t in (0..d - 1 - e).rev() {
        let (_, b) = self.structure.conditioned(t, e);
        let mut dset = self.structure.conditioning(t, e);
        dset.sort_unstable();
        let ub = self.pseudo_obs(b, &dset, &out, &mut memo)?;
        x = self.pair_copulas[t][e].hinv2(&stack![Axis(1), x, ub])?;
      }
      out.column_mut(v - 1).assign(&x);
    }
    Ok(out)
  }

  /// Conditional margin F(a | s) on simulated data, built by walking the
  /// edge whose constraint set is {a} union s and recursing on its
  /// inputs. Memoized; s must be sorted.
  fn pseudo_obs(
    &self,
    a: usize,
    s: &[usize],
    sim: &Array2<f64>,
    memo: &mut ObsCache,
  ) -> Result<Array1<f64>, VineError> {
    if s.is_empty() {
      return Ok(sim.column(a - 1).to_owned());
    }
    let key = (a, s.to_vec());
    if let Some(v) = memo.get(&key) {
      return Ok(v.clone());
    }

    let t = s.len() - 1;
    let mut target = s.to_vec();
    target.push(a);
    target.sort_unstable();

    for e in 0..self.structure.n_edges(t) {
      let (x, y) = self.structure.conditioned(t, e);
      if x != a && y != a {
        continue;
      }
      let mut dset = self.structure.conditioning(t, e);
      dset.sort_unstable();
      let mut constraint = dset.clone();
      constraint.push(x);
      constraint.push(y);
      constraint.sort_unstable();
      if constraint != target {
        continue;
      }

      let ux = self.pseudo_obs(x, &dset, sim, memo)?;
      let uy = self.pseudo_obs(y, &dset, sim, memo)?;
      let pair = stack![Axis(1), ux, uy];
      let bc = &self.pair_copulas[t][e];
      let value = if a == y {
        bc.hfunc1(&pair)?
      } else {
        bc.hfunc2(&pair)?
      };
      memo.insert(key, value.clone());
      return Ok(value);
    }
    Err(VineError::InvalidData(
      "pseudo-observation chain broken".to_string(),
    ))
  }

  /// Distribution function by Monte Carlo: the fraction of simulated
  /// points dominated by each evaluation point. No closed form exists
  /// for general vines.
  pub fn cdf<R: Rng + ?Sized>(
    &self,
    u: &Array2<f64>,
    n_samples: usize,
    rng: &mut R,
  ) -> Result<Array1<f64>, VineError> {
    self.check_data(u)?;
    let sim = self.simulate(n_samples, rng)?;
    let mut out = Array1::zeros(u.nrows());
    for i in 0..u.nrows() {
      let mut dominated = 0usize;
      for s in 0..n_samples {
        let inside = (0..self.dim()).all(|j| sim[[s, j]] <= u[[i, j]]);
        if inside {
          dominated += 1;
        }
      }
      out[i] = dominated as f64 / n_samples as f64;
    }
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::*;
  use crate::bicop::BicopFamily;
  use crate::bicop::Rotation;
  use crate::dependence::kendall_tau;

  #[test]
  fn independence_vine_has_unit_density_and_zero_loglik() {
    let vine = Vinecop::independence(3).unwrap();
    let u = array![[0.2, 0.5, 0.9], [0.7, 0.1, 0.4], [0.33, 0.66, 0.5]];
    let dens = vine.pdf(&u).unwrap();
    for &p in dens.iter() {
      assert_abs_diff_eq!(p, 1.0, epsilon = 1e-12);
    }
    assert_abs_diff_eq!(vine.loglik(&u).unwrap(), 0.0, epsilon = 1e-12);
  }

  #[test]
  fn all_independence_grid_reports_zero_parameters() {
    let m = RVineMatrix::new(array![
      [1, 1, 1, 1],
      [2, 2, 2, 0],
      [3, 3, 0, 0],
      [4, 0, 0, 0]
    ])
    .unwrap();
    let grid = vec![
      vec![Bicop::independence(); 3],
      vec![Bicop::independence(); 2],
      vec![Bicop::independence(); 1],
    ];
    let vine = Vinecop::from_parts(m, grid).unwrap();
    assert_eq!(vine.npars(), 0);

    let mut rng = StdRng::seed_from_u64(2);
    let u = Array2::random_using((50, 4), Uniform::new(0.01, 0.99), &mut rng);
    let ll = vine.loglik(&u).unwrap();
    assert_abs_diff_eq!(vine.aic(&u).unwrap(), -2.0 * ll, epsilon = 1e-12);
    assert_abs_diff_eq!(vine.bic(&u).unwrap(), -2.0 * ll, epsilon = 1e-12);
    assert_abs_diff_eq!(ll, 0.0, epsilon = 1e-10);
  }

  fn gaussian_dvine3() -> Vinecop {
    // path 1-2-3 with correlation 0.6 on both tree-0 edges
    let m = RVineMatrix::new(array![[2, 3, 3], [3, 2, 0], [1, 0, 0]]).unwrap();
    let g = Bicop::new(BicopFamily::Gaussian, Rotation::R0, array![0.6]).unwrap();
    Vinecop::from_parts(
      m,
      vec![vec![g.clone(), g], vec![Bicop::independence()]],
    )
    .unwrap()
  }

  #[test]
  fn simulation_reproduces_pairwise_dependence() {
    let vine = gaussian_dvine3();
    let mut rng = StdRng::seed_from_u64(5);
    let u = vine.simulate(3000, &mut rng).unwrap();
    assert_eq!(u.dim(), (3000, 3));

    let tau01 = kendall_tau(&u.column(0).to_owned(), &u.column(1).to_owned()).unwrap();
    let tau12 = kendall_tau(&u.column(1).to_owned(), &u.column(2).to_owned()).unwrap();
    let expected = vine.pair_copula(0, 0).tau();
    assert_abs_diff_eq!(tau01, expected, epsilon = 0.05);
    assert_abs_diff_eq!(tau12, expected, epsilon = 0.05);
  }

  #[test]
  fn density_of_a_known_model_beats_independence_on_its_own_draws() {
    let vine = gaussian_dvine3();
    let mut rng = StdRng::seed_from_u64(8);
    let u = vine.simulate(500, &mut rng).unwrap();
    let indep = Vinecop::independence(3).unwrap();
    assert!(vine.loglik(&u).unwrap() > indep.loglik(&u).unwrap());
  }

  #[test]
  fn cdf_is_monotone_and_bracketed() {
    let vine = gaussian_dvine3();
    let mut rng = StdRng::seed_from_u64(13);
    let u = array![[0.3, 0.3, 0.3], [0.8, 0.8, 0.8]];
    let p = vine.cdf(&u, 5000, &mut rng).unwrap();
    assert!(p[0] > 0.0 && p[0] < p[1] && p[1] < 1.0);
  }

  #[test]
  fn rejects_wrong_width_and_boundary_data() {
    let vine = Vinecop::independence(3).unwrap();
    assert!(vine.pdf(&array![[0.1, 0.2]]).is_err());
    assert!(vine.pdf(&array![[0.1, 0.2, 1.0]]).is_err());
  }

  #[test]
  fn from_parts_checks_grid_shape() {
    let m = RVineMatrix::default_structure(3).unwrap();
    let bad = vec![vec![Bicop::independence(); 2]];
    assert!(Vinecop::from_parts(m, bad).is_err());
  }
}
