//! # Bicop fit
//!
//! $$
//! \hat\theta = \arg\max_\theta \sum_{i=1}^n \ln c_\theta(u_{i1}, u_{i2})
//! $$
//!
//! Maximum likelihood by Nelder-Mead, seeded from the Kendall-tau moment
//! estimate. Optimizer failure is not fatal: the moment start is kept and
//! a warning is emitted.
use argmin::core::CostFunction;
use argmin::core::Error;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use ndarray::Array1;
use ndarray::Array2;

use crate::bicop::Bicop;
use crate::bicop::BicopFamily;
use crate::bicop::FitCriterion;
use crate::bicop::Rotation;
use crate::dependence::kendall_tau;
use crate::error::VineError;
use crate::tools;

const MAX_ITERS: u64 = 200;
const OUT_OF_BOUNDS_COST: f64 = 1e10;

struct NegLogLik<'a> {
  family: BicopFamily,
  rotation: Rotation,
  data: &'a Array2<f64>,
}

impl CostFunction for NegLogLik<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
    match Bicop::new(self.family, self.rotation, Array1::from(p.clone())) {
      Ok(bc) => Ok(bc
        .loglik(self.data)
        .map(|ll| -ll)
        .unwrap_or(OUT_OF_BOUNDS_COST)),
      Err(_) => Ok(OUT_OF_BOUNDS_COST),
    }
  }
}

/// Initial simplex: the moment start plus one per-coordinate
/// perturbation, each vertex kept strictly inside the parameter box.
fn initial_simplex(family: BicopFamily, start: &[f64]) -> Vec<Vec<f64>> {
  let bounds = family.bounds();
  let mut simplex = vec![start.to_vec()];
  for i in 0..start.len() {
    let (lo, hi) = bounds[i];
    // degrees of freedom move on a coarser scale than correlations
    let step = if family == BicopFamily::Student && i == 1 {
      1.0
    } else {
      0.1
    };
    let mut vertex = start.to_vec();
    vertex[i] = if start[i] + step < hi - 1e-6 {
      start[i] + step
    } else {
      (start[i] - step).max(lo + 1e-6)
    };
    simplex.push(vertex);
  }
  simplex
}

/// Fits one family/rotation pair by MLE.
pub fn fit(
  family: BicopFamily,
  rotation: Rotation,
  data: &Array2<f64>,
) -> Result<Bicop, VineError> {
  tools::check_pair_data(data)?;
  if family == BicopFamily::Independence {
    return Ok(Bicop::independence());
  }

  let tau = kendall_tau(&data.column(0).to_owned(), &data.column(1).to_owned())?;
  let canonical_tau = if matches!(rotation, Rotation::R90 | Rotation::R270) {
    -tau
  } else {
    tau
  };
  let start = Bicop::tau_to_parameters(family, canonical_tau).to_vec();
  let fallback = Bicop::new(family, rotation, Array1::from(start.clone()))?;

  let cost = NegLogLik {
    family,
    rotation,
    data,
  };
  let fitted = match NelderMead::new(initial_simplex(family, &start)).with_sd_tolerance(1e-8) {
    Ok(solver) => match Executor::new(cost, solver)
      .configure(|state| state.max_iters(MAX_ITERS))
      .run()
    {
      Ok(res) => {
        let best = res.state.best_param.clone().unwrap_or_else(|| start.clone());
        match Bicop::new(family, rotation, Array1::from(best)) {
          Ok(bc) => bc,
          Err(_) => {
            tracing::warn!(
              family = family.name(),
              rotation = rotation.degrees(),
              "optimizer left the parameter box, keeping moment start"
            );
            fallback
          }
        }
      }
      Err(err) => {
        tracing::warn!(
          family = family.name(),
          rotation = rotation.degrees(),
          error = %err,
          "likelihood optimization failed, keeping moment start"
        );
        fallback
      }
    },
    Err(err) => {
      tracing::warn!(
        family = family.name(),
        rotation = rotation.degrees(),
        error = %err,
        "could not set up the simplex, keeping moment start"
      );
      fallback
    }
  };
  Ok(fitted)
}

/// Fits every admissible family/rotation candidate and keeps the best
/// score. Rotations are screened by the sign of the empirical tau; ties
/// keep the earlier candidate.
pub fn select(
  data: &Array2<f64>,
  families: &[BicopFamily],
  criterion: FitCriterion,
) -> Result<Bicop, VineError> {
  tools::check_pair_data(data)?;
  let tau = kendall_tau(&data.column(0).to_owned(), &data.column(1).to_owned())?;
  let n = data.nrows() as f64;

  let mut best: Option<(f64, Bicop)> = None;
  for &family in families {
    let rotations: &[Rotation] = if !family.rotatable() {
      &[Rotation::R0]
    } else if tau >= 0.0 {
      &[Rotation::R0, Rotation::R180]
    } else {
      &[Rotation::R90, Rotation::R270]
    };
    for &rotation in rotations {
      let bc = fit(family, rotation, data)?;
      let ll = bc.loglik(data)?;
      let k = bc.npars() as f64;
      let score = match criterion {
        FitCriterion::LogLik => -ll,
        FitCriterion::Aic => -2.0 * ll + 2.0 * k,
        FitCriterion::Bic => -2.0 * ll + k * n.ln(),
      };
      if best.as_ref().map_or(true, |(s, _)| score < *s) {
        best = Some((score, bc));
      }
    }
  }
  best
    .map(|(_, bc)| bc)
    .ok_or_else(|| VineError::Selection("empty family set".to_string()))
}
