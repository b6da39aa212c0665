//! # Structure selection
//!
//! $$
//! T_t = \arg\max_{\text{spanning tree}} \sum_{e \in T} |\delta_e|
//! $$
//!
//! Dissmann's sequential algorithm: tree by tree, weight every linkable
//! node pair by a rank dependence measure, keep a maximum spanning tree,
//! fit a pair-copula per kept edge and hand its h-function outputs to
//! the next tree. Greedy per tree, not globally optimal.
use std::cmp::Ordering;

use ndarray::stack;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use rayon::prelude::*;

use crate::bicop::fit;
use crate::bicop::Bicop;
use crate::bicop::BicopFamily;
use crate::bicop::FitCriterion;
use crate::dependence::pairwise;
use crate::dependence::TreeCriterion;
use crate::error::VineError;
use crate::tools;
use crate::vinecop::structure::RVineMatrix;
use crate::vinecop::Vinecop;

/// Controls for structure selection and per-edge pair-copula fitting.
#[derive(Debug, Clone)]
pub struct FitControls {
  pub family_set: Vec<BicopFamily>,
  pub selection_criterion: FitCriterion,
  pub tree_criterion: TreeCriterion,
  /// Tree index from which all pair-copulas are forced to independence;
  /// `None` fits the full tree sequence.
  pub trunc_lvl: Option<usize>,
  /// Edges whose |dependence| falls below this are forced to
  /// independence without fitting.
  pub threshold: f64,
  pub select_trunc_lvl: bool,
  pub select_threshold: bool,
  pub num_threads: usize,
}

impl Default for FitControls {
  fn default() -> Self {
    Self {
      family_set: BicopFamily::ALL.to_vec(),
      selection_criterion: FitCriterion::Bic,
      tree_criterion: TreeCriterion::Tau,
      trunc_lvl: None,
      threshold: 0.0,
      select_trunc_lvl: false,
      select_threshold: false,
      num_threads: 1,
    }
  }
}

/// A node of the current tree: an edge of the previous one. Tree 0
/// nodes are the bare variables with `cond = (v, v)`.
#[derive(Debug, Clone)]
struct Node {
  /// sorted union of conditioned pair and conditioning set
  constraint: Vec<usize>,
  cond: (usize, usize),
  dset: Vec<usize>,
  /// F(cond.0 | constraint minus cond.0)
  u_first: Array1<f64>,
  /// F(cond.1 | constraint minus cond.1)
  u_second: Array1<f64>,
  /// indices into the previous tree's node list
  parents: (usize, usize),
}

/// A linkable node pair with its pseudo-observations and MST weight.
#[derive(Debug, Clone)]
struct Candidate {
  i: usize,
  j: usize,
  x1: usize,
  x2: usize,
  dset: Vec<usize>,
  u1: Array1<f64>,
  u2: Array1<f64>,
  weight: f64,
}

#[derive(Debug, Clone)]
struct FittedEdge {
  cond: (usize, usize),
  dset: Vec<usize>,
  copula: Bicop,
  consumed: bool,
}

pub(crate) fn select_vinecop(
  data: &Array2<f64>,
  controls: &FitControls,
) -> Result<Vinecop, VineError> {
  let d = data.ncols();
  if d < 2 {
    return Err(VineError::InvalidData(format!(
      "structure selection needs at least 2 columns, got {}",
      d
    )));
  }
  tools::check_unit_interior(data)?;

  let trunc_candidates: Vec<Option<usize>> = if controls.select_trunc_lvl {
    (1..=d - 1).map(Some).collect()
  } else {
    vec![controls.trunc_lvl]
  };
  let threshold_candidates: Vec<f64> = if controls.select_threshold {
    threshold_grid(data, controls)?
  } else {
    vec![controls.threshold]
  };

  if trunc_candidates.len() == 1 && threshold_candidates.len() == 1 {
    return base_select(data, trunc_candidates[0], threshold_candidates[0], controls);
  }

  let mut best: Option<(f64, Vinecop)> = None;
  for &trunc in &trunc_candidates {
    for &thr in &threshold_candidates {
      let model = base_select(data, trunc, thr, controls)?;
      // the sweep needs a penalized score; raw likelihood is monotone
      // in model size, so LogLik falls back to BIC here
      let score = match controls.selection_criterion {
        FitCriterion::Aic => model.aic(data)?,
        FitCriterion::LogLik | FitCriterion::Bic => model.bic(data)?,
      };
      if best.as_ref().map_or(true, |(s, _)| score < *s) {
        best = Some((score, model));
      }
    }
  }
  best
    .map(|(_, m)| m)
    .ok_or_else(|| VineError::Selection("no candidate configuration".to_string()))
}

/// Decile grid of the tree-0 pairwise dependence magnitudes, zero
/// included.
fn threshold_grid(data: &Array2<f64>, controls: &FitControls) -> Result<Vec<f64>, VineError> {
  let d = data.ncols();
  let mut w = Vec::with_capacity(d * (d - 1) / 2);
  for i in 0..d {
    for j in i + 1..d {
      let m = pairwise(
        &data.column(i).to_owned(),
        &data.column(j).to_owned(),
        controls.tree_criterion,
      )?;
      w.push(m.abs());
    }
  }
  w.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

  let mut grid = vec![0.0];
  for k in 1..10 {
    grid.push(w[(k * w.len() / 10).min(w.len() - 1)]);
  }
  grid.dedup_by(|a, b| (*a - *b).abs() < f64::EPSILON);
  Ok(grid)
}

fn base_select(
  data: &Array2<f64>,
  trunc_lvl: Option<usize>,
  threshold: f64,
  controls: &FitControls,
) -> Result<Vinecop, VineError> {
  let d = data.ncols();

  let mut nodes: Vec<Node> = (1..=d)
    .map(|v| Node {
      constraint: vec![v],
      cond: (v, v),
      dset: Vec::new(),
      u_first: data.column(v - 1).to_owned(),
      u_second: data.column(v - 1).to_owned(),
      parents: (usize::MAX, usize::MAX),
    })
    .collect();

  let pool = if controls.num_threads > 1 {
    match rayon::ThreadPoolBuilder::new()
      .num_threads(controls.num_threads)
      .build()
    {
      Ok(p) => Some(p),
      Err(err) => {
        tracing::warn!(error = %err, "could not build worker pool, fitting sequentially");
        None
      }
    }
  } else {
    None
  };

  let mut trees: Vec<Vec<FittedEdge>> = Vec::with_capacity(d - 1);
  for t in 0..d - 1 {
    let candidates = linkable_pairs(&nodes, t, controls.tree_criterion)?;
    let chosen = maximum_spanning_tree(nodes.len(), &candidates)?;
    let selected: Vec<Candidate> = candidates
      .into_iter()
      .enumerate()
      .filter(|(k, _)| chosen.contains(k))
      .map(|(_, c)| c)
      .collect();

    let structural = trunc_lvl.map_or(false, |lvl| t >= lvl);
    let fit_edge = |c: &Candidate| -> Result<Bicop, VineError> {
      if structural || c.weight < threshold {
        return Ok(Bicop::independence());
      }
      let pair = stack![Axis(1), c.u1.clone(), c.u2.clone()];
      fit::select(&pair, &controls.family_set, controls.selection_criterion)
        .map_err(|e| VineError::Selection(format!("tree {}: {}", t, e)))
    };
    let copulas: Vec<Bicop> = match &pool {
      Some(p) => p.install(|| {
        selected
          .par_iter()
          .map(fit_edge)
          .collect::<Result<Vec<_>, _>>()
      })?,
      None => selected
        .iter()
        .map(fit_edge)
        .collect::<Result<Vec<_>, _>>()?,
    };
    tracing::debug!(
      tree = t,
      edges = selected.len(),
      structural,
      "tree selected"
    );

    let mut edges = Vec::with_capacity(selected.len());
    let mut next_nodes = Vec::with_capacity(selected.len());
    for (c, bc) in selected.into_iter().zip(copulas) {
      let pair = stack![Axis(1), c.u1, c.u2];
      let u_first = bc.hfunc2(&pair)?;
      let u_second = bc.hfunc1(&pair)?;
      let mut constraint = c.dset.clone();
      constraint.push(c.x1);
      constraint.push(c.x2);
      constraint.sort_unstable();
      edges.push(FittedEdge {
        cond: (c.x1, c.x2),
        dset: c.dset.clone(),
        copula: bc,
        consumed: false,
      });
      next_nodes.push(Node {
        constraint,
        cond: (c.x1, c.x2),
        dset: c.dset,
        u_first,
        u_second,
        parents: (c.i, c.j),
      });
    }
    trees.push(edges);
    nodes = next_nodes;
  }

  build_model(d, trees)
}

/// All node pairs whose prospective edge keeps the proximity condition:
/// any pair at tree 0, pairs sharing a parent afterwards.
fn linkable_pairs(
  nodes: &[Node],
  tree: usize,
  criterion: TreeCriterion,
) -> Result<Vec<Candidate>, VineError> {
  let mut out = Vec::new();
  for i in 0..nodes.len() {
    for j in i + 1..nodes.len() {
      let (ni, nj) = (&nodes[i], &nodes[j]);
      if tree > 0 {
        let share = ni.parents.0 == nj.parents.0
          || ni.parents.0 == nj.parents.1
          || ni.parents.1 == nj.parents.0
          || ni.parents.1 == nj.parents.1;
        if !share {
          continue;
        }
      }
      let only_i: Vec<usize> = set_minus(&ni.constraint, &nj.constraint);
      let only_j: Vec<usize> = set_minus(&nj.constraint, &ni.constraint);
      if only_i.len() != 1 || only_j.len() != 1 {
        continue;
      }
      let (x1, x2) = (only_i[0], only_j[0]);
      let dset: Vec<usize> = ni
        .constraint
        .iter()
        .copied()
        .filter(|v| nj.constraint.contains(v))
        .collect();

      let u1 = margin_of(ni, x1)?;
      let u2 = margin_of(nj, x2)?;
      let w = pairwise(&u1, &u2, criterion)?.abs();
      out.push(Candidate {
        i,
        j,
        x1,
        x2,
        dset,
        u1,
        u2,
        weight: if w.is_finite() { w } else { 0.0 },
      });
    }
  }
  Ok(out)
}

fn set_minus(a: &[usize], b: &[usize]) -> Vec<usize> {
  a.iter().copied().filter(|x| !b.contains(x)).collect()
}

/// The node's conditional margin for one of its conditioned variables.
fn margin_of(node: &Node, var: usize) -> Result<Array1<f64>, VineError> {
  if var == node.cond.0 {
    Ok(node.u_first.clone())
  } else if var == node.cond.1 {
    Ok(node.u_second.clone())
  } else {
    Err(VineError::Selection(format!(
      "variable {} not in the conditioned pair",
      var
    )))
  }
}

/// Prim's algorithm for the maximum-weight spanning tree; returns
/// indices into the candidate list. Equal weights keep the earlier
/// candidate.
fn maximum_spanning_tree(
  n_nodes: usize,
  candidates: &[Candidate],
) -> Result<Vec<usize>, VineError> {
  if n_nodes == 1 {
    return Ok(Vec::new());
  }
  let mut in_tree = vec![false; n_nodes];
  in_tree[0] = true;
  let mut chosen = Vec::with_capacity(n_nodes - 1);
  for _ in 0..n_nodes - 1 {
    let mut best: Option<(f64, usize)> = None;
    for (k, c) in candidates.iter().enumerate() {
      if in_tree[c.i] == in_tree[c.j] {
        continue;
      }
      if best.map_or(true, |(w, _)| c.weight > w) {
        best = Some((c.weight, k));
      }
    }
    match best {
      Some((_, k)) => {
        chosen.push(k);
        in_tree[candidates[k].i] = true;
        in_tree[candidates[k].j] = true;
      }
      None => {
        return Err(VineError::Selection(
          "candidate graph is disconnected".to_string(),
        ))
      }
    }
  }
  Ok(chosen)
}

/// Peels the fitted tree sequence into a structure matrix, leftmost
/// column first. Each column takes the unique unconsumed edge of its
/// top tree, fixes that edge's fresh conditioned variable as the
/// diagonal and chains down through the parent edges containing it. A
/// copula stored against the matrix in reversed argument order is
/// flipped.
fn build_model(d: usize, mut trees: Vec<Vec<FittedEdge>>) -> Result<Vinecop, VineError> {
  let bookkeeping = || VineError::Selection("edge bookkeeping failed".to_string());

  let mut mat: Array2<usize> = Array2::zeros((d, d));
  let mut grid: Vec<Vec<Bicop>> = (0..d - 1)
    .map(|t| vec![Bicop::independence(); d - 1 - t])
    .collect();
  let mut used = vec![false; d + 1];

  for col in 0..d - 1 {
    let t_top = d - 2 - col;
    let top_idx = trees[t_top]
      .iter()
      .position(|e| !e.consumed)
      .ok_or_else(bookkeeping)?;
    let (a, b) = trees[t_top][top_idx].cond;
    let v = if !used[a] { a } else { b };
    used[v] = true;

    let mut want: Vec<usize> = Vec::new();
    for t in (0..=t_top).rev() {
      let idx = if t == t_top {
        top_idx
      } else {
        trees[t]
          .iter()
          .position(|e| {
            if e.consumed || (e.cond.0 != v && e.cond.1 != v) {
              return false;
            }
            let mut cs = e.dset.clone();
            cs.push(e.cond.0);
            cs.push(e.cond.1);
            cs.sort_unstable();
            cs == want
          })
          .ok_or_else(bookkeeping)?
      };
      let edge = &mut trees[t][idx];
      edge.consumed = true;

      let partner = if edge.cond.0 == v {
        edge.cond.1
      } else {
        edge.cond.0
      };
      mat[[t, col]] = partner;
      let mut bc = edge.copula.clone();
      if edge.cond.1 == v {
        bc.flip();
      }
      grid[t][col] = bc;

      want = edge.dset.clone();
      want.push(v);
      want.sort_unstable();
    }
    mat[[d - 1 - col, col]] = v;
  }
  let last = (1..=d).find(|&x| !used[x]).ok_or_else(bookkeeping)?;
  mat[[0, d - 1]] = last;

  let structure = RVineMatrix::new(mat)?;
  Vinecop::from_parts(structure, grid)
}
