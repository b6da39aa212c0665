//! # RVine structure
//!
//! $$
//! M \in \{0,\dots,d\}^{d \times d}
//! $$
//!
//! Structure matrix encoding of a regular vine. Column `e` lists, top
//! down, the partners of the column's diagonal variable across trees;
//! the diagonal sits at row `d - 1 - e`, the strict lower-right triangle
//! is zero. Tree `t` of column `e` pairs `diag(e)` with `m[(t, e)]`
//! conditioned on the entries above row `t`.
use ndarray::Array2;

use crate::error::VineError;

/// A validated R-vine structure matrix. Immutable after construction;
/// all six structural conditions are checked up front, in order, and the
/// first violation is reported with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct RVineMatrix {
  d: usize,
  mat: Array2<usize>,
}

impl RVineMatrix {
  pub fn new(mat: Array2<usize>) -> Result<Self, VineError> {
    let d = mat.nrows();
    if d < 2 || mat.ncols() != d {
      return Err(VineError::InvalidData(format!(
        "structure matrix must be square with d >= 2, got {}x{}",
        mat.nrows(),
        mat.ncols()
      )));
    }
    let m = Self { d, mat };
    m.check_triangle()?;
    m.check_range()?;
    m.check_antidiagonal()?;
    m.check_diagonal_unique()?;
    m.check_column_nesting()?;
    m.check_proximity()?;
    Ok(m)
  }

  /// The default structure for a given dimension: a C-vine on the
  /// natural variable order, all entries implied by `m[(i, j)] = i + 1`.
  pub fn default_structure(d: usize) -> Result<Self, VineError> {
    if d < 2 {
      return Err(VineError::InvalidData(format!(
        "vine dimension must be at least 2, got {}",
        d
      )));
    }
    let mut mat = Array2::zeros((d, d));
    for j in 0..d {
      for i in 0..d - 1 - j {
        mat[[i, j]] = i + 1;
      }
      mat[[d - 1 - j, j]] = d - j;
    }
    Ok(Self { d, mat })
  }

  pub fn dim(&self) -> usize {
    self.d
  }

  pub fn matrix(&self) -> &Array2<usize> {
    &self.mat
  }

  /// Variable on the antidiagonal of column `e` (1-based variable index).
  pub fn diag(&self, e: usize) -> usize {
    self.mat[[self.d - 1 - e, e]]
  }

  /// Number of edges a column contributes, before truncation.
  pub fn n_edges(&self, tree: usize) -> usize {
    self.d - 1 - tree
  }

  /// Conditioned pair of the edge at (tree, edge column).
  pub fn conditioned(&self, tree: usize, e: usize) -> (usize, usize) {
    (self.diag(e), self.mat[[tree, e]])
  }

  /// Conditioning set of the edge at (tree, edge column).
  pub fn conditioning(&self, tree: usize, e: usize) -> Vec<usize> {
    (0..tree).map(|r| self.mat[[r, e]]).collect()
  }

  // (1) strict lower-right triangle all zero
  fn check_triangle(&self) -> Result<(), VineError> {
    for j in 0..self.d {
      for i in self.d - j..self.d {
        if self.mat[[i, j]] != 0 {
          return Err(VineError::Structure {
            condition: 1,
            tree: i,
            column: j,
          });
        }
      }
    }
    Ok(())
  }

  // (2) upper-left triangle entries in [1, d]
  fn check_range(&self) -> Result<(), VineError> {
    for j in 0..self.d {
      for i in 0..self.d - j {
        let v = self.mat[[i, j]];
        if v < 1 || v > self.d {
          return Err(VineError::Structure {
            condition: 2,
            tree: i,
            column: j,
          });
        }
      }
    }
    Ok(())
  }

  // (3) antidiagonal a permutation of 1..d
  fn check_antidiagonal(&self) -> Result<(), VineError> {
    let mut seen = vec![false; self.d + 1];
    for e in 0..self.d {
      let v = self.diag(e);
      if seen[v] {
        return Err(VineError::Structure {
          condition: 3,
          tree: self.d - 1 - e,
          column: e,
        });
      }
      seen[v] = true;
    }
    Ok(())
  }

  // (4) a diagonal entry never reappears in a column to its right
  fn check_diagonal_unique(&self) -> Result<(), VineError> {
    for e in 0..self.d {
      let v = self.diag(e);
      for j in e + 1..self.d {
        for i in 0..self.d - j {
          if self.mat[[i, j]] == v {
            return Err(VineError::Structure {
              condition: 4,
              tree: i,
              column: j,
            });
          }
        }
      }
    }
    Ok(())
  }

  // (5) every entry of a column appears in all columns to its left
  fn check_column_nesting(&self) -> Result<(), VineError> {
    for j in 1..self.d {
      for i in 0..self.d - j {
        let v = self.mat[[i, j]];
        for left in 0..j {
          let found = (0..self.d - left).any(|r| self.mat[[r, left]] == v);
          if !found {
            return Err(VineError::Structure {
              condition: 5,
              tree: i,
              column: j,
            });
          }
        }
      }
    }
    Ok(())
  }

  // (6) proximity: the (partner, conditioning) tuple of each edge above
  // tree 0 must be derivable from a tree t-1 edge in a column to the
  // right, with the partner in that edge's conditioned pair.
  fn check_proximity(&self) -> Result<(), VineError> {
    for e in 0..self.d.saturating_sub(2) {
      for t in 1..self.d - 1 - e {
        let b = self.mat[[t, e]];
        let mut dset: Vec<usize> = self.conditioning(t, e);
        dset.sort_unstable();
        let ok = (e + 1..self.d - t).any(|j| {
          let x1 = self.diag(j);
          let x2 = self.mat[[t - 1, j]];
          let shared: Vec<usize> = self.conditioning(t - 1, j);
          let matches = |cond: usize, other: usize| {
            if b != cond {
              return false;
            }
            let mut s = shared.clone();
            s.push(other);
            s.sort_unstable();
            s == dset
          };
          matches(x1, x2) || matches(x2, x1)
        });
        if !ok {
          return Err(VineError::Structure {
            condition: 6,
            tree: t,
            column: e,
          });
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::*;

  fn dvine4() -> Array2<usize> {
    // D-vine on the path 1-2-3-4
    array![[2, 3, 4, 4], [3, 4, 3, 0], [4, 2, 0, 0], [1, 0, 0, 0]]
  }

  #[test]
  fn accepts_the_default_structure() {
    let m = RVineMatrix::default_structure(4).unwrap();
    assert_eq!(
      m.matrix(),
      &array![[1, 1, 1, 1], [2, 2, 2, 0], [3, 3, 0, 0], [4, 0, 0, 0]]
    );
    assert!(RVineMatrix::new(m.matrix().clone()).is_ok());
  }

  #[test]
  fn traversal_of_the_default_structure() {
    let m = RVineMatrix::default_structure(4).unwrap();
    assert_eq!(m.diag(0), 4);
    assert_eq!(m.conditioned(0, 0), (4, 1));
    assert_eq!(m.conditioned(2, 0), (4, 3));
    assert_eq!(m.conditioning(2, 0), vec![1, 2]);
    assert_eq!(m.conditioning(0, 2), Vec::<usize>::new());
    assert_eq!(m.n_edges(0), 3);
    assert_eq!(m.n_edges(2), 1);
  }

  #[test]
  fn accepts_a_d_vine() {
    assert!(RVineMatrix::new(dvine4()).is_ok());
  }

  #[test]
  fn rejects_nonzero_lower_triangle() {
    let mut m = dvine4();
    m[[2, 2]] = 1;
    assert_eq!(
      RVineMatrix::new(m),
      Err(VineError::Structure {
        condition: 1,
        tree: 2,
        column: 2,
      })
    );
  }

  #[test]
  fn rejects_out_of_range_entries() {
    let mut m = dvine4();
    m[[0, 1]] = 7;
    assert_eq!(
      RVineMatrix::new(m),
      Err(VineError::Structure {
        condition: 2,
        tree: 0,
        column: 1,
      })
    );
  }

  #[test]
  fn rejects_repeated_antidiagonal() {
    let mut m = dvine4();
    m[[0, 3]] = 2; // diagonal now 1,2,4,2
    assert_eq!(
      RVineMatrix::new(m),
      Err(VineError::Structure {
        condition: 3,
        tree: 0,
        column: 3,
      })
    );
  }

  #[test]
  fn rejects_diagonal_reappearing_to_the_right() {
    // column 0's diagonal is 1, planted again in column 1
    let mut m = dvine4();
    m[[0, 1]] = 1;
    assert_eq!(
      RVineMatrix::new(m),
      Err(VineError::Structure {
        condition: 4,
        tree: 0,
        column: 1,
      })
    );
  }

  #[test]
  fn rejects_entry_missing_from_a_left_column() {
    // duplicating 3 in column 1 drops 4 from it, so column 2's 4 has no
    // counterpart to its left
    let mut m = dvine4();
    m[[1, 1]] = 3;
    assert_eq!(
      RVineMatrix::new(m),
      Err(VineError::Structure {
        condition: 5,
        tree: 0,
        column: 2,
      })
    );
  }

  #[test]
  fn rejects_a_proximity_violation() {
    // swapping rows 1 and 2 of column 0 asks for edge 1-4|2, but tree 0
    // has no edge 2-4 to support it
    let mut m = dvine4();
    m[[1, 0]] = 4;
    m[[2, 0]] = 3;
    assert_eq!(
      RVineMatrix::new(m),
      Err(VineError::Structure {
        condition: 6,
        tree: 1,
        column: 0,
      })
    );
  }

  #[test]
  fn rejects_non_square_or_tiny_input() {
    assert!(RVineMatrix::new(Array2::zeros((1, 1))).is_err());
    assert!(RVineMatrix::new(Array2::zeros((3, 2))).is_err());
  }
}
