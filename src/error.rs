//! # Errors
//!
//! $$
//! \text{fail fast on construction, recover locally on numerics}
//! $$
//!
use std::error::Error;
use std::fmt;

/// Errors surfaced by structure validation, copula construction and
/// structure selection.
///
/// Numeric boundary issues (h-function or inverse outputs pushed outside
/// the unit interval by floating point) are deliberately absent: they are
/// clamped where they occur and logged, never propagated.
#[derive(Debug, Clone, PartialEq)]
pub enum VineError {
  /// An R-vine matrix violated one of the six structural conditions.
  /// `condition` is the 1-based index of the first violated condition,
  /// `tree`/`column` locate the offending entry.
  Structure {
    condition: usize,
    tree: usize,
    column: usize,
  },
  /// A copula parameter fell outside its family bounds at construction.
  ParameterBounds {
    family: &'static str,
    index: usize,
    value: f64,
    lower: f64,
    upper: f64,
  },
  /// A rotation not admissible for the given family.
  InvalidRotation {
    family: &'static str,
    rotation: u16,
  },
  /// Input data outside the open unit hypercube, wrong shape or missing.
  InvalidData(String),
  /// An edge fit failed during structure selection; no partial model is
  /// returned.
  Selection(String),
}

impl fmt::Display for VineError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VineError::Structure {
        condition,
        tree,
        column,
      } => write!(
        f,
        "R-vine matrix violates condition {} at tree {}, column {}",
        condition, tree, column
      ),
      VineError::ParameterBounds {
        family,
        index,
        value,
        lower,
        upper,
      } => write!(
        f,
        "{} parameter {} = {} outside bounds ({}, {})",
        family, index, value, lower, upper
      ),
      VineError::InvalidRotation { family, rotation } => {
        write!(f, "rotation {} not admissible for {}", rotation, family)
      }
      VineError::InvalidData(msg) => write!(f, "invalid data: {}", msg),
      VineError::Selection(msg) => write!(f, "structure selection failed: {}", msg),
    }
  }
}

impl Error for VineError {}
