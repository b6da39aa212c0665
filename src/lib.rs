//! # vinecop-rs
//!
//! $$
//! c(u_1,\dots,u_d)=\prod_{t=0}^{d-2}\prod_{e\in T_t}
//! c_{a_e,b_e\mid D_e}
//! $$
//!
//! Vine copula models over rank-transformed data in the unit hypercube:
//! parametric bivariate copula families with rotations, validated R-vine
//! structure matrices, density/likelihood/simulation, and automatic
//! structure selection via Dissmann's sequential maximum-spanning-tree
//! algorithm.
pub mod bicop;
pub mod dependence;
pub mod error;
pub mod tools;
pub mod vinecop;

pub use bicop::Bicop;
pub use bicop::BicopFamily;
pub use bicop::FitCriterion;
pub use bicop::Rotation;
pub use dependence::TreeCriterion;
pub use error::VineError;
pub use vinecop::select::FitControls;
pub use vinecop::structure::RVineMatrix;
pub use vinecop::Vinecop;
