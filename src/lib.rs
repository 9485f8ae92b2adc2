//! # A parametric integer linear programming solver.
//!
//! Given a system of affine (in)equalities over parameters and variables, this crate computes the
//! lexicographic minimum (or maximum) of the variables as a piecewise-affine function of the
//! parameters, together with the region of parameter space where no integer solution exists. The
//! method follows the paper "Parametric Integer Programming" by Paul Feautrier: a lexicographic
//! dual-simplex search coupled to a context over the parameters, with Gomory-style cuts and
//! integer divisions enforcing integrality.
//!
//! All arithmetic on the solve path is exact, over arbitrary-precision integers.
pub mod algorithm;
pub mod data;

pub use algorithm::lexmin::{foreach_lexmax, foreach_lexmin, foreach_lexopt, partial_lexopt};
pub use algorithm::LexminError;
