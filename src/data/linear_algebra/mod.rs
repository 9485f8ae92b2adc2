//! # Linear algebra
//!
//! Dense matrices and sequence operations over arbitrary-precision integers. These were written by
//! hand, because the solver needs a small, specific set of exact operations and no intermediate
//! rounding anywhere.
pub mod matrix;
pub mod vector;

pub use matrix::Matrix;
