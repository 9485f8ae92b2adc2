//! # Data structures
//!
//! The containers the solver operates on: exact linear algebra, polyhedral constraint sets and
//! the boundary number type.
pub mod linear_algebra;
pub mod number_types;
pub mod polyhedron;
