//! # Basic set
//!
//! A conjunction of affine constraints over a flat list of set dimensions plus integer divisions.
//! The solver does not distinguish parameters from set dimensions; callers flatten them.
use num::{BigInt, Signed, Zero};

use crate::data::linear_algebra::vector;
use crate::data::polyhedron::{self, Div};

/// A basic set over `nr_dim` dimensions and a growable list of divisions.
///
/// Constraint rows have width `1 + total_dim()`; see the module documentation of
/// [`crate::data::polyhedron`] for the layout.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasicSet {
    nr_dim: usize,
    pub divs: Vec<Div>,
    pub eqs: Vec<Vec<BigInt>>,
    pub ineqs: Vec<Vec<BigInt>>,
}

impl BasicSet {
    /// The set without any constraints.
    pub fn universe(nr_dim: usize) -> Self {
        Self { nr_dim, divs: Vec::new(), eqs: Vec::new(), ineqs: Vec::new() }
    }

    /// Number of set dimensions, divisions not included.
    pub fn nr_dim(&self) -> usize {
        self.nr_dim
    }

    /// Number of dimensions including the divisions.
    pub fn total_dim(&self) -> usize {
        self.nr_dim + self.divs.len()
    }

    /// Append an equality constraint.
    pub fn add_equality(&mut self, row: &[BigInt]) {
        debug_assert_eq!(row.len(), 1 + self.total_dim());

        self.eqs.push(row.to_vec());
    }

    /// Append an inequality constraint.
    pub fn add_inequality(&mut self, row: &[BigInt]) {
        debug_assert_eq!(row.len(), 1 + self.total_dim());

        self.ineqs.push(row.to_vec());
    }

    /// Remove the most recently added equality.
    pub fn pop_equality(&mut self) {
        let removed = self.eqs.pop();
        debug_assert!(removed.is_some());
    }

    /// Remove the most recently added inequality.
    pub fn pop_inequality(&mut self) {
        let removed = self.ineqs.pop();
        debug_assert!(removed.is_some());
    }

    /// Append a division and widen all existing rows with a zero coefficient for it.
    ///
    /// # Arguments
    ///
    /// * `div`: Its line has width `1 + total_dim()` (before this call), i.e. it may reference all
    /// earlier divisions but not itself.
    ///
    /// # Return value
    ///
    /// The index of the new division.
    pub fn add_div(&mut self, div: Div) -> usize {
        debug_assert_eq!(div.line.len(), 1 + self.total_dim());

        for row in self.eqs.iter_mut().chain(self.ineqs.iter_mut()) {
            row.push(BigInt::zero());
        }
        for existing in &mut self.divs {
            existing.line.push(BigInt::zero());
        }
        let mut div = div;
        div.line.push(BigInt::zero());
        self.divs.push(div);

        self.divs.len() - 1
    }

    /// Remove the most recently added division and narrow all rows again.
    ///
    /// No remaining constraint or division may still reference it.
    pub fn pop_div(&mut self) {
        debug_assert!(!self.divs.is_empty());

        self.divs.pop();
        for row in self.eqs.iter_mut().chain(self.ineqs.iter_mut()) {
            debug_assert_eq!(row.last(), Some(&BigInt::zero()), "dropped div still referenced");
            row.pop();
        }
        for existing in &mut self.divs {
            debug_assert_eq!(existing.line.last(), Some(&BigInt::zero()), "dropped div still referenced");
            existing.line.pop();
        }
    }

    /// Look for a division with the given definition.
    pub fn find_div(&self, denominator: &BigInt, line: &[BigInt]) -> Option<usize> {
        debug_assert_eq!(line.len(), 1 + self.total_dim());

        self.divs.iter().position(|div| {
            &div.denominator == denominator && div.line[..] == line[..div.line.len()]
        })
    }

    /// Exchange two divisions, updating every reference to their columns.
    pub fn swap_divs(&mut self, a: usize, b: usize) {
        debug_assert!(a < self.divs.len() && b < self.divs.len());

        if a == b {
            return;
        }
        let col_a = 1 + self.nr_dim + a;
        let col_b = 1 + self.nr_dim + b;
        for row in self.eqs.iter_mut().chain(self.ineqs.iter_mut()) {
            row.swap(col_a, col_b);
        }
        for div in &mut self.divs {
            div.line.swap(col_a, col_b);
        }
        self.divs.swap(a, b);
    }

    /// Reorder the divisions so that every division only references earlier ones.
    ///
    /// Divisions are added one by one when a context is rebuilt, so this order is required before
    /// a set is used as a solve domain.
    pub fn order_divs(&mut self) {
        let n = self.divs.len();
        let mut placed = 0;
        while placed < n {
            let next = (placed..n).find(|&i| {
                (placed..n).all(|j| j == i || self.divs[i].line[1 + self.nr_dim + j].is_zero())
            });
            match next {
                Some(i) => {
                    self.swap_divs(placed, i);
                    placed += 1;
                }
                // Mutually referencing definitions; leave the tail as it is.
                None => break,
            }
        }
    }

    /// Whether a constraint row contradicts itself without looking at any other.
    pub fn is_trivially_empty(&self) -> bool {
        let contradiction = |row: &Vec<BigInt>, eq: bool| {
            vector::first_non_zero(&row[1..]).is_none()
                && if eq { !row[0].is_zero() } else { row[0].is_negative() }
        };
        self.eqs.iter().any(|row| contradiction(row, true))
            || self.ineqs.iter().any(|row| contradiction(row, false))
    }

    /// Gaussian reduction of the equalities, applied to the inequalities as well.
    pub fn gauss(&mut self) {
        let nr_columns = 1 + self.total_dim();
        polyhedron::gauss(&mut self.eqs, &mut self.ineqs, nr_columns);
    }

    /// Scale all constraints down by the gcd of their coefficients.
    pub fn normalize_constraints(&mut self) {
        for row in &mut self.eqs {
            polyhedron::normalize_equality(row);
        }
        for row in &mut self.ineqs {
            polyhedron::normalize_inequality(row);
        }
        polyhedron::drop_zero_rows(&mut self.eqs);
    }

    /// Reduce to a stable form for emission: Gaussian reduction plus normalization.
    pub fn simplify(&mut self) {
        self.gauss();
        self.normalize_constraints();
    }
}
