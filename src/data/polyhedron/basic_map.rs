//! # Basic map
//!
//! A conjunction of affine constraints relating input dimensions to output dimensions, with
//! parameters and integer divisions. This is the input and output currency of the solver.
use num::{BigInt, Signed, Zero};

use crate::data::linear_algebra::vector;
use crate::data::polyhedron::{self, Div, Space};

/// A basic relation over a [`Space`], with a growable list of divisions.
///
/// Constraint rows have width `1 + total_dim()` and layout
/// `[constant, parameters…, inputs…, outputs…, divisions…]`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasicMap {
    pub space: Space,
    pub divs: Vec<Div>,
    pub eqs: Vec<Vec<BigInt>>,
    pub ineqs: Vec<Vec<BigInt>>,
    /// When set, the relation is interpreted over the rationals rather than the integers.
    pub rational: bool,
}

impl BasicMap {
    /// The relation without any constraints.
    pub fn universe(space: Space) -> Self {
        Self { space, divs: Vec::new(), eqs: Vec::new(), ineqs: Vec::new(), rational: false }
    }

    /// Number of dimensions including the divisions.
    pub fn total_dim(&self) -> usize {
        self.space.total() + self.divs.len()
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

    /// Append a division and widen all existing rows with a zero coefficient for it.
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

    /// Exchange two divisions, updating every reference to their columns.
    pub fn swap_divs(&mut self, a: usize, b: usize) {
        debug_assert!(a < self.divs.len() && b < self.divs.len());

        if a == b {
            return;
        }
        let col_a = 1 + self.space.total() + a;
        let col_b = 1 + self.space.total() + b;
        for row in self.eqs.iter_mut().chain(self.ineqs.iter_mut()) {
            row.swap(col_a, col_b);
        }
        for div in &mut self.divs {
            div.line.swap(col_a, col_b);
        }
        self.divs.swap(a, b);
    }

    /// Turn pairs of opposite inequalities into explicit equalities.
    ///
    /// The solver eliminates equalities eagerly, so implicit ones should be made explicit before
    /// a solve starts.
    ///
    /// TODO(ENHANCEMENT): Equalities that are implied by more than two inequalities together are
    ///  not detected; doing so requires solving a sequence of small feasibility problems.
    pub fn detect_equalities(&mut self) {
        let mut i = 0;
        while i < self.ineqs.len() {
            let opposite = (i + 1..self.ineqs.len()).find(|&j| {
                self.ineqs[i]
                    .iter()
                    .zip(&self.ineqs[j])
                    .all(|(a, b)| a == &-b)
            });
            if let Some(j) = opposite {
                self.ineqs.swap_remove(j);
                let eq = self.ineqs.swap_remove(i);
                self.eqs.push(eq);
            } else {
                i += 1;
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
    ///
    /// Inequality constants are only floor-tightened for integer relations.
    pub fn normalize_constraints(&mut self) {
        for row in &mut self.eqs {
            polyhedron::normalize_equality(row);
        }
        if !self.rational {
            for row in &mut self.ineqs {
                polyhedron::normalize_inequality(row);
            }
        }
        polyhedron::drop_zero_rows(&mut self.eqs);
    }

    /// Reduce to a stable form for emission: Gaussian reduction plus normalization.
    pub fn finalize(&mut self) {
        self.gauss();
        self.normalize_constraints();
    }
}

#[cfg(test)]
mod test {
    use num::BigInt;

    use crate::data::polyhedron::basic_map::BasicMap;
    use crate::data::polyhedron::Space;

    fn seq(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|&v| BigInt::from(v)).collect()
    }

    fn space() -> Space {
        Space { nr_param: 1, nr_in: 0, nr_out: 1 }
    }

    #[test]
    fn detect_equalities_from_opposite_pairs() {
        let mut bmap = BasicMap::universe(space());
        bmap.add_inequality(&seq(&[0, 1, -2]));
        bmap.add_inequality(&seq(&[3, 0, 1]));
        bmap.add_inequality(&seq(&[0, -1, 2]));
        bmap.detect_equalities();

        assert_eq!(bmap.eqs, vec![seq(&[0, 1, -2])]);
        assert_eq!(bmap.ineqs, vec![seq(&[3, 0, 1])]);
    }

    #[test]
    fn finalize_solves_for_outputs() {
        // 2x == n and x >= 1 over [cst, n, x].
        let mut bmap = BasicMap::universe(space());
        bmap.add_equality(&seq(&[0, -1, 2]));
        bmap.add_inequality(&seq(&[-1, 0, 1]));
        bmap.finalize();

        assert_eq!(bmap.eqs, vec![seq(&[0, -1, 2])]);
        // x >= 1 became n >= 2 via the equality.
        assert_eq!(bmap.ineqs, vec![seq(&[-2, 1, 0])]);
    }

    #[test]
    fn trivial_emptiness() {
        let mut bmap = BasicMap::universe(space());
        assert!(!bmap.is_trivially_empty());
        bmap.add_equality(&seq(&[1, 0, 0]));
        assert!(bmap.is_trivially_empty());
    }
}
