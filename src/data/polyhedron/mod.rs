//! # Polyhedral containers
//!
//! Basic sets and basic maps: conjunctions of affine equalities and inequalities over integer
//! dimensions, extended with integer divisions. Constraint rows are stored densely as
//! `[constant, dimensions…, divisions…]`; an inequality row `e` means `e >= 0`, an equality row
//! means `e == 0`.
use num::{BigInt, Integer, One, Signed, Zero};

use crate::data::linear_algebra::vector;

pub mod basic_map;
pub mod basic_set;

pub use basic_map::BasicMap;
pub use basic_set::BasicSet;

/// The dimensions of a relation: parameters, input dimensions and output dimensions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Space {
    pub nr_param: usize,
    pub nr_in: usize,
    pub nr_out: usize,
}

impl Space {
    /// Total number of dimensions, divisions not included.
    pub fn total(&self) -> usize {
        self.nr_param + self.nr_in + self.nr_out
    }

    /// Number of dimensions of the domain, parameters included.
    pub fn nr_domain(&self) -> usize {
        self.nr_param + self.nr_in
    }
}

/// An integer division `floor(line / denominator)` over the dimensions preceding it.
///
/// A zero denominator marks a division whose definition is not known; such divisions are
/// identified by position only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Div {
    pub denominator: BigInt,
    pub line: Vec<BigInt>,
}

/// A disjoint union of basic maps over a common space.
#[derive(Clone, Debug)]
pub struct Map {
    pub space: Space,
    pub pieces: Vec<BasicMap>,
}

impl Map {
    /// A union without any pieces.
    pub fn empty(space: Space) -> Self {
        Self { space, pieces: Vec::new() }
    }

    /// Whether there are no pieces.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

/// A disjoint union of basic sets over a common dimension count.
#[derive(Clone, Debug)]
pub struct Set {
    pub nr_dim: usize,
    pub pieces: Vec<BasicSet>,
}

impl Set {
    /// A union without any pieces.
    pub fn empty(nr_dim: usize) -> Self {
        Self { nr_dim, pieces: Vec::new() }
    }

    /// Whether there are no pieces.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

/// Gaussian elimination of the equalities, applied to the inequalities as well.
///
/// Columns are eliminated from the back, so that later dimensions (outputs, divisions) end up
/// expressed in terms of earlier ones (parameters) where possible. Inequalities are only ever
/// scaled by positive factors, preserving their direction.
pub(crate) fn gauss(eqs: &mut [Vec<BigInt>], ineqs: &mut [Vec<BigInt>], nr_columns: usize) {
    let mut rank = 0;
    for column in (1..nr_columns).rev() {
        if rank == eqs.len() {
            break;
        }
        let pivot = match (rank..eqs.len()).find(|&r| !eqs[r][column].is_zero()) {
            Some(r) => r,
            None => continue,
        };
        eqs.swap(rank, pivot);
        if eqs[rank][column].is_negative() {
            vector::negate(&mut eqs[rank]);
        }
        let pivot_row = eqs[rank].clone();
        for (r, row) in eqs.iter_mut().enumerate() {
            if r != rank && !row[column].is_zero() {
                eliminate(&pivot_row, row, column);
                vector::normalize(row);
            }
        }
        for row in ineqs.iter_mut() {
            if !row[column].is_zero() {
                eliminate(&pivot_row, row, column);
            }
        }
        rank += 1;
    }
}

/// Subtract a multiple of the pivot row so that `row[column]` becomes zero.
///
/// The factor applied to `row` itself is positive.
fn eliminate(pivot_row: &[BigInt], row: &mut [BigInt], column: usize) {
    debug_assert!(pivot_row[column].is_positive());

    let divisor = pivot_row[column].gcd(&row[column]);
    let f_row = &pivot_row[column] / &divisor;
    let f_pivot = -(&row[column] / &divisor);
    vector::combine(row, &f_row, &f_pivot, pivot_row);

    debug_assert!(row[column].is_zero());
}

/// Scale an equality down by the gcd of its coefficients.
///
/// The constant is only divided when the gcd divides it; otherwise the row is left untouched (a
/// rational solution may still exist).
pub(crate) fn normalize_equality(row: &mut [BigInt]) {
    let divisor = vector::gcd(&row[1..]);
    if !divisor.is_zero() && !divisor.is_one() && row[0].is_multiple_of(&divisor) {
        vector::scale_down(row, &divisor);
    }
}

/// Scale an inequality down by the gcd of its coefficients, tightening the constant.
///
/// `g e + c >= 0` holds for integer `e` exactly when `e + floor(c/g) >= 0` does.
pub(crate) fn normalize_inequality(row: &mut [BigInt]) {
    let divisor = vector::gcd(&row[1..]);
    if !divisor.is_zero() && !divisor.is_one() {
        row[0] = row[0].div_floor(&divisor);
        vector::scale_down(&mut row[1..], &divisor);
    }
}

/// Remove constraint rows that are identically zero.
pub(crate) fn drop_zero_rows(rows: &mut Vec<Vec<BigInt>>) {
    rows.retain(|row| vector::first_non_zero(row).is_some());
}

#[cfg(test)]
mod test {
    use num::BigInt;

    use crate::data::polyhedron::{drop_zero_rows, gauss, normalize_equality, normalize_inequality};

    fn seq(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|&v| BigInt::from(v)).collect()
    }

    #[test]
    fn gauss_eliminates_from_the_back() {
        // x + y - 3 == 0 and y - 1 == 0 over columns [cst, x, y].
        let mut eqs = vec![seq(&[-3, 1, 1]), seq(&[-1, 0, 1])];
        let mut ineqs = vec![seq(&[0, 1, 0]), seq(&[0, 0, 1])];
        gauss(&mut eqs, &mut ineqs, 3);

        assert_eq!(eqs[0], seq(&[-1, 0, 1]));
        assert_eq!(eqs[1], seq(&[-2, 1, 0]));
        assert_eq!(ineqs[1], seq(&[1, 0, 0]));
    }

    #[test]
    fn normalization() {
        let mut eq = seq(&[4, 2, -6]);
        normalize_equality(&mut eq);
        assert_eq!(eq, seq(&[2, 1, -3]));

        // Constant not divisible: left alone.
        let mut eq = seq(&[3, 2, -6]);
        normalize_equality(&mut eq);
        assert_eq!(eq, seq(&[3, 2, -6]));

        // Inequality constant is floored.
        let mut ineq = seq(&[3, 2, -6]);
        normalize_inequality(&mut ineq);
        assert_eq!(ineq, seq(&[1, 1, -3]));

        let mut rows = vec![seq(&[0, 0, 0]), seq(&[1, 0, 0])];
        drop_zero_rows(&mut rows);
        assert_eq!(rows, vec![seq(&[1, 0, 0])]);
    }
}
