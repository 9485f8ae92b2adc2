//! # Dense matrix
//!
//! A row-major matrix of arbitrary-precision integers. Rows can be swapped and appended, columns
//! appended, swapped and dropped; exactly the operations the tableau and the sample store need.
use std::fmt;

use num::{BigInt, Zero};

/// A dense matrix with `BigInt` entries. All rows have the same width at all times.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Matrix {
    rows: Vec<Vec<BigInt>>,
    nr_columns: usize,
}

impl Matrix {
    /// Create a matrix without any rows.
    pub fn empty(nr_columns: usize) -> Self {
        Self { rows: Vec::new(), nr_columns }
    }

    /// Create a matrix from explicit rows.
    ///
    /// # Arguments
    ///
    /// * `rows`: Row data; all rows must have length `nr_columns`.
    pub fn from_rows(rows: Vec<Vec<BigInt>>, nr_columns: usize) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == nr_columns));

        Self { rows, nr_columns }
    }

    /// Number of rows.
    pub fn nr_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn nr_columns(&self) -> usize {
        self.nr_columns
    }

    /// A row as a slice.
    pub fn row(&self, i: usize) -> &[BigInt] {
        debug_assert!(i < self.nr_rows());

        &self.rows[i]
    }

    /// A row as a mutable slice.
    pub fn row_mut(&mut self, i: usize) -> &mut [BigInt] {
        debug_assert!(i < self.nr_rows());

        &mut self.rows[i]
    }

    /// Two distinct rows, the first borrowed immutably and the second mutably.
    ///
    /// Used when one row is combined into another.
    pub fn row_and_row_mut(&mut self, read: usize, write: usize) -> (&[BigInt], &mut [BigInt]) {
        debug_assert!(read != write);
        debug_assert!(read < self.nr_rows() && write < self.nr_rows());

        if read < write {
            let (left, right) = self.rows.split_at_mut(write);
            (&left[read], &mut right[0])
        } else {
            let (left, right) = self.rows.split_at_mut(read);
            (&right[0], &mut left[write])
        }
    }

    /// Exchange two rows.
    pub fn swap_rows(&mut self, i: usize, j: usize) {
        debug_assert!(i < self.nr_rows() && j < self.nr_rows());

        self.rows.swap(i, j);
    }

    /// Append a row at the bottom.
    pub fn push_row(&mut self, row: Vec<BigInt>) {
        debug_assert_eq!(row.len(), self.nr_columns);

        self.rows.push(row);
    }

    /// Remove and return the bottom row.
    pub fn pop_row(&mut self) -> Option<Vec<BigInt>> {
        self.rows.pop()
    }

    /// Append a zero column on the right.
    pub fn push_column(&mut self) {
        for row in &mut self.rows {
            row.push(BigInt::zero());
        }
        self.nr_columns += 1;
    }

    /// Remove the rightmost column.
    pub fn pop_column(&mut self) {
        debug_assert!(self.nr_columns > 0);

        for row in &mut self.rows {
            row.pop();
        }
        self.nr_columns -= 1;
    }

    /// Exchange two columns.
    pub fn swap_columns(&mut self, i: usize, j: usize) {
        debug_assert!(i < self.nr_columns && j < self.nr_columns);

        if i != j {
            for row in &mut self.rows {
                row.swap(i, j);
            }
        }
    }

    /// Remove a column, shifting all later columns one position to the left.
    pub fn drop_column(&mut self, column: usize) {
        debug_assert!(column < self.nr_columns);

        for row in &mut self.rows {
            row.remove(column);
        }
        self.nr_columns -= 1;
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in &self.rows {
            for value in row {
                write!(f, "{:>8}", value.to_string())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use num::BigInt;

    use crate::data::linear_algebra::matrix::Matrix;

    fn seq(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|&v| BigInt::from(v)).collect()
    }

    #[test]
    fn rows_and_columns() {
        let mut m = Matrix::from_rows(vec![seq(&[1, 2]), seq(&[3, 4])], 2);
        m.push_column();
        assert_eq!(m.nr_columns(), 3);
        assert_eq!(m.row(0), &seq(&[1, 2, 0])[..]);

        m.swap_columns(0, 2);
        assert_eq!(m.row(1), &seq(&[0, 4, 3])[..]);

        m.drop_column(1);
        assert_eq!(m.row(0), &seq(&[0, 1])[..]);
        assert_eq!(m.nr_columns(), 2);

        m.swap_rows(0, 1);
        assert_eq!(m.row(0), &seq(&[0, 3])[..]);
    }

    #[test]
    fn split_borrow() {
        let mut m = Matrix::from_rows(vec![seq(&[1, 2]), seq(&[3, 4])], 2);
        let (read, write) = m.row_and_row_mut(0, 1);
        write[0] = &read[0] + &read[1];
        assert_eq!(m.row(1), &seq(&[3, 4])[..]);
    }
}
