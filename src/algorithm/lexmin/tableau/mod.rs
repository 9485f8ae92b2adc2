//! # The parametric tableau
//!
//! A revised-simplex tableau over arbitrary-precision rationals, stored as integer rows with a
//! shared positive denominator in column 0. Column 1 holds the constant term; when the symbolic
//! big parameter is in use, column 2 holds its coefficient, and the remaining columns hold the
//! coefficients of the non-basic variables.
//!
//! Rather than assuming all variables non-negative, every variable `x` is represented as
//! `x' = M + x` for a symbolic value `M` larger than any integer, so that the all-zero sample
//! point is lexicographically smaller than any point of the problem. The big parameter is a
//! dedicated column that is never pivoted on; all arithmetic stays exact.
use std::fmt;

use num::{BigInt, Integer, One, Signed, Zero};

use crate::data::linear_algebra::{vector, Matrix};
use crate::data::number_types::Rational;
use crate::data::polyhedron::BasicSet;

pub mod undo;

use undo::UndoRecord;

/// Identifies a tableau variable: either a variable of the problem or an added constraint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VarId {
    Variable(usize),
    Constraint(usize),
}

/// Sign classification of a row's parametric constant over the current context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RowSign {
    /// Not yet determined.
    Unknown,
    /// Non-negative for every parameter value in the context.
    NonNegative,
    /// Non-positive for every parameter value in the context.
    NonPositive,
    /// Attains both signs; the context needs to be split.
    Mixed,
}

/// Bookkeeping for a single variable or constraint of the tableau.
#[derive(Clone, Debug)]
pub struct TableauVariable {
    /// Whether the variable is currently basic (in a row) or non-basic (in a column).
    pub is_row: bool,
    /// Row or column position, depending on `is_row`.
    pub index: usize,
    /// Whether the variable is restricted to non-negative values.
    pub is_nonneg: bool,
    /// Whether the variable has been eliminated; its column is dead and its value is zero.
    pub is_zero: bool,
    /// Whether the row holding this variable has been proven redundant.
    pub is_redundant: bool,
    /// Frozen variables are never pivoted away or marked redundant.
    pub frozen: bool,
}

impl TableauVariable {
    fn new_column(index: usize) -> Self {
        Self {
            is_row: false,
            index,
            is_nonneg: false,
            is_zero: false,
            is_redundant: false,
            frozen: false,
        }
    }
}

/// Integer sample points of a context, kept to cheaply guess row signs.
///
/// Samples are append-only; points invalidated by the current constraint stack are swapped into
/// the `[0, nr_outside)` prefix and restored through the undo journal.
#[derive(Clone, Debug)]
pub struct Samples {
    pub mat: Matrix,
    pub nr_outside: usize,
}

impl Samples {
    pub(crate) fn new(width: usize) -> Self {
        Self { mat: Matrix::empty(width), nr_outside: 0 }
    }

    /// Number of stored samples, the dropped prefix included.
    pub fn nr_samples(&self) -> usize {
        self.mat.nr_rows()
    }
}

/// The tableau. See the module documentation for the row layout.
#[derive(Clone, Debug)]
pub struct Tableau {
    pub(crate) mat: Matrix,
    pub(crate) nr_rows: usize,
    pub(crate) nr_columns: usize,
    /// Total number of tracked variables. The first `nr_params` and the last `nr_divs` are shared
    /// with the context; the middle block holds the problem variables.
    pub(crate) nr_variables: usize,
    pub(crate) nr_params: usize,
    pub(crate) nr_divs: usize,
    /// Columns `[0, nr_dead)` belong to eliminated variables and are ignored.
    pub(crate) nr_dead: usize,
    /// Rows `[0, nr_redundant)` have been proven redundant and are ignored.
    pub(crate) nr_redundant: usize,
    /// Whether the symbolic big parameter column is present.
    pub(crate) big_m: bool,
    pub(crate) vars: Vec<TableauVariable>,
    pub(crate) cons: Vec<TableauVariable>,
    pub(crate) row_var: Vec<VarId>,
    pub(crate) col_var: Vec<VarId>,
    /// Cached sign classification per row; present only in parametric mode.
    pub(crate) row_signs: Option<Vec<RowSign>>,
    /// Present only on context tableaux.
    pub(crate) samples: Option<Samples>,
    /// Shadow of the constraints added to a context tableau.
    pub(crate) bset: Option<BasicSet>,
    pub(crate) empty: bool,
    /// Stop at the rational optimum; the cut phase is skipped entirely.
    pub(crate) rational: bool,
    pub(crate) in_undo: bool,
    pub(crate) journal: Vec<UndoRecord>,
}

impl Tableau {
    /// Create a tableau with every variable in its own column and no rows.
    pub(crate) fn new(nr_variables: usize, big_m: bool) -> Self {
        let off = 2 + big_m as usize;
        Self {
            mat: Matrix::empty(off + nr_variables),
            nr_rows: 0,
            nr_columns: nr_variables,
            nr_variables,
            nr_params: 0,
            nr_divs: 0,
            nr_dead: 0,
            nr_redundant: 0,
            big_m,
            vars: (0..nr_variables).map(TableauVariable::new_column).collect(),
            cons: Vec::new(),
            row_var: Vec::new(),
            col_var: (0..nr_variables).map(VarId::Variable).collect(),
            row_signs: None,
            samples: None,
            bset: None,
            empty: false,
            rational: false,
            in_undo: false,
            journal: Vec::new(),
        }
    }

    /// Offset of the first variable column within a matrix row.
    pub(crate) fn off(&self) -> usize {
        2 + self.big_m as usize
    }

    /// The record of a variable or constraint.
    pub(crate) fn variable(&self, id: VarId) -> &TableauVariable {
        match id {
            VarId::Variable(i) => &self.vars[i],
            VarId::Constraint(i) => &self.cons[i],
        }
    }

    pub(crate) fn variable_mut(&mut self, id: VarId) -> &mut TableauVariable {
        match id {
            VarId::Variable(i) => &mut self.vars[i],
            VarId::Constraint(i) => &mut self.cons[i],
        }
    }

    /// The record of the variable that is basic in the given row.
    pub(crate) fn variable_from_row(&self, row: usize) -> &TableauVariable {
        self.variable(self.row_var[row])
    }

    /// Whether the variable in the given column is shared with the context.
    ///
    /// Context-shared variables are parameters of the problem; they are never pivoted on by the
    /// lexicographic pivoting strategy.
    pub(crate) fn col_is_parameter(&self, col: usize) -> bool {
        match self.col_var[col] {
            VarId::Variable(v) => v < self.nr_params || v >= self.nr_variables - self.nr_divs,
            VarId::Constraint(_) => false,
        }
    }

    /// Cached sign of a row; `Unknown` when not in parametric mode.
    pub(crate) fn sign_of(&self, row: usize) -> RowSign {
        self.row_signs.as_ref().map_or(RowSign::Unknown, |signs| signs[row])
    }

    pub(crate) fn set_sign_of(&mut self, row: usize, sign: RowSign) {
        if let Some(signs) = &mut self.row_signs {
            signs[row] = sign;
        }
    }

    /// Append a fresh constraint record with an all-zero row at the bottom of the tableau.
    ///
    /// The caller is responsible for filling the row and keeping invariants.
    pub(crate) fn allocate_con(&mut self) -> usize {
        let index = self.cons.len();
        let mut record = TableauVariable::new_column(self.nr_rows);
        record.is_row = true;
        self.cons.push(record);
        self.row_var.push(VarId::Constraint(index));
        if let Some(signs) = &mut self.row_signs {
            signs.push(RowSign::Unknown);
        }
        self.mat.push_row(vec![BigInt::zero(); self.off() + self.nr_columns]);
        self.nr_rows += 1;
        self.journal.push(UndoRecord::AllocCon);

        index
    }

    /// Append a fresh variable in a new column on the right.
    pub(crate) fn allocate_var(&mut self) -> usize {
        let index = self.vars.len();
        self.mat.push_column();
        self.vars.push(TableauVariable::new_column(self.nr_columns));
        self.col_var.push(VarId::Variable(index));
        self.nr_columns += 1;
        self.nr_variables += 1;
        self.journal.push(UndoRecord::AllocVar);

        index
    }

    /// Add a constraint row, materialized in terms of the current basis.
    ///
    /// # Arguments
    ///
    /// * `line`: `[constant, coefficient per variable…]`, of length `1 + nr_variables`.
    ///
    /// # Return value
    ///
    /// The index of the new constraint.
    pub(crate) fn add_row(&mut self, line: &[BigInt]) -> usize {
        debug_assert_eq!(line.len(), 1 + self.nr_variables);

        let off = self.off();
        let con = self.allocate_con();
        let row = self.cons[con].index;
        self.mat.row_mut(row)[0] = BigInt::one();
        self.mat.row_mut(row)[1] = line[0].clone();

        for i in 0..self.nr_variables {
            if line[1 + i].is_zero() || self.vars[i].is_zero {
                continue;
            }
            if self.vars[i].is_row {
                let basic_row = self.vars[i].index;
                let (src, dst) = self.mat.row_and_row_mut(basic_row, row);
                let lcm = dst[0].lcm(&src[0]);
                let f_dst = &lcm / &dst[0];
                let f_src = (&lcm / &src[0]) * &line[1 + i];
                dst[0] = lcm;
                vector::combine(&mut dst[1..], &f_dst, &f_src, &src[1..]);
            } else {
                let col = self.vars[i].index;
                let denominator = self.mat.row(row)[0].clone();
                self.mat.row_mut(row)[off + col] += &line[1 + i] * &denominator;
            }
            if self.big_m && i >= self.nr_params && i < self.nr_variables - self.nr_divs {
                // The tableau variable is x' = M + x, so x = x' - M picks up -M per unit.
                let denominator = self.mat.row(row)[0].clone();
                self.mat.row_mut(row)[2] -= &line[1 + i] * &denominator;
            }
        }
        vector::normalize(self.mat.row_mut(row));

        con
    }

    /// Exchange the basic variable in `row` with the non-basic variable in `col`.
    ///
    /// All other rows are updated so that the entering variable's column becomes a unit column;
    /// every touched row is reduced by its gcd. Outside of a rollback, newly redundant rows are
    /// detected and moved out of the way.
    pub(crate) fn pivot(&mut self, row: usize, col: usize) {
        debug_assert!(row >= self.nr_redundant && row < self.nr_rows);
        debug_assert!(col >= self.nr_dead && col < self.nr_columns);
        debug_assert!(!self.mat.row(row)[self.off() + col].is_zero(), "pivot element is zero");

        let off = self.off();
        let width = off + self.nr_columns;
        {
            let r = self.mat.row_mut(row);
            r.swap(0, off + col);
            if r[0].is_negative() {
                r[0] = -&r[0];
                r[off + col] = -&r[off + col];
            } else {
                for j in 1..width {
                    if j != off + col {
                        r[j] = -&r[j];
                    }
                }
            }
            vector::normalize(r);
        }
        for i in 0..self.nr_rows {
            if i == row || self.mat.row(i)[off + col].is_zero() {
                continue;
            }
            let (pivot_row, target) = self.mat.row_and_row_mut(row, i);
            let coefficient = target[off + col].clone();
            target[0] = &target[0] * &pivot_row[0];
            for j in 1..width {
                if j != off + col {
                    target[j] = &target[j] * &pivot_row[0] + &coefficient * &pivot_row[j];
                }
            }
            target[off + col] = &coefficient * &pivot_row[off + col];
            vector::normalize(target);
        }

        let row_id = self.row_var[row];
        let col_id = self.col_var[col];
        self.row_var[row] = col_id;
        self.col_var[col] = row_id;
        {
            let entering = self.variable_mut(col_id);
            entering.is_row = true;
            entering.index = row;
        }
        {
            let leaving = self.variable_mut(row_id);
            leaving.is_row = false;
            leaving.index = col;
        }
        // Whatever was known about the old row no longer applies to its replacement.
        self.set_sign_of(row, RowSign::Unknown);

        if self.in_undo {
            return;
        }
        self.journal.push(UndoRecord::Pivot { row, col });
        let mut i = self.nr_redundant;
        while i < self.nr_rows {
            if !self.mat.row(i)[off + col].is_zero()
                && !self.variable_from_row(i).frozen
                && self.row_is_redundant(i)
            {
                self.mark_redundant(i);
            }
            i += 1;
        }
    }

    /// Freeze the column of an eliminated variable; it is ignored from here on.
    ///
    /// Never called while a snapshot is live, so it is not journaled.
    pub(crate) fn kill_col(&mut self, col: usize) {
        debug_assert!(col >= self.nr_dead && col < self.nr_columns);

        let id = self.col_var[col];
        self.variable_mut(id).is_zero = true;
        self.swap_cols(col, self.nr_dead);
        self.nr_dead += 1;
    }

    pub(crate) fn swap_rows(&mut self, r1: usize, r2: usize) {
        if r1 == r2 {
            return;
        }
        self.mat.swap_rows(r1, r2);
        self.row_var.swap(r1, r2);
        if let Some(signs) = &mut self.row_signs {
            signs.swap(r1, r2);
        }
        let id1 = self.row_var[r1];
        let id2 = self.row_var[r2];
        self.variable_mut(id1).index = r1;
        self.variable_mut(id2).index = r2;
    }

    pub(crate) fn swap_cols(&mut self, c1: usize, c2: usize) {
        if c1 == c2 {
            return;
        }
        let off = self.off();
        self.mat.swap_columns(off + c1, off + c2);
        self.col_var.swap(c1, c2);
        let id1 = self.col_var[c1];
        let id2 = self.col_var[c2];
        self.variable_mut(id1).index = c1;
        self.variable_mut(id2).index = c2;
    }

    /// Whether a row can be ignored from here on.
    ///
    /// A row is redundant when it reduces to a constant over the live columns and that constant
    /// (big-M part included) is non-negative.
    pub(crate) fn row_is_redundant(&self, row: usize) -> bool {
        let off = self.off();
        if let VarId::Constraint(_) = self.row_var[row] {
            if !self.variable_from_row(row).is_nonneg {
                return false;
            }
        }
        if self.mat.row(row)[1].is_negative() {
            return false;
        }
        if self.big_m && self.mat.row(row)[2].is_negative() {
            return false;
        }
        vector::first_non_zero(&self.mat.row(row)[off + self.nr_dead..off + self.nr_columns])
            .is_none()
    }

    /// Move a redundant row into the ignored prefix.
    pub(crate) fn mark_redundant(&mut self, row: usize) {
        debug_assert!(row >= self.nr_redundant);

        let id = self.row_var[row];
        self.variable_mut(id).is_redundant = true;
        if let VarId::Variable(_) = id {
            let var = self.variable_mut(id);
            if !var.frozen && !var.is_nonneg {
                var.is_nonneg = true;
                self.journal.push(UndoRecord::NonNeg { var: id });
            }
        }
        self.swap_rows(self.nr_redundant, row);
        self.journal.push(UndoRecord::MarkRedundant { row });
        self.nr_redundant += 1;
    }

    /// Record terminal infeasibility.
    pub(crate) fn mark_empty(&mut self) {
        if !self.empty {
            self.empty = true;
            self.journal.push(UndoRecord::MarkEmpty);
        }
    }

    /// Whether the sample value is finite, i.e. every variable offsets the big parameter exactly.
    pub(crate) fn sample_is_finite(&self) -> bool {
        if !self.big_m {
            return true;
        }
        self.vars.iter().all(|var| {
            var.is_row && {
                let row = self.mat.row(var.index);
                row[2] == row[0]
            }
        })
    }

    /// The current sample point as `[1, value per variable…]`.
    ///
    /// Only meaningful when the sample is finite and integral, which the integer closure of the
    /// cut engine guarantees at the call sites.
    pub(crate) fn sample_value(&self) -> Vec<BigInt> {
        let mut value = Vec::with_capacity(1 + self.nr_variables);
        value.push(BigInt::one());
        for var in &self.vars {
            if !var.is_row {
                value.push(BigInt::zero());
            } else {
                let row = self.mat.row(var.index);
                debug_assert!(row[1].is_multiple_of(&row[0]), "sample value is not integral");
                value.push(&row[1] / &row[0]);
            }
        }

        value
    }

    /// Move a sample that no longer satisfies the constraint stack out of the active range.
    pub(crate) fn drop_sample(&mut self, sample: usize) {
        let samples = self.samples.as_mut().expect("samples are only kept on context tableaux");
        if sample != samples.nr_outside {
            samples.mat.swap_rows(samples.nr_outside, sample);
        }
        samples.nr_outside += 1;
        self.journal.push(UndoRecord::DropSample { row: sample });
    }

    /// Drop the big parameter column. Used on a context tableau once every variable is known to
    /// be non-negative; never called while a snapshot is live.
    pub(crate) fn drop_big_m(&mut self) {
        debug_assert!(self.big_m);

        self.mat.drop_column(2);
        self.big_m = false;
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "tableau: {} rows ({} redundant), {} columns ({} dead), {} variables{}{}",
            self.nr_rows,
            self.nr_redundant,
            self.nr_columns,
            self.nr_dead,
            self.nr_variables,
            if self.big_m { ", big-M" } else { "" },
            if self.empty { ", empty" } else { "" },
        )?;
        let off = self.off();
        for row in 0..self.nr_rows {
            let d = &self.mat.row(row)[0];
            match self.row_var[row] {
                VarId::Variable(v) => write!(f, "  x{:<3}", v)?,
                VarId::Constraint(c) => write!(f, "  c{:<3}", c)?,
            }
            write!(f, "= {}", Rational::new(self.mat.row(row)[1].clone(), d.clone()))?;
            if self.big_m {
                write!(f, " + {} M", Rational::new(self.mat.row(row)[2].clone(), d.clone()))?;
            }
            for col in 0..self.nr_columns {
                let coefficient = &self.mat.row(row)[off + col];
                if coefficient.is_zero() {
                    continue;
                }
                let value = Rational::new(coefficient.clone(), d.clone());
                match self.col_var[col] {
                    VarId::Variable(v) => write!(f, " + {} x{}", value, v)?,
                    VarId::Constraint(c) => write!(f, " + {} c{}", value, c)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use num::{BigInt, One};

    use crate::algorithm::lexmin::tableau::{Tableau, VarId};

    fn seq(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|&v| BigInt::from(v)).collect()
    }

    /// A small helper reading the sample value of a variable as (numerator, denominator).
    fn value_of(tab: &Tableau, var: usize) -> (BigInt, BigInt) {
        if !tab.vars[var].is_row {
            (BigInt::from(0), BigInt::one())
        } else {
            let row = tab.mat.row(tab.vars[var].index);
            (row[1].clone(), row[0].clone())
        }
    }

    #[test]
    fn add_row_and_pivot() {
        // Two variables, no big parameter: x0 - 2 x1 + 3 >= 0 as a row.
        let mut tab = Tableau::new(2, false);
        let con = tab.add_row(&seq(&[3, 1, -2]));
        let row = tab.cons[con].index;
        assert_eq!(tab.mat.row(row), &seq(&[1, 3, 1, -2])[..]);

        // Pivot x0 into the row: x0 = -3 + c0 + 2 x1.
        tab.pivot(row, 0);
        assert_eq!(tab.row_var[row], VarId::Variable(0));
        assert!(tab.vars[0].is_row);
        assert_eq!(value_of(&tab, 0), (BigInt::from(-3), BigInt::one()));

        // Pivoting back restores the exact original row.
        tab.pivot(row, 0);
        assert_eq!(tab.mat.row(row), &seq(&[1, 3, 1, -2])[..]);
        assert_eq!(tab.row_var[row], VarId::Constraint(con));
    }

    #[test]
    fn rows_materialize_against_the_basis() {
        let mut tab = Tableau::new(2, false);
        let c0 = tab.add_row(&seq(&[0, 2, 0]));
        let row = tab.cons[c0].index;
        assert_eq!(tab.mat.row(row), &seq(&[1, 0, 2, 0])[..]);

        // Make x0 basic: x0 = c0 / 2.
        tab.pivot(row, 0);
        assert_eq!(tab.mat.row(row), &seq(&[2, 0, 1, 0])[..]);

        // A new constraint on x0 is expressed through the basic row, denominator included.
        let c1 = tab.add_row(&seq(&[0, 1, 0]));
        assert_eq!(tab.mat.row(tab.cons[c1].index), &seq(&[2, 0, 1, 0])[..]);
    }

    #[test]
    fn big_m_column_tracks_problem_variables() {
        // One parameter, one problem variable: x - n >= 0.
        let mut tab = Tableau::new(2, true);
        tab.nr_params = 1;
        let con = tab.add_row(&seq(&[0, -1, 1]));
        let row = tab.cons[con].index;
        // The x coefficient contributes -M; the parameter does not.
        assert_eq!(tab.mat.row(row), &seq(&[1, 0, -1, -1, 1])[..]);
    }

    #[test]
    fn redundant_rows_move_to_the_front() {
        let mut tab = Tableau::new(1, false);
        let c0 = tab.add_row(&seq(&[1, 0]));
        tab.cons[c0].is_nonneg = true;
        let row = tab.cons[c0].index;
        assert!(tab.row_is_redundant(row));
        tab.mark_redundant(row);
        assert_eq!(tab.nr_redundant, 1);
        assert!(tab.cons[c0].is_redundant);
    }
}
