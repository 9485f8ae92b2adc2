//! # Lexicographic pivoting
//!
//! Drives a tableau to its lexicographically smallest feasible vertex. Unlike an ordinary
//! feasibility restoration, which pivots some row that increases the violated constraint, the
//! pivot here always happens in the violated row itself, on the column that induces the
//! lexicographically smallest non-negative increment of the sample point. Starting from a sample
//! that is lexicographically below every point of the problem, the first feasible vertex reached
//! this way is the lexicographic minimum.
use num::{BigInt, One, Signed, Zero};

use crate::algorithm::lexmin::tableau::undo::UndoRecord;
use crate::algorithm::lexmin::tableau::{RowSign, Tableau, VarId};
use crate::algorithm::LexminError;
use crate::data::linear_algebra::vector;

impl Tableau {
    /// The first known violated row: a non-negativity constraint whose current value is obviously
    /// negative, or that was previously classified negative over the context.
    ///
    /// Rows with a negative big-M coefficient are returned first; their violation is unbounded.
    fn first_violated_row(&mut self) -> Option<usize> {
        if self.big_m {
            for row in self.nr_redundant..self.nr_rows {
                if self.variable_from_row(row).is_nonneg && self.mat.row(row)[2].is_negative() {
                    return Some(row);
                }
            }
        }
        for row in self.nr_redundant..self.nr_rows {
            if !self.variable_from_row(row).is_nonneg {
                continue;
            }
            if self.row_signs.is_some() {
                if self.sign_of(row) == RowSign::Unknown && self.is_obviously_negative(row) {
                    self.set_sign_of(row, RowSign::NonPositive);
                }
                if self.sign_of(row) != RowSign::NonPositive {
                    continue;
                }
            } else if !self.is_obviously_negative(row) {
                continue;
            }
            return Some(row);
        }

        None
    }

    /// Of two candidate columns, the one inducing the lexicographically smaller increment.
    ///
    /// Pivoting in column `c` increments the sample value of problem variable `v` by a
    /// non-negative multiple of `a_{v,c} / a_{r,c}`; the first variable where the two ratios
    /// differ decides. `a_{v,c}` is read from `v`'s row, or is the unit vector entry when `v` is
    /// non-basic.
    fn lexmin_col_pair(&self, row: usize, col1: usize, col2: usize) -> Result<usize, LexminError> {
        let off = self.off();
        let tr = self.mat.row(row);
        for i in self.nr_params..self.nr_variables - self.nr_divs {
            let var = &self.vars[i];
            if !var.is_row {
                if var.index == col1 {
                    return Ok(col2);
                }
                if var.index == col2 {
                    return Ok(col1);
                }
                continue;
            }
            if var.index == row {
                continue;
            }
            let r = self.mat.row(var.index);
            let s1 = r[off + col1].sign();
            let s2 = r[off + col2].sign();
            if s1 == s2 && r[off + col1].is_zero() {
                continue;
            }
            if s1 < s2 {
                return Ok(col1);
            }
            if s2 < s1 {
                return Ok(col2);
            }
            let difference = &r[off + col2] * &tr[off + col1] - &r[off + col1] * &tr[off + col2];
            if difference.is_positive() {
                return Ok(col1);
            }
            if difference.is_negative() {
                return Ok(col2);
            }
        }

        Err(LexminError::InternalInvariant("two pivot columns induce identical increments"))
    }

    /// The column to pivot on for the given violated row.
    ///
    /// # Return value
    ///
    /// `None` when no column has a positive coefficient, meaning the tableau is infeasible.
    pub(crate) fn lexmin_pivot_col(&self, row: usize) -> Result<Option<usize>, LexminError> {
        let off = self.off();
        let mut best = None;
        for col in self.nr_dead..self.nr_columns {
            if self.col_is_parameter(col) {
                continue;
            }
            if !self.mat.row(row)[off + col].is_positive() {
                continue;
            }
            best = Some(match best {
                None => col,
                Some(current) => self.lexmin_col_pair(row, current, col)?,
            });
        }

        Ok(best)
    }

    /// Resolve all known violated rows through pivoting.
    ///
    /// Pivots until no violated row remains or infeasibility is established, in which case the
    /// tableau is marked empty.
    pub(crate) fn restore_lexmin(&mut self) -> Result<(), LexminError> {
        if self.empty {
            return Ok(());
        }
        while let Some(row) = self.first_violated_row() {
            match self.lexmin_pivot_col(row)? {
                Some(col) => self.pivot(row, col),
                None => {
                    self.mark_empty();
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Whether the row is a pure constant over the live columns.
    pub(crate) fn is_constant_row(&self, row: usize) -> bool {
        let off = self.off();
        vector::first_non_zero(&self.mat.row(row)[off + self.nr_dead..off + self.nr_columns])
            .is_none()
    }

    /// The column to eliminate when adding an equality.
    ///
    /// Prefers the last problem variable with a non-zero coefficient; eliminating it keeps all
    /// initial columns lexicographically positive. Otherwise any parameter with coefficient `±1`
    /// will do: the eliminated parameter then stays integral whenever the others are.
    fn last_var_col_or_unit_param_col(&self, row: usize) -> Option<usize> {
        let off = self.off();
        for i in (self.nr_params..self.nr_variables - self.nr_divs).rev() {
            if self.vars[i].is_row {
                continue;
            }
            let col = self.vars[i].index;
            if col < self.nr_dead {
                continue;
            }
            if !self.mat.row(row)[off + col].is_zero() {
                return Some(col);
            }
        }
        for col in self.nr_dead..self.nr_columns {
            let coefficient = &self.mat.row(row)[off + col];
            if coefficient.is_one() || (-coefficient).is_one() {
                return Some(col);
            }
        }

        None
    }

    /// Add an equality that is known to hold on the problem.
    ///
    /// A variable or unit parameter is eliminated when possible; a pure parameter equality with
    /// non-unit coefficients is added as two opposite inequalities instead, in which case no
    /// violation can arise.
    pub(crate) fn add_valid_eq(&mut self, eq: &[BigInt]) -> Result<(), LexminError> {
        let con = self.add_row(eq);
        let row = self.cons[con].index;
        match self.last_var_col_or_unit_param_col(row) {
            None => {
                self.cons[con].is_nonneg = true;
                self.journal.push(UndoRecord::NonNeg { var: VarId::Constraint(con) });
                let mut negated = eq.to_vec();
                vector::negate(&mut negated);
                let con = self.add_row(&negated);
                self.cons[con].is_nonneg = true;
                self.journal.push(UndoRecord::NonNeg { var: VarId::Constraint(con) });
            }
            Some(col) => {
                self.pivot(row, col);
                self.kill_col(col);
                self.restore_lexmin()?;
            }
        }

        Ok(())
    }

    /// Add an inequality, resolving any violation it causes.
    pub(crate) fn add_ineq(&mut self, ineq: &[BigInt]) -> Result<(), LexminError> {
        if let Some(bset) = &mut self.bset {
            bset.add_inequality(ineq);
            self.journal.push(UndoRecord::AddBsetIneq);
        }
        let con = self.add_row(ineq);
        self.cons[con].is_nonneg = true;
        self.journal.push(UndoRecord::NonNeg { var: VarId::Constraint(con) });
        if self.row_is_redundant(self.cons[con].index) {
            self.mark_redundant(self.cons[con].index);
            return Ok(());
        }
        self.restore_lexmin()?;
        if !self.empty && self.cons[con].is_row && self.row_is_redundant(self.cons[con].index) {
            self.mark_redundant(self.cons[con].index);
        }

        Ok(())
    }

    /// Add an equality that may contradict the current constraints.
    ///
    /// The equality is inserted as two opposite non-negativity constraints, restoring the
    /// lexicographic minimum after each; if both survive, one of them is used to eliminate a
    /// column. A pure constant row must be zero, otherwise the tableau is empty.
    pub(crate) fn add_eq(&mut self, eq: &[BigInt]) -> Result<(), LexminError> {
        if let Some(bset) = &mut self.bset {
            bset.add_equality(eq);
            self.journal.push(UndoRecord::AddBsetEq);
        }
        let con1 = self.add_row(eq);
        self.cons[con1].is_nonneg = true;
        self.journal.push(UndoRecord::NonNeg { var: VarId::Constraint(con1) });

        let row = self.cons[con1].index;
        if self.is_constant_row(row) {
            let zero_constant = self.mat.row(row)[1].is_zero()
                && (!self.big_m || self.mat.row(row)[2].is_zero());
            if !zero_constant {
                self.mark_empty();
            }
            return Ok(());
        }

        self.restore_lexmin()?;
        if self.empty {
            return Ok(());
        }

        let mut negated = eq.to_vec();
        vector::negate(&mut negated);
        let con2 = self.add_row(&negated);
        self.cons[con2].is_nonneg = true;
        self.journal.push(UndoRecord::NonNeg { var: VarId::Constraint(con2) });

        self.restore_lexmin()?;
        if self.empty {
            return Ok(());
        }

        if !self.cons[con1].is_row {
            self.kill_col(self.cons[con1].index);
        } else if !self.cons[con2].is_row {
            self.kill_col(self.cons[con2].index);
        } else if self.mat.row(self.cons[con1].index)[1].is_zero() {
            let off = self.off();
            let row = self.cons[con1].index;
            let live = &self.mat.row(row)[off + self.nr_dead..off + self.nr_columns];
            if let Some(i) = vector::first_non_zero(live) {
                let col = self.nr_dead + i;
                self.pivot(row, col);
                self.kill_col(col);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use num::BigInt;

    use crate::algorithm::lexmin::tableau::Tableau;

    fn seq(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|&v| BigInt::from(v)).collect()
    }

    /// A non-parametric tableau behaves like a plain lexmin solver over its variables.
    fn lexmin_tab(constraints: &[Vec<BigInt>], nr_variables: usize) -> Tableau {
        let mut tab = Tableau::new(nr_variables, true);
        for i in 0..nr_variables {
            tab.vars[i].is_nonneg = true;
            tab.vars[i].frozen = true;
        }
        for constraint in constraints {
            tab.add_ineq(constraint).unwrap();
        }
        tab
    }

    #[test]
    fn feasible_vertex() {
        // x >= 2, x + y >= 3: lexmin is (2, 1).
        let tab = lexmin_tab(&[seq(&[-2, 1, 0]), seq(&[-3, 1, 1])], 2);
        assert!(!tab.empty);
        assert!(tab.sample_is_finite());
        assert_eq!(tab.sample_value(), seq(&[1, 2, 1]));
    }

    #[test]
    fn infeasible_marks_empty() {
        // x >= 2 and -x >= -1 cannot both hold.
        let tab = lexmin_tab(&[seq(&[-2, 1]), seq(&[1, -1])], 1);
        assert!(tab.empty);
    }

    #[test]
    fn equality_elimination() {
        // 2y = x with x = 4 forced by two inequalities; lexmin is (4, 2).
        let mut tab = Tableau::new(2, true);
        for i in 0..2 {
            tab.vars[i].is_nonneg = true;
            tab.vars[i].frozen = true;
        }
        tab.add_valid_eq(&seq(&[0, -1, 2])).unwrap();
        tab.add_ineq(&seq(&[-4, 1, 0])).unwrap();
        tab.add_ineq(&seq(&[4, -1, 0])).unwrap();
        assert!(!tab.empty);
        assert_eq!(tab.sample_value(), seq(&[1, 4, 2]));
        assert_eq!(tab.nr_dead, 1);
    }
}
