//! # The undo journal
//!
//! Every mutation of a tableau that is not append-only within a branch is logged. A snapshot is
//! an index into the journal; rolling back replays the log in reverse, restoring the tableau (and
//! the basic-set shadow and samples of a context tableau) to its exact earlier state.
use crate::algorithm::lexmin::tableau::{Tableau, VarId};
use num::Zero;

/// One logged mutation.
#[derive(Clone, Debug)]
pub(crate) enum UndoRecord {
    /// A pivot. The transformation is self-inverse under the gcd-normalized denominator
    /// convention, so undoing replays the same pivot with redundancy detection suppressed.
    Pivot { row: usize, col: usize },
    /// A row was swapped from `row` into the redundant prefix.
    MarkRedundant { row: usize },
    /// The tableau was marked empty.
    MarkEmpty,
    /// A sample was swapped from `row` into the dropped prefix.
    DropSample { row: usize },
    /// The set of non-basic variables at a safe point, restored on rollback.
    SavedBasis { columns: Vec<VarId> },
    /// An equality was appended to the basic-set shadow.
    AddBsetEq,
    /// An inequality was appended to the basic-set shadow.
    AddBsetIneq,
    /// A division was appended to the basic-set shadow and the sample store.
    AddBsetDiv,
    /// A variable column was appended.
    AllocVar,
    /// A constraint row was appended.
    AllocCon,
    /// A variable was marked non-negative.
    NonNeg { var: VarId },
}

/// A point in the journal to roll back to.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Snapshot(usize);

impl Tableau {
    /// The current journal position.
    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot(self.journal.len())
    }

    /// Record the current basis so that rollback can restore it before dropping rows.
    pub(crate) fn push_basis(&mut self) {
        let columns = self.col_var.clone();
        self.journal.push(UndoRecord::SavedBasis { columns });
    }

    /// Replay the journal in reverse down to the snapshot.
    pub(crate) fn rollback(&mut self, snapshot: Snapshot) {
        self.in_undo = true;
        while self.journal.len() > snapshot.0 {
            if let Some(record) = self.journal.pop() {
                self.undo(record);
            }
        }
        self.in_undo = false;
    }

    fn undo(&mut self, record: UndoRecord) {
        match record {
            UndoRecord::Pivot { row, col } => self.pivot(row, col),
            UndoRecord::MarkRedundant { row } => {
                self.nr_redundant -= 1;
                let id = self.row_var[self.nr_redundant];
                self.variable_mut(id).is_redundant = false;
                self.swap_rows(self.nr_redundant, row);
            }
            UndoRecord::MarkEmpty => self.empty = false,
            UndoRecord::DropSample { row } => {
                let samples = self.samples.as_mut().expect("drop was logged on a context");
                samples.nr_outside -= 1;
                if row != samples.nr_outside {
                    samples.mat.swap_rows(samples.nr_outside, row);
                }
            }
            UndoRecord::SavedBasis { columns } => self.restore_basis(&columns),
            UndoRecord::AddBsetEq => {
                self.bset.as_mut().expect("equality was logged on a context").pop_equality();
            }
            UndoRecord::AddBsetIneq => {
                self.bset.as_mut().expect("inequality was logged on a context").pop_inequality();
            }
            UndoRecord::AddBsetDiv => {
                self.bset.as_mut().expect("div was logged on a context").pop_div();
                if let Some(samples) = &mut self.samples {
                    samples.mat.pop_column();
                }
            }
            UndoRecord::AllocVar => {
                let var = self.vars.pop().expect("allocation was logged");
                debug_assert!(!var.is_row && var.index == self.nr_columns - 1);
                self.col_var.pop();
                self.mat.pop_column();
                self.nr_columns -= 1;
                self.nr_variables -= 1;
            }
            UndoRecord::AllocCon => {
                let con = self.cons.pop().expect("allocation was logged");
                debug_assert!(con.is_row && con.index == self.nr_rows - 1);
                self.row_var.pop();
                if let Some(signs) = &mut self.row_signs {
                    signs.pop();
                }
                self.mat.pop_row();
                self.nr_rows -= 1;
            }
            UndoRecord::NonNeg { var } => self.variable_mut(var).is_nonneg = false,
        }
    }

    /// Pivot until the non-basic variables are again exactly those in `columns`.
    ///
    /// After replaying the pivot records this is a no-op; the general path exists for the case
    /// where a saved basis is restored across row drops.
    fn restore_basis(&mut self, columns: &[VarId]) {
        debug_assert_eq!(columns.len(), self.nr_columns);

        if self.col_var == columns {
            return;
        }
        let mut extra: Vec<usize> = (self.nr_dead..self.nr_columns)
            .filter(|&j| !columns.contains(&self.col_var[j]))
            .collect();
        // Dead columns are never touched between a snapshot and its rollback.
        for &target in &columns[self.nr_dead..] {
            if (self.nr_dead..self.nr_columns).any(|j| self.col_var[j] == target) {
                continue;
            }
            let var = self.variable(target);
            debug_assert!(var.is_row);
            let row = var.index;
            let off = self.off();
            let position = extra
                .iter()
                .position(|&j| !self.mat.row(row)[off + j].is_zero());
            // The change of basis is non-singular, so a pivot element exists.
            debug_assert!(position.is_some());
            if let Some(position) = position {
                let col = extra.swap_remove(position);
                self.pivot(row, col);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use num::BigInt;

    use crate::algorithm::lexmin::tableau::Tableau;

    fn seq(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|&v| BigInt::from(v)).collect()
    }

    #[test]
    fn rollback_restores_rows_and_pivots() {
        let mut tab = Tableau::new(2, false);
        let c0 = tab.add_row(&seq(&[3, 1, -2]));
        let reference = tab.clone();

        let snapshot = tab.snapshot();
        tab.push_basis();
        let c1 = tab.add_row(&seq(&[0, 1, 1]));
        tab.pivot(tab.cons[c1].index, 0);
        tab.pivot(tab.cons[c0].index, 1);
        tab.mark_empty();
        assert!(tab.empty);

        tab.rollback(snapshot);
        assert!(!tab.empty);
        assert_eq!(tab.nr_rows, reference.nr_rows);
        assert_eq!(tab.mat, reference.mat);
        assert_eq!(tab.col_var, reference.col_var);
        assert_eq!(tab.row_var, reference.row_var);
    }

    #[test]
    fn rollback_restores_redundant_marks() {
        let mut tab = Tableau::new(1, false);
        let c0 = tab.add_row(&seq(&[1, 1]));
        tab.cons[c0].is_nonneg = true;
        let c1 = tab.add_row(&seq(&[2, 0]));
        tab.cons[c1].is_nonneg = true;

        let snapshot = tab.snapshot();
        tab.mark_redundant(tab.cons[c1].index);
        assert_eq!(tab.nr_redundant, 1);
        assert_eq!(tab.cons[c1].index, 0);

        tab.rollback(snapshot);
        assert_eq!(tab.nr_redundant, 0);
        assert_eq!(tab.cons[c1].index, 1);
        assert!(!tab.cons[c1].is_redundant);
    }
}
