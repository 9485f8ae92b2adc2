//! # The recursive driver
//!
//! Computes the lexicographic optimum of a main tableau within the region described by the
//! context. Row signs couple the two: a row that is negative somewhere in the region forces a
//! pivot, a row that changes sign forces a case split of the region, and when every row is
//! non-negative the branch has reached its optimum and only integrality remains to be enforced.
use log::debug;
use num::BigInt;

use crate::algorithm::lexmin::context::{
    best_split, check_samples, context_valid_sample_or_feasible, is_strict, row_sign,
};
use crate::algorithm::lexmin::cut::{add_parametric_cut, get_div, ineq_for_div};
use crate::algorithm::lexmin::sink::{Sink, SolutionSink};
use crate::algorithm::lexmin::tableau::{RowSign, Tableau, VarId};
use crate::algorithm::LexminError;
use crate::data::linear_algebra::vector;

/// The in-progress solution: the context shared by all branches and the sink receiving pieces.
pub(crate) struct Solutions<'a> {
    pub context: Tableau,
    pub sink: Sink<'a>,
}

impl Solutions<'_> {
    /// Emit the branch that just terminated.
    pub(crate) fn add(&mut self, tab: &Tableau) -> Result<(), LexminError> {
        let Self { context, sink } = self;
        sink.add(context, tab)
    }
}

/// What to do after one driver iteration.
enum Step {
    /// Re-establish the lexicographic minimum and iterate again.
    Continue,
    /// The branch terminated; emit it.
    Done,
}

/// Solve the branch held by `tab` under the current context and emit its pieces.
///
/// On entry no obviously violated row may remain in `tab`; the iteration re-establishes this
/// after every mutation it makes.
pub(crate) fn find_solutions(sol: &mut Solutions, mut tab: Tableau) -> Result<(), LexminError> {
    if !tab.empty && !sol.context.empty {
        loop {
            match iteration(sol, &mut tab)? {
                Step::Done => break,
                Step::Continue => {
                    tab.restore_lexmin()?;
                    if tab.empty {
                        break;
                    }
                }
            }
        }
    }

    sol.add(&tab)
}

/// One round of the driver: classify row signs, then either pivot, split, cut, or terminate.
fn iteration(sol: &mut Solutions, tab: &mut Tableau) -> Result<Step, LexminError> {
    let mut split = None;
    let mut nr_split = 0;
    let mut needs_pivot = false;
    for row in tab.nr_redundant..tab.nr_rows {
        if !tab.variable_from_row(row).is_nonneg {
            continue;
        }
        let sign = row_sign(tab, &mut sol.context, row)?;
        tab.set_sign_of(row, sign);
        if sign == RowSign::Mixed {
            nr_split += 1;
            if split.is_none() {
                split = Some(row);
            }
        }
        if sign == RowSign::NonPositive {
            needs_pivot = true;
            break;
        }
    }
    if needs_pivot {
        return Ok(Step::Continue);
    }

    if let Some(first) = split {
        let split_row = if nr_split == 1 {
            first
        } else {
            best_split(tab, &mut sol.context)?
                .ok_or(LexminError::InternalInvariant("split requested but no candidate row"))?
        };
        let mut ineq = tab.row_parameter_ineq(split_row);
        is_strict(&mut ineq);
        debug!("splitting context on row {}", split_row);
        for row in tab.nr_redundant..tab.nr_rows {
            if tab.variable_from_row(row).is_nonneg && tab.sign_of(row) == RowSign::Mixed {
                tab.set_sign_of(row, RowSign::Unknown);
            }
        }
        tab.set_sign_of(split_row, RowSign::NonNegative);
        find_in_positive_half(sol, tab, &ineq)?;

        tab.set_sign_of(split_row, RowSign::NonPositive);
        vector::negate(&mut ineq);
        ineq[0] -= 1;
        sol.context.add_ineq(&ineq)?;
        check_samples(&mut sol.context, &ineq, false);
        return Ok(Step::Continue);
    }

    if tab.rational {
        return Ok(Step::Done);
    }
    let Some((row, flags)) = tab.first_non_integer() else {
        return Ok(Step::Done);
    };
    if flags.parameter {
        if flags.variable {
            // An integral combination with a fractional constant; no integer point exists.
            tab.mark_empty();
            return Ok(Step::Done);
        }
        tab.add_cut(row);
    } else if flags.variable {
        // Only the parameter part is fractional: its floor must be exact. Force the division to
        // an equality in the context, report the strict remainder as unsolvable, and replace the
        // fractional parameter part of the row by the division.
        let div = tab.row_split_div(row);
        let d = get_div(tab, &mut sol.context, &div)?;
        let mut ineq = ineq_for_div(&sol.context, d)?;
        report_no_solution_in_strict(sol, tab, &mut ineq)?;
        vector::negate(&mut ineq);
        sol.context.add_ineq(&ineq)?;
        check_samples(&mut sol.context, &ineq, false);
        tab.set_row_constant_to_div(row, d)?;
    } else {
        add_parametric_cut(tab, row, &mut sol.context)?;
    }

    Ok(Step::Continue)
}

/// Recurse into the part of the context satisfying `ineq`.
///
/// The context is snapshotted and restored; the main tableau is cloned, leaving the caller's
/// tableau untouched for the complementary half.
fn find_in_positive_half(
    sol: &mut Solutions,
    tab: &Tableau,
    ineq: &[BigInt],
) -> Result<(), LexminError> {
    let snapshot = sol.context.snapshot();
    sol.context.push_basis();
    let copy = tab.clone();

    sol.context.add_ineq(ineq)?;
    check_samples(&mut sol.context, ineq, false);
    find_solutions(sol, copy)?;

    sol.context.rollback(snapshot);
    Ok(())
}

/// Report that no solution exists where `ineq` does not hold with equality.
///
/// The strict region `ineq >= 1` is temporarily added to the context, an empty piece is emitted
/// for it, and the context is rolled back. `ineq` is returned unchanged.
fn report_no_solution_in_strict(
    sol: &mut Solutions,
    tab: &mut Tableau,
    ineq: &mut [BigInt],
) -> Result<(), LexminError> {
    let snapshot = sol.context.snapshot();
    sol.context.push_basis();

    ineq[0] -= 1;
    sol.context.add_ineq(ineq)?;
    context_valid_sample_or_feasible(&mut sol.context, ineq, false)?;

    let was_empty = tab.empty;
    tab.empty = true;
    sol.add(tab)?;
    tab.empty = was_empty;

    ineq[0] += 1;
    sol.context.rollback(snapshot);
    Ok(())
}

/// Transfer purely parametric equalities to the context, then solve.
///
/// A main-tableau row holding a parameter or context division is an equality over the context
/// alone. Such rows may not be marked non-negative, so the main loop would ignore them; instead
/// both strict complements are reported as empty, the equality is added to the context and the
/// row is marked redundant.
pub(crate) fn find_all_solutions(sol: &mut Solutions, mut tab: Tableau) -> Result<(), LexminError> {
    let mut row = tab.nr_redundant;
    while row < tab.nr_rows {
        let position = match tab.row_var[row] {
            VarId::Constraint(_) => None,
            VarId::Variable(i) => {
                if i >= tab.nr_params && i < tab.nr_variables - tab.nr_divs {
                    None
                } else if i < tab.nr_params {
                    Some(i)
                } else {
                    Some(i + tab.nr_params - (tab.nr_variables - tab.nr_divs))
                }
            }
        };
        let Some(position) = position else {
            row += 1;
            continue;
        };

        let mut eq = tab.row_parameter_line(row);
        eq[1 + position] = -&tab.mat.row(row)[0];
        vector::normalize(&mut eq);
        debug!("transferring parametric equality of row {} to the context", row);

        report_no_solution_in_strict(sol, &mut tab, &mut eq)?;
        vector::negate(&mut eq);
        report_no_solution_in_strict(sol, &mut tab, &mut eq)?;
        vector::negate(&mut eq);

        sol.context.add_eq(&eq)?;
        context_valid_sample_or_feasible(&mut sol.context, &eq, true)?;
        check_samples(&mut sol.context, &eq, true);

        tab.mark_redundant(row);
        if sol.context.empty {
            break;
        }
        row = tab.nr_redundant;
    }

    find_solutions(sol, tab)
}
