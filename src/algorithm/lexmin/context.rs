//! # Context management
//!
//! The context is the part of parameter space a branch of the search currently assumes. It is
//! held redundantly: as a tableau (for fast feasibility tests and minimization) and as a
//! basic-set shadow (for exact bookkeeping and eventual output), kept in sync through the undo
//! journal. The routines here classify main-tableau rows against the context, test context
//! feasibility over the integers, maintain integer sample points and select split rows.
use log::debug;
use num::{BigInt, Integer, One, Signed, Zero};

use crate::algorithm::lexmin::tableau::{RowSign, Tableau};
use crate::algorithm::LexminError;
use crate::data::linear_algebra::vector;

impl Tableau {
    /// Position of a context variable (parameter or div) within this tableau's variables.
    pub(crate) fn context_var(&self, i: usize) -> usize {
        debug_assert!(i < self.nr_params + self.nr_divs);

        if i < self.nr_params {
            i
        } else {
            i - self.nr_params + self.nr_variables - self.nr_divs
        }
    }

    /// The parametric constant of a row: its constant term plus the coefficients of every
    /// context-shared variable, the big-M coefficient excluded.
    pub(crate) fn row_parameter_line(&self, row: usize) -> Vec<BigInt> {
        let off = self.off();
        let mut line = Vec::with_capacity(1 + self.nr_params + self.nr_divs);
        line.push(self.mat.row(row)[1].clone());
        for i in 0..self.nr_params + self.nr_divs {
            let var = &self.vars[self.context_var(i)];
            if var.is_row {
                line.push(BigInt::zero());
            } else {
                line.push(self.mat.row(row)[off + var.index].clone());
            }
        }

        line
    }

    /// Whether two rows have identical parametric constants.
    ///
    /// The big-M coefficients must match as well: the actual constants only agree when they do.
    pub(crate) fn identical_parameter_line(&self, row1: usize, row2: usize) -> bool {
        let off = self.off();
        let r1 = self.mat.row(row1);
        let r2 = self.mat.row(row2);
        if r1[1] != r2[1] {
            return false;
        }
        if self.big_m && r1[2] != r2[2] {
            return false;
        }
        (0..self.nr_params + self.nr_divs).all(|i| {
            let var = &self.vars[self.context_var(i)];
            var.is_row || r1[off + var.index] == r2[off + var.index]
        })
    }

    /// The parametric constant as a normalized inequality over the context variables.
    ///
    /// Only called when the big-M coefficient of the row is zero.
    pub(crate) fn row_parameter_ineq(&self, row: usize) -> Vec<BigInt> {
        let mut ineq = self.row_parameter_line(row);
        vector::normalize(&mut ineq);

        ineq
    }

    /// Whether the parametric constant is negative for every context point, judged locally.
    ///
    /// A decisive big-M coefficient settles it; otherwise the constant must be negative and every
    /// non-zero parameter coefficient must be non-positive and belong to a parameter known to be
    /// non-negative.
    pub(crate) fn is_obviously_negative(&self, row: usize) -> bool {
        let r = self.mat.row(row);
        if self.big_m {
            if r[2].is_positive() {
                return false;
            }
            if r[2].is_negative() {
                return true;
            }
        }
        if !r[1].is_negative() {
            return false;
        }
        self.parameter_coefficients_all(row, |coefficient| !coefficient.is_positive())
    }

    /// Whether the parametric constant is non-negative for every context point, judged locally.
    pub(crate) fn is_obviously_nonnegative(&self, row: usize) -> bool {
        let r = self.mat.row(row);
        if self.big_m {
            if r[2].is_positive() {
                return true;
            }
            if r[2].is_negative() {
                return false;
            }
        }
        if r[1].is_negative() {
            return false;
        }
        self.parameter_coefficients_all(row, |coefficient| !coefficient.is_negative())
    }

    /// Whether every non-zero context coefficient of the row satisfies `check` and belongs to a
    /// non-negative parameter. Eliminated parameters are ignored.
    fn parameter_coefficients_all(&self, row: usize, check: impl Fn(&BigInt) -> bool) -> bool {
        let off = self.off();
        (0..self.nr_params + self.nr_divs).all(|i| {
            let var = &self.vars[self.context_var(i)];
            if var.is_row {
                return true;
            }
            let coefficient = &self.mat.row(row)[off + var.index];
            coefficient.is_zero() || (var.is_nonneg && check(coefficient))
        })
    }

    /// Whether no pivot can be performed on the row: every live non-parameter column has a
    /// non-positive coefficient.
    pub(crate) fn is_critical(&self, row: usize) -> bool {
        let off = self.off();
        (self.nr_dead..self.nr_columns).all(|col| {
            self.col_is_parameter(col) || !self.mat.row(row)[off + col].is_positive()
        })
    }
}

/// Whether the inequality can never be satisfied with equality by integers, i.e. the gcd of its
/// coefficients does not divide its constant. The constraint is scaled down by that gcd either
/// way, flooring the constant.
pub(crate) fn is_strict(ineq: &mut [BigInt]) -> bool {
    let divisor = vector::gcd(&ineq[1..]);
    if divisor.is_zero() || divisor.is_one() {
        return false;
    }
    let strict = !ineq[0].is_multiple_of(&divisor);
    ineq[0] = ineq[0].div_floor(&divisor);
    vector::scale_down(&mut ineq[1..], &divisor);

    strict
}

/// Decide whether the context has any integer point.
///
/// Works on a snapshot: non-parametric cuts close the context tableau over the integers; if a
/// finite integer point is found it is recorded as a new sample before rolling back.
pub(crate) fn context_is_feasible(ctx: &mut Tableau) -> Result<bool, LexminError> {
    let snapshot = ctx.snapshot();
    ctx.push_basis();

    ctx.cut_to_integer_lexmin()?;
    if !ctx.empty && ctx.sample_is_finite() {
        let sample = ctx.sample_value();
        let samples = ctx.samples.as_mut().ok_or(LexminError::InternalInvariant(
            "context tableau lost its sample store",
        ))?;
        debug_assert_eq!(sample.len(), samples.mat.nr_columns());
        samples.mat.push_row(sample);
    }
    let feasible = !ctx.empty;
    ctx.rollback(snapshot);

    Ok(feasible)
}

/// Check the live samples against an inequality (an equality when `eq` is set) before falling
/// back to the full integer feasibility test.
pub(crate) fn context_valid_sample_or_feasible(
    ctx: &mut Tableau,
    constraint: &[BigInt],
    eq: bool,
) -> Result<bool, LexminError> {
    let samples = ctx.samples.as_ref().ok_or(LexminError::InternalInvariant(
        "context tableau lost its sample store",
    ))?;
    let satisfied = (samples.nr_outside..samples.nr_samples())
        .any(|i| satisfies(constraint, samples.mat.row(i), eq));
    if satisfied {
        return Ok(true);
    }

    context_is_feasible(ctx)
}

/// Drop every live sample that fails the constraint (an equality when `eq` is set).
pub(crate) fn check_samples(ctx: &mut Tableau, constraint: &[BigInt], eq: bool) {
    let failing: Vec<usize> = match &ctx.samples {
        Some(samples) => {
            debug_assert_eq!(constraint.len(), samples.mat.nr_columns());
            (samples.nr_outside..samples.nr_samples())
                .filter(|&i| !satisfies(constraint, samples.mat.row(i), eq))
                .collect()
        }
        None => return,
    };
    // Dropping position i only swaps within [nr_outside, i], so later positions keep their rows.
    for i in failing {
        ctx.drop_sample(i);
    }
}

/// Whether a sample satisfies an inequality (an equality when `eq` is set).
fn satisfies(constraint: &[BigInt], sample: &[BigInt], eq: bool) -> bool {
    let value = vector::inner_product(constraint, sample);
    if eq {
        value.is_zero()
    } else {
        !value.is_negative()
    }
}

/// Test whether constraint `ineq` of the context can rationally reach a value of `-1` or below.
///
/// Works on a snapshot of the context; the tableau is unchanged on return.
fn can_reach_minus_one(ctx: &mut Tableau, ineq: &[BigInt]) -> Result<bool, LexminError> {
    let snapshot = ctx.snapshot();
    ctx.push_basis();
    let mut negated = ineq.to_vec();
    vector::negate(&mut negated);
    negated[0] -= 1;
    ctx.add_ineq(&negated)?;
    let feasible = !ctx.empty;
    ctx.rollback(snapshot);

    Ok(feasible)
}

/// Determine the sign of a main-tableau row over the current context.
///
/// Cheap criteria first: the cached sign, obvious non-negativity, or another row with the same
/// parametric constant. Then the context samples provide an initial guess, firmed up by at most
/// two feasibility tests on the context.
///
/// Zero values are counted as non-negative when the row is critical (no pivot column exists) or
/// the inequality is strict over the integers; in both cases a zero must force a split rather
/// than disappear into the non-positive case.
pub(crate) fn row_sign(tab: &Tableau, ctx: &mut Tableau, row: usize) -> Result<RowSign, LexminError> {
    if tab.sign_of(row) != RowSign::Unknown {
        return Ok(tab.sign_of(row));
    }
    if tab.is_obviously_nonnegative(row) {
        return Ok(RowSign::NonNegative);
    }
    for row2 in tab.nr_redundant..tab.nr_rows {
        if tab.sign_of(row2) != RowSign::Unknown && tab.identical_parameter_line(row, row2) {
            return Ok(tab.sign_of(row2));
        }
    }

    let critical = tab.is_critical(row);
    let mut ineq = tab.row_parameter_ineq(row);
    let strict = is_strict(&mut ineq);

    let mut result = RowSign::Unknown;
    {
        let samples = ctx.samples.as_ref().ok_or(LexminError::InternalInvariant(
            "context tableau lost its sample store",
        ))?;
        debug_assert_eq!(ineq.len(), samples.mat.nr_columns());
        for i in samples.nr_outside..samples.nr_samples() {
            let value = vector::inner_product(samples.mat.row(i), &ineq);
            if value.is_positive() || (value.is_zero() && (critical || strict)) {
                if result == RowSign::Unknown {
                    result = RowSign::NonNegative;
                }
                if result == RowSign::NonPositive {
                    result = RowSign::Mixed;
                }
            }
            if value.is_negative() {
                if result == RowSign::Unknown {
                    result = RowSign::NonPositive;
                }
                if result == RowSign::NonNegative {
                    result = RowSign::Mixed;
                }
            }
            if result == RowSign::Mixed {
                break;
            }
        }
    }

    if result == RowSign::Unknown || result == RowSign::NonNegative {
        // Can the constant still go negative somewhere in the context?
        let snapshot = ctx.snapshot();
        ctx.push_basis();
        let mut negated = ineq.clone();
        vector::negate(&mut negated);
        negated[0] -= 1;
        ctx.add_ineq(&negated)?;
        let feasible = context_is_feasible(ctx)?;
        ctx.rollback(snapshot);
        result = match (feasible, result) {
            (false, _) => RowSign::NonNegative,
            (true, RowSign::Unknown) => RowSign::NonPositive,
            (true, _) => RowSign::Mixed,
        };
    }

    if result == RowSign::NonPositive {
        // Can it still go positive (or reach zero, for critical and strict rows)?
        let snapshot = ctx.snapshot();
        ctx.push_basis();
        let mut positive = ineq.clone();
        if !critical && !strict {
            positive[0] -= 1;
        }
        ctx.add_ineq(&positive)?;
        if context_is_feasible(ctx)? {
            result = RowSign::Mixed;
        }
        ctx.rollback(snapshot);
    }

    Ok(result)
}

/// Among the rows classified [`RowSign::Mixed`], pick the best one to split the context on.
///
/// Splitting on a row whose inequality renders many other candidates redundant keeps both sides
/// of the split simple, so the row neutralizing the most other candidates wins; the earliest such
/// row on a tie.
///
/// TODO(ENHANCEMENT): Also weigh the number of candidates a row conflicts with, not only the
///  number it neutralizes.
pub(crate) fn best_split(tab: &Tableau, ctx: &mut Tableau) -> Result<Option<usize>, LexminError> {
    let snapshot = ctx.snapshot();
    ctx.push_basis();

    let mut best: Option<(usize, usize)> = None;
    for split in tab.nr_redundant..tab.nr_rows {
        if !tab.variable_from_row(split).is_nonneg || tab.sign_of(split) != RowSign::Mixed {
            continue;
        }
        let inner = ctx.snapshot();
        ctx.push_basis();
        ctx.add_ineq(&tab.row_parameter_ineq(split))?;

        let mut neutralized = 0;
        for row in tab.nr_redundant..tab.nr_rows {
            if row == split
                || !tab.variable_from_row(row).is_nonneg
                || tab.sign_of(row) != RowSign::Mixed
            {
                continue;
            }
            if !can_reach_minus_one(ctx, &tab.row_parameter_ineq(row))? {
                neutralized += 1;
            }
        }
        ctx.rollback(inner);

        if best.map_or(true, |(_, count)| neutralized > count) {
            best = Some((split, neutralized));
        }
    }
    ctx.rollback(snapshot);

    debug!("best split: {:?}", best);
    Ok(best.map(|(row, _)| row))
}

/// Mark main-tableau variables whose context counterpart cannot be negative.
///
/// The non-negativity knowledge sharpens the obvious-sign tests. When every context variable is
/// non-negative, the context's big parameter has no work left to do and its column is dropped.
pub(crate) fn detect_nonnegative_parameters(
    tab: &mut Tableau,
    ctx: &mut Tableau,
) -> Result<(), LexminError> {
    if ctx.nr_variables == 0 || ctx.empty {
        return Ok(());
    }

    let snapshot = ctx.snapshot();
    ctx.push_basis();
    let mut nr_nonnegative = 0;
    for i in 0..ctx.nr_variables {
        let mut ineq = vec![BigInt::zero(); 1 + ctx.nr_variables];
        ineq[1 + i] = BigInt::one();
        if !can_reach_minus_one(ctx, &ineq)? {
            let idx = tab.context_var(i);
            tab.vars[idx].is_nonneg = true;
            nr_nonnegative += 1;
        }
    }
    ctx.rollback(snapshot);

    if nr_nonnegative == ctx.nr_variables {
        debug!("all {} context variables non-negative; dropping context big-M", nr_nonnegative);
        ctx.drop_big_m();
    }

    Ok(())
}
