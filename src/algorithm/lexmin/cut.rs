//! # Cuts and integer divisions
//!
//! Once a branch has pivoted to its rational lexicographic minimum, integrality is enforced row
//! by row with Gomory-style cuts. Rows whose fractionality involves only the problem variables
//! get an ordinary cut; rows whose parameter part is fractional additionally introduce an integer
//! division over the parameters into the context, either inside a parametric cut or by forcing
//! the division to an equality and rewriting the row.
use log::debug;
use num::{BigInt, Integer, One, Zero};

use crate::algorithm::lexmin::tableau::undo::UndoRecord;
use crate::algorithm::lexmin::tableau::{RowSign, Tableau, VarId};
use crate::algorithm::LexminError;
use crate::data::linear_algebra::vector;
use crate::data::polyhedron::Div;

/// Which parts of a row are integral: the constant, the parameter coefficients and the
/// coefficients of the other (variable and constraint) columns.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Integrality {
    pub constant: bool,
    pub parameter: bool,
    pub variable: bool,
}

impl Tableau {
    fn integer_constant(&self, row: usize) -> bool {
        let r = self.mat.row(row);
        r[1].is_multiple_of(&r[0])
    }

    fn integer_parameter(&self, row: usize) -> bool {
        let off = self.off();
        let r = self.mat.row(row);
        (0..self.nr_params + self.nr_divs).all(|i| {
            let var = &self.vars[self.context_var(i)];
            var.is_row || r[off + var.index].is_multiple_of(&r[0])
        })
    }

    fn integer_variable(&self, row: usize) -> bool {
        let off = self.off();
        let r = self.mat.row(row);
        // Dead columns hold eliminated variables with value zero; their leftover coefficients do
        // not make the row fractional.
        (self.nr_dead..self.nr_columns)
            .all(|col| self.col_is_parameter(col) || r[off + col].is_multiple_of(&r[0]))
    }

    /// The first problem variable whose row has a non-integral parametric constant.
    ///
    /// When the constant and parameter parts are both integral the sample value is integral and
    /// no cut is needed, whatever the variable part looks like.
    pub(crate) fn first_non_integer(&self) -> Option<(usize, Integrality)> {
        for i in self.nr_params..self.nr_variables - self.nr_divs {
            if !self.vars[i].is_row {
                continue;
            }
            let row = self.vars[i].index;
            let flags = Integrality {
                constant: self.integer_constant(row),
                parameter: self.integer_parameter(row),
                variable: false,
            };
            if flags.constant && flags.parameter {
                continue;
            }
            let flags = Integrality { variable: self.integer_variable(row), ..flags };
            return Some((row, flags));
        }

        None
    }

    /// Add a non-parametric cut removing the fractional sample value of the given row.
    ///
    /// For a row `m r = f + sum_i a_i y_i` the cut is `-{-f/m} + sum_i {a_i/m} y_i >= 0`. The big
    /// parameter is divisible by everything and is ignored. The cut's current value is negative,
    /// so its sign is recorded as non-positive right away.
    ///
    /// # Return value
    ///
    /// The row holding the new cut.
    pub(crate) fn add_cut(&mut self, row: usize) -> usize {
        let off = self.off();
        let con = self.allocate_con();
        let cut_row = self.cons[con].index;

        let denominator = self.mat.row(row)[0].clone();
        let source = self.mat.row(row).to_vec();
        {
            let r = self.mat.row_mut(cut_row);
            r[0] = denominator.clone();
            r[1] = -(-&source[1]).mod_floor(&denominator);
            if self.big_m {
                r[2] = BigInt::zero();
            }
            for col in self.nr_dead..self.nr_columns {
                r[off + col] = source[off + col].mod_floor(&denominator);
            }
        }

        self.cons[con].is_nonneg = true;
        self.journal.push(UndoRecord::NonNeg { var: VarId::Constraint(con) });
        self.set_sign_of(cut_row, RowSign::NonPositive);

        cut_row
    }

    /// Close a non-parametric tableau over the integers.
    ///
    /// Cuts are added and resolved until the sample point is integral, or until a row shows that
    /// no integer point exists, in which case the tableau is marked empty.
    pub(crate) fn cut_to_integer_lexmin(&mut self) -> Result<(), LexminError> {
        if self.empty {
            return Ok(());
        }
        while let Some((row, flags)) = self.first_non_integer() {
            if flags.variable {
                // An integral combination with a fractional constant has no integer solution.
                self.mark_empty();
                return Ok(());
            }
            self.add_cut(row);
            self.restore_lexmin()?;
            if self.empty {
                break;
            }
        }

        Ok(())
    }

    /// The integer division used by a parametric cut on the given row: with parametric constant
    /// `sum_i a_i y_i`, the division `floor(sum_i {-a_i} y_i)`.
    pub(crate) fn row_parameter_div(&self, row: usize) -> Div {
        let mut line = self.row_parameter_line(row);
        let mut all = vec![self.mat.row(row)[0].clone()];
        all.append(&mut line);
        vector::normalize(&mut all);
        let denominator = all.remove(0);
        vector::negate(&mut all);
        vector::floor_rem(&mut all, &denominator);

        Div { denominator, line: all }
    }

    /// The integer division used to transfer an integrality constraint to the context: with
    /// parametric constant `sum_i a_i y_i`, the division `floor(sum_i {a_i} y_i)`.
    pub(crate) fn row_split_div(&self, row: usize) -> Div {
        let mut line = self.row_parameter_line(row);
        let mut all = vec![self.mat.row(row)[0].clone()];
        all.append(&mut line);
        vector::normalize(&mut all);
        let denominator = all.remove(0);
        vector::floor_rem(&mut all, &denominator);

        Div { denominator, line: all }
    }

    /// Rewrite a row whose division has been forced to an equality in the context.
    ///
    /// The fractional parameter part `sum_i {a_i} y_i` equals the division `d`, so the row's
    /// coefficients are floored and the division column picks up a unit coefficient. All
    /// non-parameter coefficients have been verified integral, so flooring only changes the
    /// parameter part.
    pub(crate) fn set_row_constant_to_div(
        &mut self,
        row: usize,
        div: usize,
    ) -> Result<(), LexminError> {
        let off = self.off();
        let denominator = self.mat.row(row)[0].clone();
        let width = off + self.nr_columns;
        vector::floor_div(&mut self.mat.row_mut(row)[1..width], &denominator);
        self.mat.row_mut(row)[0] = BigInt::one();

        let var = &self.vars[self.nr_variables - self.nr_divs + div];
        if var.is_row {
            return Err(LexminError::InternalInvariant(
                "division of a split cut is basic in the main tableau",
            ));
        }
        let col = var.index;
        self.mat.row_mut(row)[off + col] = BigInt::one();

        Ok(())
    }
}

/// The inequality `e - m d >= 0` bounding division `d = floor(e/m)` of the context from above.
pub(crate) fn ineq_for_div(ctx: &Tableau, div: usize) -> Result<Vec<BigInt>, LexminError> {
    let bset = ctx.bset.as_ref().ok_or(LexminError::InternalInvariant(
        "context tableau lost its basic-set shadow",
    ))?;
    let div_pos = 1 + bset.nr_dim() + div;
    let mut ineq = bset.divs[div].line.clone();
    ineq[div_pos] = -&bset.divs[div].denominator;

    Ok(ineq)
}

/// Add the two canonical constraints of division `div` of the context:
///
/// ```text
///     e - m d >= 0
///     -(e - (m - 1)) + m d >= 0
/// ```
///
/// which together enforce `d = floor(e/m)`.
fn add_div_constraints(ctx: &mut Tableau, div: usize) -> Result<(), LexminError> {
    let upper = ineq_for_div(ctx, div)?;
    ctx.add_ineq(&upper)?;

    let bset = ctx.bset.as_ref().ok_or(LexminError::InternalInvariant(
        "context tableau lost its basic-set shadow",
    ))?;
    let div_pos = 1 + bset.nr_dim() + div;
    let mut lower = bset.divs[div].line.clone();
    vector::negate(&mut lower);
    lower[div_pos] = bset.divs[div].denominator.clone();
    let constant = &lower[0] + &lower[div_pos] - BigInt::one();
    lower[0] = constant;
    ctx.add_ineq(&lower)?;

    Ok(())
}

/// Append a division to both the main tableau and the context.
///
/// The context gains a frozen non-negative variable, its defining constraints, a widened sample
/// store with the division's value per sample, and a basic-set entry. The main tableau only
/// gains the extra variable.
///
/// # Return value
///
/// The index of the new division among the main tableau's divisions.
fn add_div(tab: &mut Tableau, ctx: &mut Tableau, div: &Div) -> Result<usize, LexminError> {
    debug!("introducing div floor(e/{}) into the context", div.denominator);

    let var = ctx.allocate_var();
    ctx.vars[var].is_nonneg = true;
    ctx.vars[var].frozen = true;

    if let Some(samples) = &mut ctx.samples {
        samples.mat.push_column();
        let width = samples.mat.nr_columns();
        for i in 0..samples.mat.nr_rows() {
            let value = vector::inner_product(&div.line, &samples.mat.row(i)[..div.line.len()]);
            samples.mat.row_mut(i)[width - 1] = value.div_floor(&div.denominator);
        }
    }

    let bset = ctx.bset.as_mut().ok_or(LexminError::InternalInvariant(
        "context tableau lost its basic-set shadow",
    ))?;
    let index = bset.add_div(div.clone());
    ctx.journal.push(UndoRecord::AddBsetDiv);
    add_div_constraints(ctx, index)?;

    let var = tab.allocate_var();
    if !ctx.big_m {
        tab.vars[var].is_nonneg = true;
    }
    tab.vars[var].frozen = true;
    tab.nr_divs += 1;

    Ok(tab.nr_divs - 1)
}

/// The index of a context division equal to `div`, creating it if there is none yet.
pub(crate) fn get_div(tab: &mut Tableau, ctx: &mut Tableau, div: &Div) -> Result<usize, LexminError> {
    let existing = ctx
        .bset
        .as_ref()
        .ok_or(LexminError::InternalInvariant("context tableau lost its basic-set shadow"))?
        .find_div(&div.denominator, &div.line);
    match existing {
        Some(index) => Ok(index),
        None => add_div(tab, ctx, div),
    }
}

/// Add a parametric cut removing the fractional sample value of the given row.
///
/// With `a_i` the constant and parameter coefficients and `b_i` the coefficients of the basis
/// columns, the cut is
///
/// ```text
///     -sum_i {-a_i} y_i + sum_i {b_i} x_i + q >= 0,      q = floor(sum_i {-a_i} y_i)
/// ```
///
/// where `q` is looked up or introduced in the context first. When `q` is non-basic the `+ q`
/// lands directly in its column; in the unlikely case that `q` is basic, its row is combined in.
///
/// # Return value
///
/// The row holding the new cut.
pub(crate) fn add_parametric_cut(
    tab: &mut Tableau,
    row: usize,
    ctx: &mut Tableau,
) -> Result<usize, LexminError> {
    let div = tab.row_parameter_div(row);
    let d = get_div(tab, ctx, &div)?;

    let off = tab.off();
    let con = tab.allocate_con();
    let cut_row = tab.cons[con].index;
    let denominator = tab.mat.row(row)[0].clone();
    let source = tab.mat.row(row).to_vec();
    {
        let r = tab.mat.row_mut(cut_row);
        r[0] = denominator.clone();
        r[1] = -(-&source[1]).mod_floor(&denominator);
        if tab.big_m {
            r[2] = BigInt::zero();
        }
    }
    for i in 0..tab.nr_params + tab.nr_divs {
        let var = &tab.vars[tab.context_var(i)];
        if var.is_row {
            continue;
        }
        let col = var.index;
        let value = -(-&source[off + col]).mod_floor(&denominator);
        tab.mat.row_mut(cut_row)[off + col] = value;
    }
    for col in tab.nr_dead..tab.nr_columns {
        if tab.col_is_parameter(col) {
            continue;
        }
        let value = source[off + col].mod_floor(&denominator);
        tab.mat.row_mut(cut_row)[off + col] = value;
    }

    let div_var = &tab.vars[tab.nr_variables - tab.nr_divs + d];
    if div_var.is_row {
        let div_row = div_var.index;
        let (src, dst) = tab.mat.row_and_row_mut(div_row, cut_row);
        let divisor = src[0].gcd(&dst[0]);
        let f_src = &dst[0] / &divisor;
        let f_dst = &src[0] / &divisor;
        vector::combine(&mut dst[1..], &f_dst, &f_src, &src[1..]);
        dst[0] = &f_src * &src[0];
    } else {
        let col = div_var.index;
        tab.mat.row_mut(cut_row)[off + col] = denominator;
    }

    tab.cons[con].is_nonneg = true;
    tab.journal.push(UndoRecord::NonNeg { var: VarId::Constraint(con) });
    tab.set_sign_of(cut_row, RowSign::NonPositive);

    Ok(cut_row)
}

#[cfg(test)]
mod test {
    use num::BigInt;

    use crate::algorithm::lexmin::tableau::Tableau;

    fn seq(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|&v| BigInt::from(v)).collect()
    }

    #[test]
    fn integer_closure_cuts_to_the_integer_optimum() {
        // 2x >= 1, lexmin over the rationals is 1/2; over the integers it is 1.
        let mut tab = Tableau::new(1, true);
        tab.vars[0].is_nonneg = true;
        tab.vars[0].frozen = true;
        tab.add_ineq(&seq(&[-1, 2])).unwrap();
        assert_eq!(tab.mat.row(tab.vars[0].index)[..2], seq(&[2, 1])[..]);

        tab.cut_to_integer_lexmin().unwrap();
        assert!(!tab.empty);
        assert_eq!(tab.sample_value(), seq(&[1, 1]));
    }

    #[test]
    fn integer_closure_detects_infeasibility() {
        // 2x == 1 has no integer solution.
        let mut tab = Tableau::new(1, true);
        tab.vars[0].is_nonneg = true;
        tab.vars[0].frozen = true;
        tab.add_ineq(&seq(&[-1, 2])).unwrap();
        tab.add_ineq(&seq(&[1, -2])).unwrap();
        assert!(!tab.empty);

        tab.cut_to_integer_lexmin().unwrap();
        assert!(tab.empty);
    }

    #[test]
    fn cut_rows_follow_the_gomory_shape() {
        let mut tab = Tableau::new(1, true);
        tab.vars[0].is_nonneg = true;
        tab.vars[0].frozen = true;
        tab.add_ineq(&seq(&[-1, 2])).unwrap();

        let row = tab.vars[0].index;
        let cut = tab.add_cut(row);
        // x = (1 + c0)/2 yields the cut (-1 + c0)/2 >= 0.
        assert_eq!(tab.mat.row(cut)[..3], seq(&[2, -1, 0])[..]);
    }
}
