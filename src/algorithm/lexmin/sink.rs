//! # Solution sinks
//!
//! Whenever the driver terminates a branch, the pair (context, main tableau) describes either an
//! empty region or one piece of the piecewise-affine optimum. A sink turns that pair into output:
//! the relation collector builds basic maps and accumulates a disjoint relation, the callback
//! collector streams `(region, affine matrix)` pairs to user code.
use log::debug;
use num::{BigInt, Integer, One, Zero};

use crate::algorithm::lexmin::tableau::Tableau;
use crate::algorithm::LexminError;
use crate::data::linear_algebra::{vector, Matrix};
use crate::data::polyhedron::{BasicMap, BasicSet, Div, Map, Set, Space};

/// A callback receiving one piece of the solution: the region of parameter space and a matrix of
/// `1 + nr_out` rows by `1 + nr_dim + nr_div` columns whose row 0 is `(1, 0, …)` and whose row
/// `1 + i` holds the affine expression of output `i` over the region's dimensions and divisions.
pub type PieceCallback<'a> = dyn FnMut(BasicSet, Matrix) -> Result<(), LexminError> + 'a;

/// Emission of terminated branches; see [`SolutionSink`] for the operation both variants share.
pub(crate) enum Sink<'a> {
    Relation(RelationCollector),
    Callback(CallbackCollector<'a>),
}

/// The operation a sink implements. Releasing a sink needs no counterpart of the constructor;
/// dropping it is enough.
pub(crate) trait SolutionSink {
    /// Record the branch that just terminated with main tableau `tab` under context `ctx`.
    fn add(&mut self, ctx: &Tableau, tab: &Tableau) -> Result<(), LexminError>;
}

impl SolutionSink for Sink<'_> {
    fn add(&mut self, ctx: &Tableau, tab: &Tableau) -> Result<(), LexminError> {
        match self {
            Sink::Relation(collector) => collector.add(ctx, tab),
            Sink::Callback(collector) => collector.add(ctx, tab),
        }
    }
}

/// Collects pieces into a disjoint relation, and optionally the empty regions into a set.
pub(crate) struct RelationCollector {
    pub map: Map,
    pub empty: Option<Set>,
    pub max: bool,
}

impl RelationCollector {
    pub fn new(space: Space, track_empty: bool, max: bool) -> Self {
        Self {
            map: Map::empty(space),
            empty: track_empty.then(|| Set::empty(space.nr_domain())),
            max,
        }
    }

    fn add_empty(&mut self, ctx: &Tableau) -> Result<(), LexminError> {
        let Some(empty) = &mut self.empty else {
            return Ok(());
        };
        let bset = context_bset(ctx)?;
        let mut region = bset.clone();
        region.simplify();
        debug!("empty region piece recorded");
        empty.pieces.push(region);

        Ok(())
    }
}

impl SolutionSink for RelationCollector {
    /// Build a basic map for the piece: the context's divisions, equalities and inequalities are
    /// copied into the map's space, and every output variable contributes one equality. An output
    /// in a row satisfies `d x = c + d_M M + e(y)`; the big parameter must cancel (`d_M = d`), and
    /// the equality `c + e(y) ∓ d x = 0` is added with the sign depending on the optimization
    /// direction. Outputs that do not cancel the big parameter are unbounded and rejected.
    fn add(&mut self, ctx: &Tableau, tab: &Tableau) -> Result<(), LexminError> {
        if tab.empty {
            return self.add_empty(ctx);
        }

        let bset = context_bset(ctx)?;
        let space = self.map.space;
        let total = space.total();
        let nr_dim = bset.nr_dim();
        let nr_div = bset.divs.len();
        debug_assert_eq!(nr_dim, tab.nr_params);
        debug_assert_eq!(nr_div, tab.nr_divs);

        let mut piece = BasicMap::universe(space);
        piece.rational = tab.rational;
        for (i, div) in bset.divs.iter().enumerate() {
            let line = remap(&div.line, nr_dim, total, nr_div, i);
            piece.divs.push(Div { denominator: div.denominator.clone(), line });
        }
        for eq in &bset.eqs {
            piece.eqs.push(remap(eq, nr_dim, total, nr_div, nr_div));
        }
        for ineq in &bset.ineqs {
            piece.ineqs.push(remap(ineq, nr_dim, total, nr_div, nr_div));
        }

        for i in tab.nr_params..total {
            piece.eqs.push(output_equality(tab, i, total, nr_div, self.max)?);
        }

        piece.finalize();
        debug!("solution piece recorded ({} divs)", nr_div);
        self.map.pieces.push(piece);

        Ok(())
    }
}

/// Streams pieces to a caller-provided function.
pub(crate) struct CallbackCollector<'a> {
    pub callback: &'a mut PieceCallback<'a>,
    pub max: bool,
}

impl SolutionSink for CallbackCollector<'_> {
    /// Empty regions are not reported. The emitted region is a plain copy of the context's basic
    /// set: simplification could reorder or drop divisions the matrix columns refer to.
    fn add(&mut self, ctx: &Tableau, tab: &Tableau) -> Result<(), LexminError> {
        if tab.empty {
            return Ok(());
        }

        let bset = context_bset(ctx)?;
        let nr_out = tab.nr_variables - tab.nr_params - tab.nr_divs;
        let nr_columns = 1 + tab.nr_params + tab.nr_divs;
        let off = tab.off();

        let mut first = vec![BigInt::zero(); nr_columns];
        first[0] = BigInt::one();
        let mut mat = Matrix::from_rows(vec![first], nr_columns);
        for i in 0..nr_out {
            let var = &tab.vars[tab.nr_params + i];
            let mut line = vec![BigInt::zero(); nr_columns];
            if !var.is_row {
                if tab.big_m {
                    return Err(unbounded_output(tab.nr_params + i));
                }
            } else {
                let row = tab.mat.row(var.index);
                if tab.big_m && row[2] != row[0] {
                    return Err(unbounded_output(tab.nr_params + i));
                }
                line[0] = row[1].clone();
                for j in 0..tab.nr_params + tab.nr_divs {
                    let shared = &tab.vars[tab.context_var(j)];
                    if !shared.is_row {
                        line[1 + j] = row[off + shared.index].clone();
                    }
                }
                if !row[0].is_one() {
                    debug_assert!(
                        line.iter().all(|value| value.is_multiple_of(&row[0])),
                        "affine output is not integral",
                    );
                    vector::scale_down(&mut line, &row[0]);
                }
                if self.max {
                    vector::negate(&mut line);
                }
            }
            mat.push_row(line);
        }

        debug!("streaming solution piece");
        (self.callback)(bset.clone(), mat)
    }
}

fn context_bset(ctx: &Tableau) -> Result<&BasicSet, LexminError> {
    ctx.bset
        .as_ref()
        .ok_or(LexminError::InternalInvariant("context tableau lost its basic-set shadow"))
}

fn unbounded_output(variable: usize) -> LexminError {
    LexminError::InvalidInput(format!("output variable {} is unbounded", variable))
}

/// Widen a context row `[cst, dims…, divs…]` to map width `[cst, dims…, 0 (other), divs…]`,
/// keeping only the first `nr_copy_divs` division coefficients.
fn remap(
    row: &[BigInt],
    nr_dim: usize,
    total: usize,
    nr_div: usize,
    nr_copy_divs: usize,
) -> Vec<BigInt> {
    let mut line = vec![BigInt::zero(); 1 + total + nr_div];
    line[..1 + nr_dim].clone_from_slice(&row[..1 + nr_dim]);
    for j in 0..nr_copy_divs {
        line[1 + total + j] = row[1 + nr_dim + j].clone();
    }

    line
}

/// The equality tying output variable `i` of the tableau to its affine expression.
fn output_equality(
    tab: &Tableau,
    i: usize,
    total: usize,
    nr_div: usize,
    max: bool,
) -> Result<Vec<BigInt>, LexminError> {
    let off = tab.off();
    let mut eq = vec![BigInt::zero(); 1 + total + nr_div];
    let var = &tab.vars[i];
    if !var.is_row {
        // The variable kept its initial value of -M: the optimum is unbounded below (or above).
        if tab.big_m {
            return Err(unbounded_output(i));
        }
        eq[1 + i] = if max { BigInt::one() } else { -BigInt::one() };
        return Ok(eq);
    }

    let row = tab.mat.row(var.index);
    if tab.big_m && row[2] != row[0] {
        return Err(unbounded_output(i));
    }
    eq[0] = row[1].clone();
    for j in 0..tab.nr_params + tab.nr_divs {
        let shared = &tab.vars[tab.context_var(j)];
        if !shared.is_row {
            let position = if j < tab.nr_params { 1 + j } else { 1 + total + j - tab.nr_params };
            eq[position] = row[off + shared.index].clone();
        }
    }
    eq[1 + i] = if max { row[0].clone() } else { -&row[0] };

    Ok(eq)
}
