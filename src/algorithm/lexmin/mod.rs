//! # Parametric lexicographic optimization
//!
//! Computes the lexicographic minimum (or maximum) of the output dimensions of a basic relation,
//! as a piecewise-affine function of its parameters and input dimensions, following Feautrier's
//! parametric integer programming method: a dual-simplex search on a main tableau over both
//! parameters and variables, coordinated with a context tableau over the parameters alone, and
//! refined with Gomory-style cuts until the optimum is integral.
//!
//! The entry points are [`partial_lexopt`], which collects the result into a disjoint relation,
//! and [`foreach_lexopt`], which streams `(region, affine matrix)` pairs to a callback.
use log::debug;
use num::Zero;

use crate::algorithm::lexmin::context::{context_is_feasible, detect_nonnegative_parameters};
use crate::algorithm::lexmin::driver::{find_all_solutions, Solutions};
use crate::algorithm::lexmin::sink::{CallbackCollector, RelationCollector, Sink};
use crate::algorithm::lexmin::tableau::{Samples, Tableau};
use crate::algorithm::LexminError;
use crate::data::linear_algebra::vector;
use crate::data::polyhedron::{BasicMap, BasicSet, Div, Map, Set};

mod context;
mod cut;
mod driver;
mod pivot;
mod sink;
pub(crate) mod tableau;

pub use sink::PieceCallback;

/// Construct the main tableau for a lexicographic optimization of `bmap`.
///
/// With a domain, the tableau is parametric: the domain's dimensions become the shared parameter
/// block, its divisions the shared division block, and row signs are tracked. The big parameter
/// is always used. In `max` mode every constraint enters with negated problem-variable
/// coefficients, turning the tableau variables into `x' = M - x`.
fn tab_for_lexmin(
    bmap: &BasicMap,
    dom: Option<&BasicSet>,
    max: bool,
) -> Result<Tableau, LexminError> {
    let mut tab = Tableau::new(bmap.total_dim(), true);
    tab.rational = bmap.rational;
    if let Some(dom) = dom {
        tab.nr_params = dom.nr_dim();
        tab.nr_divs = dom.divs.len();
        tab.row_signs = Some(Vec::new());
    }
    if bmap.is_trivially_empty() {
        tab.mark_empty();
        return Ok(tab);
    }
    for i in tab.nr_params..tab.nr_variables - tab.nr_divs {
        tab.vars[i].is_nonneg = true;
        tab.vars[i].frozen = true;
    }

    let from = 1 + tab.nr_params;
    let until = 1 + tab.nr_variables - tab.nr_divs;
    let orient = move |line: &[num::BigInt]| {
        let mut line = line.to_vec();
        if max {
            vector::negate(&mut line[from..until]);
        }
        line
    };
    for eq in &bmap.eqs {
        tab.add_valid_eq(&orient(eq))?;
        if tab.empty {
            return Ok(tab);
        }
    }
    for ineq in &bmap.ineqs {
        tab.add_ineq(&orient(ineq))?;
        if tab.empty {
            return Ok(tab);
        }
    }

    Ok(tab)
}

/// Construct the context tableau for a domain.
///
/// The tableau covers the domain's dimensions and divisions with its own big parameter; the
/// domain itself becomes the basic-set shadow and an empty sample store is attached. The shadow
/// is attached only after the domain's constraints have been added, so they are not duplicated.
fn context_tab_for_lexmin(dom: &BasicSet) -> Result<Tableau, LexminError> {
    let nr_variables = dom.total_dim();
    let mut tab = Tableau::new(nr_variables, true);
    for i in 0..nr_variables {
        tab.vars[i].is_nonneg = true;
        tab.vars[i].frozen = true;
    }
    for eq in &dom.eqs {
        tab.add_valid_eq(eq)?;
        if tab.empty {
            break;
        }
    }
    if !tab.empty {
        for ineq in &dom.ineqs {
            tab.add_ineq(ineq)?;
            if tab.empty {
                break;
            }
        }
    }
    tab.bset = Some(dom.clone());
    tab.samples = Some(Samples::new(1 + nr_variables));

    Ok(tab)
}

/// Whether division `div` of `dom` also occurs in `bmap`, and where.
///
/// Only divisions defined purely over the shared dimensions can match.
fn find_context_div(bmap: &BasicMap, dom: &BasicSet, div: usize) -> Option<usize> {
    let shared = 1 + dom.nr_dim();
    let candidate = &dom.divs[div];
    if candidate.denominator.is_zero() {
        return None;
    }
    if vector::first_non_zero(&candidate.line[shared..]).is_some() {
        return None;
    }
    bmap.divs.iter().position(|existing| {
        !existing.denominator.is_zero()
            && vector::first_non_zero(&existing.line[shared..]).is_none()
            && existing.denominator == candidate.denominator
            && existing.line[..shared] == candidate.line[..shared]
    })
}

/// Make the divisions of `bmap` end with position-aligned copies of the domain's divisions.
///
/// The first `nr_params` and last `nr_divs` variables of the main tableau must line up with the
/// context's variables; divisions of the domain that `bmap` lacks are appended as unknown
/// divisions in the domain's order.
fn align_context_divs(bmap: &mut BasicMap, dom: &BasicSet) {
    let common = (0..dom.divs.len())
        .filter(|&i| find_context_div(bmap, dom, i).is_some())
        .count();
    let other = bmap.divs.len() - common;
    for i in 0..dom.divs.len() {
        let position = match find_context_div(bmap, dom, i) {
            Some(position) => position,
            None => bmap.add_div(Div {
                denominator: num::BigInt::zero(),
                line: vec![num::BigInt::zero(); 1 + bmap.total_dim()],
            }),
        };
        if position != other + i {
            bmap.swap_divs(position, other + i);
        }
    }
}

/// Prepare the solve: make implicit equalities explicit and line the divisions up.
fn preprocess(bmap: &BasicMap, dom: &BasicSet) -> Result<(BasicMap, BasicSet), LexminError> {
    if dom.nr_dim() != bmap.space.nr_domain() {
        return Err(LexminError::InvalidInput(format!(
            "domain has {} dimensions, the relation's domain {}",
            dom.nr_dim(),
            bmap.space.nr_domain(),
        )));
    }
    let mut bmap = bmap.clone();
    let mut dom = dom.clone();
    bmap.detect_equalities();
    if !dom.divs.is_empty() {
        dom.order_divs();
        align_context_divs(&mut bmap, &dom);
    }

    Ok((bmap, dom))
}

/// Set up the shared context and run the driver over the main tableau.
fn solve(sol: &mut Solutions, bmap: &BasicMap, dom: &BasicSet, max: bool) -> Result<(), LexminError> {
    let context_empty = sol
        .context
        .bset
        .as_ref()
        .map_or(true, BasicSet::is_trivially_empty);
    if context_empty {
        return Ok(());
    }
    let mut tab = tab_for_lexmin(bmap, Some(dom), max)?;
    if tab.empty {
        return sol.add(&tab);
    }
    detect_nonnegative_parameters(&mut tab, &mut sol.context)?;
    find_all_solutions(sol, tab)
}

/// Compute the lexicographic optimum of `bmap` over the domain `dom`.
///
/// The result is a disjoint relation whose pieces together give, for every point of `dom` where
/// `bmap` has a solution, the lexicographically smallest (or largest, when `max` is set) integer
/// point of `bmap`. With `track_empty`, the parts of `dom` without any solution are returned as
/// well. A relation flagged rational is optimized over the rationals instead.
///
/// # Errors
///
/// [`LexminError::InvalidInput`] when the domain is incompatible with the relation or an output
/// dimension is unbounded.
pub fn partial_lexopt(
    bmap: &BasicMap,
    dom: &BasicSet,
    track_empty: bool,
    max: bool,
) -> Result<(Map, Option<Set>), LexminError> {
    debug!(
        "partial lexopt: {} eqs, {} ineqs, {} divs, max={}",
        bmap.eqs.len(),
        bmap.ineqs.len(),
        bmap.divs.len(),
        max,
    );
    let (bmap, dom) = preprocess(bmap, dom)?;

    let mut context = context_tab_for_lexmin(&dom)?;
    context.restore_lexmin()?;
    context_is_feasible(&mut context)?;
    let mut sol = Solutions {
        context,
        sink: Sink::Relation(RelationCollector::new(bmap.space, track_empty, max)),
    };

    solve(&mut sol, &bmap, &dom, max)?;

    match sol.sink {
        Sink::Relation(collector) => Ok((collector.map, collector.empty)),
        Sink::Callback(_) => Err(LexminError::InternalInvariant("sink changed kind mid-solve")),
    }
}

/// Stream the lexicographic optimum of `bmap` over its full domain to a callback.
///
/// Each call receives one region of parameter space and the matrix of affine expressions of the
/// outputs on that region; see [`PieceCallback`]. Regions without a solution are not reported.
pub fn foreach_lexopt(
    bmap: &BasicMap,
    max: bool,
    callback: &mut PieceCallback<'_>,
) -> Result<(), LexminError> {
    debug!(
        "foreach lexopt: {} eqs, {} ineqs, {} divs, max={}",
        bmap.eqs.len(),
        bmap.ineqs.len(),
        bmap.divs.len(),
        max,
    );
    let dom = BasicSet::universe(bmap.space.nr_domain());
    let (bmap, dom) = preprocess(bmap, &dom)?;

    let mut context = context_tab_for_lexmin(&dom)?;
    context.restore_lexmin()?;
    context_is_feasible(&mut context)?;
    let mut sol = Solutions {
        context,
        sink: Sink::Callback(CallbackCollector { callback, max }),
    };

    solve(&mut sol, &bmap, &dom, max)
}

/// [`foreach_lexopt`] in the minimizing direction.
pub fn foreach_lexmin(bmap: &BasicMap, callback: &mut PieceCallback<'_>) -> Result<(), LexminError> {
    foreach_lexopt(bmap, false, callback)
}

/// [`foreach_lexopt`] in the maximizing direction.
pub fn foreach_lexmax(bmap: &BasicMap, callback: &mut PieceCallback<'_>) -> Result<(), LexminError> {
    foreach_lexopt(bmap, true, callback)
}
