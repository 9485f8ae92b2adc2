//! End-to-end scenarios: small parametric problems with known closed-form optima.
//!
//! Emitted pieces are not compared against expected constraint rows, which would tie the tests to
//! one representation; instead each piece is evaluated at concrete parameter values and checked
//! for membership, disjointness, coverage and the expected optimum.
use num::{BigInt, BigRational, Integer, One, Signed, Zero};

use pilp::data::polyhedron::{BasicMap, BasicSet, Map, Set, Space};
use pilp::{foreach_lexmin, partial_lexopt, LexminError};

fn seq(values: &[i64]) -> Vec<BigInt> {
    values.iter().map(|&v| BigInt::from(v)).collect()
}

fn rational(value: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(value))
}

/// Evaluate the divisions of a constraint system at an integer point, in order.
///
/// `point` holds `[1, dims…]`; the returned vector extends it with one value per division.
fn with_divs(
    point: &[BigInt],
    divs: &[pilp::data::polyhedron::Div],
    nr_columns: usize,
) -> Vec<BigInt> {
    let mut full = point.to_vec();
    full.resize(nr_columns, BigInt::zero());
    let offset = nr_columns - divs.len();
    for (i, div) in divs.iter().enumerate() {
        assert!(!div.denominator.is_zero(), "emitted piece has an unknown division");
        let numerator: BigInt = div.line.iter().zip(&full).map(|(c, v)| c * v).sum();
        full[offset + i] = numerator.div_floor(&div.denominator);
    }

    full
}

fn dot(row: &[BigInt], point: &[BigRational]) -> BigRational {
    row.iter().zip(point).map(|(c, v)| BigRational::from_integer(c.clone()) * v).sum()
}

/// Solve the equalities of a piece for its output values at the given parameter point.
///
/// Returns `None` when the system is inconsistent at the point, i.e. the point lies outside the
/// piece's region.
fn solve_outputs(piece: &BasicMap, params: &[BigInt]) -> Option<Vec<BigRational>> {
    let space = piece.space;
    let nr_domain = space.nr_domain();
    let total = space.total();
    assert_eq!(params.len(), nr_domain);

    let mut integer_point = vec![BigInt::one()];
    integer_point.extend_from_slice(params);
    let full = with_divs(&integer_point, &piece.divs, 1 + total + piece.divs.len());

    // Rows of (coefficients on the outputs, right-hand side) at this point.
    let mut system: Vec<(Vec<BigRational>, BigRational)> = piece
        .eqs
        .iter()
        .map(|eq| {
            let mut constant = BigRational::zero();
            for (j, coefficient) in eq.iter().enumerate() {
                let in_output = j > nr_domain && j <= total;
                if !in_output {
                    constant += BigRational::from_integer(coefficient.clone())
                        * BigRational::from_integer(full[j].clone());
                }
            }
            let coefficients = (0..space.nr_out)
                .map(|o| BigRational::from_integer(eq[1 + nr_domain + o].clone()))
                .collect();
            (coefficients, -constant)
        })
        .collect();

    // Rational Gaussian elimination.
    let mut outputs = vec![None; space.nr_out];
    for o in 0..space.nr_out {
        let pivot = system.iter().position(|(coefficients, _)| !coefficients[o].is_zero());
        let Some(pivot) = pivot else { continue };
        let (coefficients, rhs) = system.swap_remove(pivot);
        let factor = coefficients[o].clone();
        for (other_coefficients, other_rhs) in &mut system {
            if other_coefficients[o].is_zero() {
                continue;
            }
            let scale = other_coefficients[o].clone() / factor.clone();
            for j in 0..space.nr_out {
                let delta = coefficients[j].clone() * scale.clone();
                other_coefficients[j] -= delta;
            }
            *other_rhs -= rhs.clone() * scale.clone();
        }
        // Back-substitution happens implicitly: pivot rows are stored until all are known.
        outputs[o] = Some((coefficients, rhs));
    }

    let mut values = vec![BigRational::zero(); space.nr_out];
    for o in (0..space.nr_out).rev() {
        let (coefficients, rhs) = outputs[o].as_ref().expect("output not determined by the piece");
        let mut rhs = rhs.clone();
        for j in o + 1..space.nr_out {
            rhs -= coefficients[j].clone() * values[j].clone();
        }
        values[o] = rhs / coefficients[o].clone();
    }

    // Consistency of the remaining equality rows decides region membership.
    for (coefficients, rhs) in &system {
        let value: BigRational = (0..space.nr_out)
            .map(|o| coefficients[o].clone() * values[o].clone())
            .sum();
        if &value != rhs {
            return None;
        }
    }

    // All inequalities must hold at (params, outputs, divs).
    let mut point: Vec<BigRational> =
        full.iter().map(|v| BigRational::from_integer(v.clone())).collect();
    for o in 0..space.nr_out {
        point[1 + nr_domain + o] = values[o].clone();
    }
    for ineq in &piece.ineqs {
        if dot(ineq, &point).is_negative() {
            return None;
        }
    }

    Some(values)
}

/// Whether a basic set contains the given integer point.
fn set_contains(bset: &BasicSet, params: &[BigInt]) -> bool {
    let mut point = vec![BigInt::one()];
    point.extend_from_slice(params);
    let full = with_divs(&point, &bset.divs, 1 + bset.nr_dim() + bset.divs.len());
    bset.eqs.iter().all(|eq| eq.iter().zip(&full).map(|(c, v)| c * v).sum::<BigInt>().is_zero())
        && bset.ineqs.iter().all(|ineq| {
            !ineq.iter().zip(&full).map(|(c, v)| c * v).sum::<BigInt>().is_negative()
        })
}

/// The unique piece value at a parameter point, asserting disjointness along the way.
fn value_at(map: &Map, params: &[BigInt]) -> Option<Vec<BigRational>> {
    let mut result = None;
    for piece in &map.pieces {
        if let Some(values) = solve_outputs(piece, params) {
            assert!(result.is_none(), "pieces overlap at {:?}", params);
            result = Some(values);
        }
    }

    result
}

fn empty_contains(empty: &Set, params: &[BigInt]) -> bool {
    empty.pieces.iter().any(|bset| set_contains(bset, params))
}

/// Solve and check the solution against a closed form over a grid of parameter values.
fn check_against(
    bmap: &BasicMap,
    max: bool,
    grid: &[Vec<BigInt>],
    expected: impl Fn(&[BigInt]) -> Option<Vec<BigRational>>,
) -> (Map, Set) {
    let dom = BasicSet::universe(bmap.space.nr_domain());
    let (map, empty) = partial_lexopt(bmap, &dom, true, max).unwrap();
    let empty = empty.unwrap();
    for params in grid {
        let actual = value_at(&map, params);
        let want = expected(params);
        assert_eq!(actual, want, "wrong optimum at {:?}", params);
        // The pieces and the empty region together partition the domain.
        assert_eq!(
            empty_contains(&empty, params),
            want.is_none(),
            "wrong empty region at {:?}",
            params,
        );
    }

    (map, empty)
}

fn grid_1d() -> Vec<Vec<BigInt>> {
    (-6..=6).map(|n| seq(&[n])).collect()
}

fn grid_2d() -> Vec<Vec<BigInt>> {
    let mut grid = Vec::new();
    for a in -4..=4 {
        for b in -4..=4 {
            grid.push(seq(&[a, b]));
        }
    }
    grid
}

#[test]
fn bounded_interval_min() {
    // { n -> x : 0 <= x <= n }, minimizing: x = 0 on n >= 0, empty below.
    let mut bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    bmap.add_inequality(&seq(&[0, 0, 1]));
    bmap.add_inequality(&seq(&[0, 1, -1]));
    check_against(&bmap, false, &grid_1d(), |params| {
        (!params[0].is_negative()).then(|| vec![rational(0)])
    });
}

#[test]
fn bounded_interval_max() {
    // Same relation, maximizing: x = n on n >= 0.
    let mut bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    bmap.add_inequality(&seq(&[0, 0, 1]));
    bmap.add_inequality(&seq(&[0, 1, -1]));
    check_against(&bmap, true, &grid_1d(), |params| {
        (!params[0].is_negative())
            .then(|| vec![BigRational::from_integer(params[0].clone())])
    });
}

#[test]
fn even_parameter_equality() {
    // { n -> x : 2x = n }: x = n/2 where n is even, empty where n is odd.
    let mut bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    bmap.add_equality(&seq(&[0, -1, 2]));
    check_against(&bmap, false, &grid_1d(), |params| {
        params[0].is_multiple_of(&BigInt::from(2)).then(|| {
            vec![BigRational::new(params[0].clone(), BigInt::from(2))]
        })
    });
}

#[test]
fn lexmin_prefers_the_first_output() {
    // { n -> (x, y) : x, y >= 0, x + y = n }: lexmin is (0, n) on n >= 0.
    let mut bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 2 });
    bmap.add_inequality(&seq(&[0, 0, 1, 0]));
    bmap.add_inequality(&seq(&[0, 0, 0, 1]));
    bmap.add_equality(&seq(&[0, -1, 1, 1]));
    check_against(&bmap, false, &grid_1d(), |params| {
        (!params[0].is_negative())
            .then(|| vec![rational(0), BigRational::from_integer(params[0].clone())])
    });
}

#[test]
fn maximum_of_two_parameters() {
    // { (a, b) -> x : x >= a, x >= b }: the minimum is max(a, b), split into two disjoint pieces
    // covering all of parameter space.
    let mut bmap = BasicMap::universe(Space { nr_param: 2, nr_in: 0, nr_out: 1 });
    bmap.add_inequality(&seq(&[0, -1, 0, 1]));
    bmap.add_inequality(&seq(&[0, 0, -1, 1]));
    let (map, _) = check_against(&bmap, false, &grid_2d(), |params| {
        Some(vec![BigRational::from_integer(params[0].clone().max(params[1].clone()))])
    });
    assert_eq!(map.pieces.len(), 2);
}

#[test]
fn rational_optimum_keeps_fractions() {
    // { n -> x : n <= 3x <= n + 2 } over the rationals: x = n/3 everywhere, one piece.
    let mut bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    bmap.rational = true;
    bmap.add_inequality(&seq(&[0, -1, 3]));
    bmap.add_inequality(&seq(&[2, 1, -3]));
    let (map, _) = check_against(&bmap, false, &grid_1d(), |params| {
        Some(vec![BigRational::new(params[0].clone(), BigInt::from(3))])
    });
    assert_eq!(map.pieces.len(), 1);
    assert!(map.pieces[0].rational);
}

#[test]
fn empty_relation_yields_the_whole_domain_as_empty() {
    let mut bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    bmap.add_inequality(&seq(&[-1, 0, 0]));
    let dom = BasicSet::universe(1);
    let (map, empty) = partial_lexopt(&bmap, &dom, true, false).unwrap();
    assert!(map.is_empty());
    let empty = empty.unwrap();
    for params in grid_1d() {
        assert!(empty_contains(&empty, &params));
    }
}

#[test]
fn unbounded_output_is_rejected() {
    // { n -> x : x <= n } has no lower bound on x.
    let mut bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    bmap.add_inequality(&seq(&[0, 1, -1]));
    let dom = BasicSet::universe(1);
    let result = partial_lexopt(&bmap, &dom, false, false);
    assert!(matches!(result, Err(LexminError::InvalidInput(_))));
}

#[test]
fn purely_parametric_equality_restricts_the_domain() {
    // { n -> x : n = 3, 0 <= x <= n }: a single piece at n = 3, empty elsewhere.
    let mut bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    bmap.add_equality(&seq(&[-3, 1, 0]));
    bmap.add_inequality(&seq(&[0, 0, 1]));
    bmap.add_inequality(&seq(&[0, 1, -1]));
    check_against(&bmap, false, &grid_1d(), |params| {
        (params[0] == BigInt::from(3)).then(|| vec![rational(0)])
    });
}

#[test]
fn incompatible_domain_is_rejected() {
    let bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    let dom = BasicSet::universe(2);
    assert!(matches!(
        partial_lexopt(&bmap, &dom, false, false),
        Err(LexminError::InvalidInput(_)),
    ));
}

#[test]
fn maximization_negates_the_negated_problem() {
    // lexmax of x over 0 <= x <= n equals the negation of lexmin of y over -n <= y <= 0.
    let mut maximized = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    maximized.add_inequality(&seq(&[0, 0, 1]));
    maximized.add_inequality(&seq(&[0, 1, -1]));

    let mut negated = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    negated.add_inequality(&seq(&[0, 0, -1]));
    negated.add_inequality(&seq(&[0, 1, 1]));

    let dom = BasicSet::universe(1);
    let (max_map, _) = partial_lexopt(&maximized, &dom, false, true).unwrap();
    let (min_map, _) = partial_lexopt(&negated, &dom, false, false).unwrap();
    for params in grid_1d() {
        let from_max = value_at(&max_map, &params);
        let from_min = value_at(&min_map, &params).map(|v| vec![-v[0].clone()]);
        assert_eq!(from_max, from_min, "negation mismatch at {:?}", params);
    }
}

#[test]
fn resolving_the_result_is_idempotent() {
    // Feeding a solution piece back through the solver returns the same function.
    let mut bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    bmap.add_inequality(&seq(&[0, 0, 1]));
    bmap.add_inequality(&seq(&[0, 1, -1]));
    let dom = BasicSet::universe(1);
    let (map, _) = partial_lexopt(&bmap, &dom, false, false).unwrap();

    for piece in &map.pieces {
        let (again, _) = partial_lexopt(piece, &dom, false, false).unwrap();
        for params in grid_1d() {
            assert_eq!(value_at(&map, &params), value_at(&again, &params));
        }
    }
}

#[test]
fn streaming_interface_reports_affine_pieces() {
    let mut bmap = BasicMap::universe(Space { nr_param: 1, nr_in: 0, nr_out: 1 });
    bmap.add_inequality(&seq(&[0, 0, 1]));
    bmap.add_inequality(&seq(&[0, 1, -1]));

    let mut pieces = Vec::new();
    foreach_lexmin(&bmap, &mut |region, matrix| {
        pieces.push((region, matrix));
        Ok(())
    })
    .unwrap();

    assert!(!pieces.is_empty());
    for (region, matrix) in &pieces {
        assert_eq!(matrix.row(0)[0], BigInt::one());
        assert!(matrix.row(0)[1..].iter().all(BigInt::is_zero));
        // On this problem the minimum is x = 0 wherever a solution exists.
        assert!(matrix.row(1).iter().all(BigInt::is_zero));
        assert_eq!(matrix.nr_columns(), 1 + 1 + region.divs.len());
    }
}
