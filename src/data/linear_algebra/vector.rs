//! # Sequence operations
//!
//! Free functions on slices of `BigInt`, the exact-arithmetic workhorses of the solver. All
//! operations are in place where possible; none of them allocates more than a few scratch values.
use itertools::Itertools;
use num::{BigInt, Integer, One, Signed, Zero};

/// Inner product of two sequences of equal length.
pub fn inner_product(a: &[BigInt], b: &[BigInt]) -> BigInt {
    let mut total = BigInt::zero();
    for (x, y) in a.iter().zip_eq(b) {
        total += x * y;
    }

    total
}

/// Negate every element of the sequence.
pub fn negate(seq: &mut [BigInt]) {
    for value in seq.iter_mut() {
        *value = -&*value;
    }
}

/// Greatest common divisor of the absolute values of all elements.
///
/// # Return value
///
/// Zero if the sequence is empty or all elements are zero.
pub fn gcd(seq: &[BigInt]) -> BigInt {
    let mut result = BigInt::zero();
    for value in seq {
        if !value.is_zero() {
            result = result.gcd(value);
            if result.is_one() {
                break;
            }
        }
    }

    result
}

/// Index of the first non-zero element, if any.
pub fn first_non_zero(seq: &[BigInt]) -> Option<usize> {
    seq.iter().position(|value| !value.is_zero())
}

/// Divide the entire sequence by the gcd of its elements.
///
/// A sequence of zeros is left untouched.
pub fn normalize(seq: &mut [BigInt]) {
    let divisor = gcd(seq);
    if !divisor.is_zero() && !divisor.is_one() {
        scale_down(seq, &divisor);
    }
}

/// Divide every element exactly by a known common divisor.
///
/// # Arguments
///
/// * `divisor`: Must be positive and divide every element.
pub fn scale_down(seq: &mut [BigInt], divisor: &BigInt) {
    debug_assert!(divisor.is_positive());
    debug_assert!(seq.iter().all(|value| value.is_multiple_of(divisor)));

    for value in seq.iter_mut() {
        *value = &*value / divisor;
    }
}

/// Linear combination `dst = f_dst * dst + f_src * src`, elementwise.
pub fn combine(dst: &mut [BigInt], f_dst: &BigInt, f_src: &BigInt, src: &[BigInt]) {
    debug_assert_eq!(dst.len(), src.len());

    for (d, s) in dst.iter_mut().zip_eq(src) {
        *d = &*d * f_dst + s * f_src;
    }
}

/// Replace every element by its non-negative remainder modulo `m`.
pub fn floor_rem(seq: &mut [BigInt], m: &BigInt) {
    debug_assert!(m.is_positive());

    for value in seq.iter_mut() {
        *value = value.mod_floor(m);
    }
}

/// Replace every element by its floored quotient by `m`.
pub fn floor_div(seq: &mut [BigInt], m: &BigInt) {
    debug_assert!(m.is_positive());

    for value in seq.iter_mut() {
        *value = value.div_floor(m);
    }
}

#[cfg(test)]
mod test {
    use num::BigInt;

    use crate::data::linear_algebra::vector::{
        combine, first_non_zero, floor_div, floor_rem, gcd, inner_product, negate, normalize,
    };

    fn seq(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|&v| BigInt::from(v)).collect()
    }

    #[test]
    fn test_inner_product() {
        assert_eq!(inner_product(&seq(&[1, 2, 3]), &seq(&[4, 5, 6])), BigInt::from(32));
        assert_eq!(inner_product(&seq(&[]), &seq(&[])), BigInt::from(0));
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(&seq(&[4, -6, 8])), BigInt::from(2));
        assert_eq!(gcd(&seq(&[0, 0])), BigInt::from(0));
        assert_eq!(gcd(&seq(&[0, 7])), BigInt::from(7));
        assert_eq!(gcd(&seq(&[3, 5])), BigInt::from(1));
    }

    #[test]
    fn test_normalize() {
        let mut v = seq(&[4, -6, 8]);
        normalize(&mut v);
        assert_eq!(v, seq(&[2, -3, 4]));

        let mut v = seq(&[0, 0]);
        normalize(&mut v);
        assert_eq!(v, seq(&[0, 0]));
    }

    #[test]
    fn test_combine() {
        let mut dst = seq(&[1, 2]);
        combine(&mut dst, &BigInt::from(3), &BigInt::from(-2), &seq(&[4, 5]));
        assert_eq!(dst, seq(&[-5, -4]));
    }

    #[test]
    fn test_floor_ops() {
        let mut v = seq(&[7, -7, 6]);
        floor_rem(&mut v, &BigInt::from(3));
        assert_eq!(v, seq(&[1, 2, 0]));

        let mut v = seq(&[7, -7, 6]);
        floor_div(&mut v, &BigInt::from(3));
        assert_eq!(v, seq(&[2, -3, 2]));
    }

    #[test]
    fn test_first_non_zero() {
        assert_eq!(first_non_zero(&seq(&[0, 0, 5, 0])), Some(2));
        assert_eq!(first_non_zero(&seq(&[0, 0])), None);
        assert_eq!(negate_roundtrip(&seq(&[1, -2])), seq(&[1, -2]));
    }

    fn negate_roundtrip(values: &[BigInt]) -> Vec<BigInt> {
        let mut v = values.to_vec();
        negate(&mut v);
        negate(&mut v);
        v
    }
}
