//! # Extended rational values
//!
//! An arbitrary-precision rational extended with three special values: not-a-number, positive
//! infinity and negative infinity, encoded as `0/0`, `1/0` and `-1/0` respectively. Finite values
//! are kept in canonical form: `gcd(|numerator|, denominator) == 1` and `denominator > 0`.
//!
//! This type never appears on the solve path; it exists for input validation, diagnostics and
//! printing.
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg};

use num::{BigInt, Integer, One, Signed, Zero};

/// A rational number, or one of NaN and the two infinities.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rational {
    numerator: BigInt,
    denominator: BigInt,
}

impl Rational {
    /// Create a value from a numerator and denominator, normalizing to canonical form.
    ///
    /// A zero denominator yields NaN or an infinity depending on the sign of the numerator.
    pub fn new(numerator: BigInt, denominator: BigInt) -> Self {
        let mut value = Self { numerator, denominator };
        value.normalize();
        value
    }

    /// An integer value.
    pub fn from_integer(value: BigInt) -> Self {
        Self { numerator: value, denominator: BigInt::one() }
    }

    /// The not-a-number value, `0/0`.
    pub fn nan() -> Self {
        Self { numerator: BigInt::zero(), denominator: BigInt::zero() }
    }

    /// Positive infinity, `1/0`.
    pub fn infinity() -> Self {
        Self { numerator: BigInt::one(), denominator: BigInt::zero() }
    }

    /// Negative infinity, `-1/0`.
    pub fn neg_infinity() -> Self {
        Self { numerator: -BigInt::one(), denominator: BigInt::zero() }
    }

    fn normalize(&mut self) {
        if self.denominator.is_zero() {
            // NaN or an infinity; only the sign of the numerator is retained.
            self.numerator = self.numerator.signum();
            return;
        }
        if self.denominator.is_negative() {
            self.numerator = -&self.numerator;
            self.denominator = -&self.denominator;
        }
        if self.numerator.is_zero() {
            self.denominator = BigInt::one();
            return;
        }
        let divisor = self.numerator.gcd(&self.denominator);
        if !divisor.is_one() {
            self.numerator = &self.numerator / &divisor;
            self.denominator = &self.denominator / &divisor;
        }
    }

    /// Whether this is the NaN value.
    pub fn is_nan(&self) -> bool {
        self.denominator.is_zero() && self.numerator.is_zero()
    }

    /// Whether this is positive or negative infinity.
    pub fn is_infinite(&self) -> bool {
        self.denominator.is_zero() && !self.numerator.is_zero()
    }

    /// Whether this is a finite rational value.
    pub fn is_finite(&self) -> bool {
        !self.denominator.is_zero()
    }

    /// Whether this is a finite integer.
    pub fn is_integer(&self) -> bool {
        self.is_finite() && self.denominator.is_one()
    }

    /// The numerator in canonical form.
    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    /// The denominator in canonical form; zero for the special values.
    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }

    /// The absolute value; NaN stays NaN.
    pub fn abs(&self) -> Self {
        Self { numerator: self.numerator.abs(), denominator: self.denominator.clone() }
    }

    /// The largest integer not above this value.
    ///
    /// Only defined for finite values.
    pub fn floor(&self) -> BigInt {
        debug_assert!(self.is_finite());

        self.numerator.div_floor(&self.denominator)
    }

    /// The smallest integer not below this value.
    ///
    /// Only defined for finite values.
    pub fn ceil(&self) -> BigInt {
        debug_assert!(self.is_finite());

        self.numerator.div_ceil(&self.denominator)
    }
}

impl Neg for Rational {
    type Output = Self;

    fn neg(self) -> Self {
        // Negation maps the infinities onto each other and fixes NaN.
        Self { numerator: -self.numerator, denominator: self.denominator }
    }
}

impl Add for &Rational {
    type Output = Rational;

    fn add(self, other: &Rational) -> Rational {
        if self.is_nan() || other.is_nan() {
            return Rational::nan();
        }
        if self.is_infinite() && other.is_infinite() {
            // Opposite infinities cancel into NaN.
            return if self.numerator == other.numerator { self.clone() } else { Rational::nan() };
        }
        if self.is_infinite() {
            return self.clone();
        }
        if other.is_infinite() {
            return other.clone();
        }
        Rational::new(
            &self.numerator * &other.denominator + &other.numerator * &self.denominator,
            &self.denominator * &other.denominator,
        )
    }
}

impl Mul for &Rational {
    type Output = Rational;

    fn mul(self, other: &Rational) -> Rational {
        if self.is_nan() || other.is_nan() {
            return Rational::nan();
        }
        if (self.is_infinite() && other.numerator.is_zero())
            || (other.is_infinite() && self.numerator.is_zero())
        {
            return Rational::nan();
        }
        Rational::new(&self.numerator * &other.numerator, &self.denominator * &other.denominator)
    }
}

impl PartialOrd for Rational {
    /// NaN compares equal to itself (keeping the ordering consistent with equality) and is
    /// unordered against everything else.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() {
            return (self == other).then_some(Ordering::Equal);
        }
        if self.is_infinite() || other.is_infinite() {
            // An infinity is smaller or larger than everything except itself.
            let rank = |value: &Self| match value.is_infinite() {
                true if value.numerator.is_positive() => 2_i8,
                true => -2,
                false => 0,
            };
            return rank(self).partial_cmp(&rank(other));
        }
        (&self.numerator * &other.denominator).partial_cmp(&(&other.numerator * &self.denominator))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_nan() {
            write!(f, "NaN")
        } else if self.is_infinite() {
            write!(f, "{}infty", if self.numerator.is_positive() { "" } else { "-" })
        } else if self.denominator.is_one() {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

#[cfg(test)]
mod test {
    use num::BigInt;

    use crate::data::number_types::rational::Rational;

    fn r(n: i64, d: i64) -> Rational {
        Rational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn canonical_form() {
        assert_eq!(r(4, 6), r(2, 3));
        assert_eq!(r(1, -2), r(-1, 2));
        assert_eq!(r(0, 5), r(0, 1));
        assert_eq!(r(3, 0), Rational::infinity());
        assert_eq!(r(-7, 0), Rational::neg_infinity());
        assert_eq!(r(0, 0), Rational::nan());
    }

    #[test]
    fn classification() {
        assert!(r(0, 0).is_nan());
        assert!(r(1, 0).is_infinite());
        assert!(r(5, 1).is_integer());
        assert!(r(5, 2).is_finite());
        assert!(!r(5, 2).is_integer());
    }

    #[test]
    fn arithmetic() {
        assert_eq!(&r(1, 2) + &r(1, 3), r(5, 6));
        assert_eq!(&r(1, 2) * &r(2, 3), r(1, 3));
        assert!((&Rational::infinity() + &Rational::neg_infinity()).is_nan());
        assert!((&Rational::infinity() * &r(0, 1)).is_nan());
        assert_eq!(-r(1, 2), r(-1, 2));
    }

    #[test]
    fn ordering() {
        assert!(r(1, 3) < r(1, 2));
        assert!(Rational::neg_infinity() < r(-1000, 1));
        assert!(r(1000, 1) < Rational::infinity());
        assert!(Rational::nan().partial_cmp(&r(0, 1)).is_none());
    }

    #[test]
    fn rounding() {
        assert_eq!(r(7, 2).floor(), BigInt::from(3));
        assert_eq!(r(7, 2).ceil(), BigInt::from(4));
        assert_eq!(r(-7, 2).floor(), BigInt::from(-4));
        assert_eq!(r(-7, 2).ceil(), BigInt::from(-3));
    }

    #[test]
    fn display() {
        assert_eq!(r(4, 6).to_string(), "2/3");
        assert_eq!(r(4, 1).to_string(), "4");
        assert_eq!(Rational::neg_infinity().to_string(), "-infty");
        assert_eq!(Rational::nan().to_string(), "NaN");
    }
}
