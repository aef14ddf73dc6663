//! Exact rational arithmetic
//!
//! Every value is kept in lowest terms with a strictly positive denominator,
//! so structural equality is numeric equality. Intermediate products are
//! computed in `i128` and narrowed back to `i64`, failing on overflow instead
//! of wrapping.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use thiserror::Error;

/// Default budget for converting decimals into fractions.
pub const DEFAULT_PRECISION: f64 = 1e-5;

/// Tolerance used by [`Rational::approx_eq`]. Display only, never for solving.
pub const APPROX_EPSILON: f64 = 1e-4;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RationalError {
    #[error("denominator of a rational must be non-zero")]
    ZeroDenominator,

    #[error("division by a zero-valued rational")]
    DivisionByZero,

    #[error("rational arithmetic overflowed 64-bit range")]
    Overflow,

    #[error("cannot convert non-finite value {0} to a rational")]
    NotFinite(f64),

    #[error("precision must be between 0 and 1 exclusive, got {0}")]
    InvalidPrecision(f64),

    #[error("cannot parse '{0}' as a rational")]
    Parse(String),
}

/// An exact fraction `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    numerator: i64,
    denominator: i64,
}

impl Rational {
    pub const ZERO: Rational = Rational {
        numerator: 0,
        denominator: 1,
    };

    pub const ONE: Rational = Rational {
        numerator: 1,
        denominator: 1,
    };

    /// Build `numerator / denominator`, reducing to lowest terms.
    pub fn new(numerator: i64, denominator: i64) -> Result<Rational, RationalError> {
        Self::reduce(numerator as i128, denominator as i128)
    }

    pub const fn from_integer(n: i64) -> Rational {
        Rational {
            numerator: n,
            denominator: 1,
        }
    }

    /// Convert a decimal with the default precision budget.
    pub fn from_decimal(value: f64) -> Result<Rational, RationalError> {
        Self::from_decimal_with_precision(value, DEFAULT_PRECISION)
    }

    /// Convert a decimal by scaling it by 10 until it is integral or the
    /// precision budget runs out, then truncating what is left.
    pub fn from_decimal_with_precision(
        value: f64,
        precision: f64,
    ) -> Result<Rational, RationalError> {
        if !value.is_finite() {
            return Err(RationalError::NotFinite(value));
        }
        if !(precision > 0.0 && precision < 1.0) {
            return Err(RationalError::InvalidPrecision(precision));
        }

        // number of decimal places the budget allows, e.g. 1e-5 -> 5
        let max_places = (-precision.log10() - 1e-9).ceil().max(0.0) as u32;

        let mut scale: i128 = 1;
        let mut scaled = value;
        let mut places = 0;
        while !is_integral(scaled) && places < max_places {
            places += 1;
            scale *= 10;
            scaled = value * scale as f64;
        }

        let numerator = if is_integral(scaled) {
            scaled.round()
        } else {
            scaled.trunc()
        };
        if numerator.abs() >= i64::MAX as f64 {
            return Err(RationalError::Overflow);
        }
        Self::reduce(numerator as i128, scale)
    }

    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    pub fn is_one(&self) -> bool {
        self.numerator == 1 && self.denominator == 1
    }

    pub fn is_positive(&self) -> bool {
        self.numerator > 0
    }

    pub fn to_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub fn checked_add(self, other: Rational) -> Result<Rational, RationalError> {
        let (a, b) = (self.wide(), other.wide());
        Self::reduce(a.0 * b.1 + b.0 * a.1, a.1 * b.1)
    }

    pub fn checked_sub(self, other: Rational) -> Result<Rational, RationalError> {
        self.checked_add(-other)
    }

    pub fn checked_mul(self, other: Rational) -> Result<Rational, RationalError> {
        let (a, b) = (self.wide(), other.wide());
        Self::reduce(a.0 * b.0, a.1 * b.1)
    }

    pub fn checked_div(self, other: Rational) -> Result<Rational, RationalError> {
        self.checked_mul(other.inverse()?)
    }

    /// Swap numerator and denominator.
    pub fn inverse(self) -> Result<Rational, RationalError> {
        if self.is_zero() {
            return Err(RationalError::DivisionByZero);
        }
        Self::reduce(self.denominator as i128, self.numerator as i128)
    }

    /// Sum a sequence of rationals, failing on the first overflow.
    pub fn checked_sum<I>(values: I) -> Result<Rational, RationalError>
    where
        I: IntoIterator<Item = Rational>,
    {
        values
            .into_iter()
            .try_fold(Rational::ZERO, |acc, value| acc.checked_add(value))
    }

    pub fn approx_eq(&self, other: &Rational) -> bool {
        (self.to_f64() - other.to_f64()).abs() <= APPROX_EPSILON
    }

    fn wide(self) -> (i128, i128) {
        (self.numerator as i128, self.denominator as i128)
    }

    fn reduce(numerator: i128, denominator: i128) -> Result<Rational, RationalError> {
        if denominator == 0 {
            return Err(RationalError::ZeroDenominator);
        }
        if numerator == 0 {
            return Ok(Rational::ZERO);
        }
        let (mut numerator, mut denominator) = if denominator < 0 {
            (-numerator, -denominator)
        } else {
            (numerator, denominator)
        };
        let divisor = gcd(numerator.unsigned_abs(), denominator.unsigned_abs()) as i128;
        numerator /= divisor;
        denominator /= divisor;

        // i64::MIN is excluded so that negation can never overflow
        let numerator = i64::try_from(numerator)
            .ok()
            .filter(|n| *n != i64::MIN)
            .ok_or(RationalError::Overflow)?;
        let denominator = i64::try_from(denominator).map_err(|_| RationalError::Overflow)?;
        Ok(Rational {
            numerator,
            denominator,
        })
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn is_integral(x: f64) -> bool {
    let nearest = x.round();
    (x - nearest).abs() <= nearest.abs().max(1.0) * 1e-12
}

impl Default for Rational {
    fn default() -> Self {
        Rational::ZERO
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.wide(), other.wide());
        (a.0 * b.1).cmp(&(b.0 * a.1))
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Rational::from_integer(n)
    }
}

impl TryFrom<(i64, i64)> for Rational {
    type Error = RationalError;

    fn try_from((numerator, denominator): (i64, i64)) -> Result<Self, Self::Error> {
        Rational::new(numerator, denominator)
    }
}

impl TryFrom<f64> for Rational {
    type Error = RationalError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Rational::from_decimal(value)
    }
}

impl FromStr for Rational {
    type Err = RationalError;

    /// Parses `"n"` or `"n/d"`; either side may be a decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_side = |side: &str| -> Result<Rational, RationalError> {
            let side = side.trim();
            if let Ok(n) = side.parse::<i64>() {
                return Ok(Rational::from_integer(n));
            }
            let value = side
                .parse::<f64>()
                .map_err(|_| RationalError::Parse(s.to_string()))?;
            Rational::from_decimal(value)
        };

        match s.split_once('/') {
            Some((numerator, denominator)) => {
                let denominator = parse_side(denominator)?;
                if denominator.is_zero() {
                    return Err(RationalError::ZeroDenominator);
                }
                parse_side(numerator)?.checked_div(denominator)
            }
            None => parse_side(s),
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn r(s: &str) -> Rational {
        s.parse().unwrap()
    }

    #[test]
    fn construction() {
        assert_eq!(Rational::default(), Rational::ZERO);
        let third = Rational::new(3, 5).unwrap();
        assert_eq!((third.numerator(), third.denominator()), (3, 5));
        assert_eq!(Rational::from_decimal(0.75).unwrap(), Rational::new(3, 4).unwrap());
        assert_eq!(r("3/9"), Rational::new(1, 3).unwrap());
        assert_eq!(Rational::try_from((5, 3)).unwrap().to_string(), "5/3");
    }

    #[test]
    fn normalizes_sign_and_zero() {
        let half = Rational::new(1, -2).unwrap();
        assert_eq!((half.numerator(), half.denominator()), (-1, 2));
        let zero = Rational::new(0, 333).unwrap();
        assert_eq!((zero.numerator(), zero.denominator()), (0, 1));
        assert_eq!(Rational::new(10, 5).unwrap().to_f64(), 2.0);
        assert_eq!(Rational::new(4, 4).unwrap(), Rational::ONE);
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert_eq!(Rational::new(1, 0), Err(RationalError::ZeroDenominator));
        assert_eq!("1/0".parse::<Rational>(), Err(RationalError::ZeroDenominator));
        assert_eq!(Rational::ZERO.inverse(), Err(RationalError::DivisionByZero));
        assert_eq!(
            Rational::ONE.checked_div(Rational::ZERO),
            Err(RationalError::DivisionByZero)
        );
    }

    #[test]
    fn decimal_conversion() {
        assert_eq!(Rational::from_decimal(0.2).unwrap(), Rational::new(1, 5).unwrap());
        assert_eq!(Rational::from_decimal(22.5).unwrap(), Rational::new(45, 2).unwrap());
        assert_eq!(Rational::from_decimal(0.888).unwrap(), Rational::new(111, 125).unwrap());
        assert_eq!(r("0.9"), Rational::new(9, 10).unwrap());
        assert_eq!(r("2.5/0.5"), Rational::from_integer(5));
    }

    #[test]
    fn decimal_conversion_truncates_at_budget() {
        let third = Rational::from_decimal(1.0 / 3.0).unwrap();
        assert_eq!(third, Rational::new(33333, 100000).unwrap());
        let coarse = Rational::from_decimal_with_precision(1.0 / 3.0, 1e-2).unwrap();
        assert_eq!(coarse, Rational::new(33, 100).unwrap());
        assert_eq!(
            Rational::from_decimal_with_precision(0.5, 1.5),
            Err(RationalError::InvalidPrecision(1.5))
        );
        assert!(matches!(Rational::from_decimal(f64::NAN), Err(RationalError::NotFinite(_))));
    }

    #[test]
    fn addition_and_subtraction() {
        let cases = [
            ("2/12", "4/6", "5/6"),
            ("4/8", "1/4", "3/4"),
            ("2/10", "2/5", "3/5"),
            ("3/6", "2/12", "2/3"),
        ];
        for (a, b, expected) in cases {
            assert_eq!(r(a).checked_add(r(b)).unwrap().to_string(), expected);
        }

        let cases = [
            ("7/12", "3/6", "1/12"),
            ("5/12", "1/6", "1/4"),
            ("1/2", "1/3", "1/6"),
            ("1/6", "5/12", "-1/4"),
        ];
        for (a, b, expected) in cases {
            assert_eq!(r(a).checked_sub(r(b)).unwrap().to_string(), expected);
        }
    }

    #[test]
    fn multiplication_and_division() {
        assert_eq!(r("0.9").checked_mul(r("5/18")).unwrap().to_string(), "1/4");
        assert_eq!(r("2/3").checked_mul(r("9")).unwrap().to_string(), "6");
        assert_eq!(r("14/3").checked_mul(r("3/4")).unwrap().to_string(), "7/2");
        assert_eq!(r("5/9").checked_div(r("105/36")).unwrap().to_string(), "4/21");
        assert_eq!(r("19").checked_div(r("38/6")).unwrap().to_string(), "3");
    }

    #[test]
    fn values_are_independent_copies() {
        let a = r("1/2");
        let b = a;
        let c = b.checked_add(Rational::ONE).unwrap();
        assert_eq!(a, r("1/2"));
        assert_eq!(c, r("3/2"));
        assert_eq!(-a, r("-1/2"));
    }

    #[test]
    fn ordering_and_approx_eq() {
        assert!(r("1/3") < r("1/2"));
        assert!(r("-1/2") < Rational::ZERO);
        assert!(r("33333/100000").approx_eq(&r("1/3")));
        assert!(!r("1/3").approx_eq(&r("1/2")));
    }

    #[test]
    fn overflow_is_reported() {
        let big = Rational::from_integer(i64::MAX);
        assert_eq!(big.checked_mul(Rational::from_integer(2)), Err(RationalError::Overflow));
    }

    proptest! {
        #[test]
        fn divide_then_multiply_round_trips(
            an in -10_000i64..10_000, ad in 1i64..10_000,
            bn in -10_000i64..10_000, bd in 1i64..10_000,
        ) {
            prop_assume!(bn != 0);
            let a = Rational::new(an, ad).unwrap();
            let b = Rational::new(bn, bd).unwrap();
            let back = a.checked_div(b).unwrap().checked_mul(b).unwrap();
            prop_assert_eq!(back, a);
        }

        #[test]
        fn always_in_lowest_terms(n in -100_000i64..100_000, d in 1i64..100_000) {
            let value = Rational::new(n, d).unwrap();
            prop_assert!(value.denominator() > 0);
            prop_assert_eq!(
                gcd(value.numerator().unsigned_abs() as u128, value.denominator() as u128),
                1
            );
        }
    }
}
