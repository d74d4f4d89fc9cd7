// A closed interval over one curve/surface parameter.
use crate::{CalcError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// The value the integration starts from
    pub min: f64,

    /// The value the integration ends at
    pub max: f64,
}

impl Interval {
    /// Create a new interval without checking the bounds. Reversed intervals (`min > max`) are
    /// allowed and integrate with the opposite sign.
    pub fn new_unchecked(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Create a new interval, checking that the bounds are valid. The bounds are valid if
    /// neither is NaN and `min` <= `max`.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let interval = Self { min, max };
        interval.check_bounds()?;
        if min <= max {
            Ok(interval)
        } else {
            Err(CalcError::Domain(format!(
                "interval [{min}, {max}] has min greater than max"
            )))
        }
    }

    /// Returns an error if either bound is NaN. This is the only check the permissive calculators
    /// perform, since a NaN bound can't produce a meaningful integral in any direction.
    pub fn check_bounds(&self) -> Result<()> {
        if self.min.is_nan() || self.max.is_nan() {
            Err(CalcError::Domain(format!(
                "interval [{}, {}] has a NaN bound",
                self.min, self.max
            )))
        } else {
            Ok(())
        }
    }

    /// Returns the signed width of the interval, negative when the interval is reversed
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Returns true if both bounds are the same value, in which case any integral over it is 0
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn is_reversed(&self) -> bool {
        self.min > self.max
    }

    /// Returns true if the given value lies between the bounds, regardless of their order
    pub fn contains(&self, x: f64) -> bool {
        let (lo, hi) = crate::min_max(self.min, self.max);
        x >= lo && x <= hi
    }
}

impl Default for Interval {
    /// The unit interval [0, 1], the default range for both surface parameters
    fn default() -> Self {
        Self::new_unchecked(0.0, 1.0)
    }
}

impl From<[f64; 2]> for Interval {
    fn from(value: [f64; 2]) -> Self {
        Self::new_unchecked(value[0], value[1])
    }
}

impl From<(f64, f64)> for Interval {
    fn from(value: (f64, f64)) -> Self {
        Self::new_unchecked(value.0, value.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use test_case::test_case;

    #[test]
    fn checked_rejects_reversed() {
        let e = Interval::new(1.0, 0.0).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Domain);
    }

    #[test]
    fn checked_rejects_nan() {
        let e = Interval::new(f64::NAN, 1.0).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Domain);
    }

    #[test]
    fn unchecked_keeps_reversed() {
        let i = Interval::from([2.0, -1.0]);
        assert!(i.is_reversed());
        assert_eq!(i.width(), -3.0);
    }

    #[test_case(0.0, 1.0, 0.5, true)]
    #[test_case(1.0, 0.0, 0.5, true)]
    #[test_case(0.0, 1.0, 1.5, false)]
    #[test_case(0.0, 0.0, 0.0, true)]
    fn contains(min: f64, max: f64, x: f64, expected: bool) {
        assert_eq!(Interval::new_unchecked(min, max).contains(x), expected);
    }

    #[test]
    fn default_is_unit() {
        assert_eq!(Interval::default(), Interval::new_unchecked(0.0, 1.0));
    }
}
