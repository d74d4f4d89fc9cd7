//! Interval bounds of expressions over a rectangle of parameter values.
//!
//! The bounds are conservative: the true range of an expression over a region is always inside
//! its computed span, but the span may be wider. Splitting the region tightens them, which is
//! how the checks here decide the sign of an expression or the absence of a pole.

use super::{Func, Node, Param};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Values this close to zero count as zero when deciding a sign
const SLACK: f64 = 1e-12;

/// Number of halvings of the region before a pole is reported
const POLE_DEPTH: usize = 20;

/// Number of halvings of the region before a sign is given up on
const SIGN_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Span {
    pub(crate) lo: f64,
    pub(crate) hi: f64,
}

impl Span {
    /// The span between two values in either order. A NaN bound becomes infinite.
    pub(crate) fn new(a: f64, b: f64) -> Self {
        let (lo, hi) = crate::min_max(a, b);
        Self {
            lo: if lo.is_nan() { f64::NEG_INFINITY } else { lo },
            hi: if hi.is_nan() { f64::INFINITY } else { hi },
        }
    }

    pub(crate) fn point(x: f64) -> Self {
        Self::new(x, x)
    }

    pub(crate) fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    fn is_finite(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite()
    }

    fn contains_zero(&self) -> bool {
        self.lo <= 0.0 && self.hi >= 0.0
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.lo), f(self.hi))
    }

    fn plus(self, other: Span) -> Span {
        Span::new(self.lo + other.lo, self.hi + other.hi)
    }

    fn neg(self) -> Span {
        Span::new(-self.hi, -self.lo)
    }

    fn times(self, other: Span) -> Span {
        if self == Span::point(0.0) || other == Span::point(0.0) {
            return Span::point(0.0);
        }
        let corners = [
            self.lo * other.lo,
            self.lo * other.hi,
            self.hi * other.lo,
            self.hi * other.hi,
        ];
        corners
            .into_iter()
            .filter(|c| !c.is_nan())
            .fold(None, |acc: Option<Span>, c| {
                Some(acc.map_or(Span::point(c), |s| Span::new(s.lo.min(c), s.hi.max(c))))
            })
            .unwrap_or_else(Span::unbounded)
    }

    /// `1/x` over the span, or `None` at a pole. A span that isn't finite can't place a pole.
    fn recip(self) -> Option<Span> {
        if !self.is_finite() {
            Some(Span::unbounded())
        } else if self.contains_zero() {
            None
        } else {
            Some(Span::new(1.0 / self.hi, 1.0 / self.lo))
        }
    }

    fn powi(self, n: i32) -> Option<Span> {
        if n < 0 {
            return self.powi(-n)?.recip();
        }
        let ends = self.map(|x| x.powi(n));
        if n % 2 == 0 && self.contains_zero() {
            Some(Span::new(0.0, ends.hi))
        } else {
            Some(ends)
        }
    }

    /// `x^n` for a non-integer `n`, which is only real for `x >= 0`
    fn powf(self, n: f64) -> Option<Span> {
        if self.hi < 0.0 {
            return Some(Span::unbounded());
        }
        let s = Span::new(self.lo.max(0.0), self.hi);
        if n < 0.0 && s.lo == 0.0 {
            return if s.is_finite() {
                None
            } else {
                Some(Span::unbounded())
            };
        }
        Some(s.map(|x| x.powf(n)))
    }

    /// Returns true if `offset + k * period` is in the span for some integer `k`
    fn has_point(&self, offset: f64, period: f64) -> bool {
        let k = ((self.lo - offset) / period).ceil();
        offset + k * period <= self.hi
    }

    /// Bounds of a periodic function with a maximum at `peak` and a minimum at `trough`
    fn wave(self, f: fn(f64) -> f64, peak: f64, trough: f64) -> Span {
        if !self.is_finite() || self.hi - self.lo >= TAU {
            return Span::new(-1.0, 1.0);
        }
        let ends = self.map(f);
        Span::new(
            if self.has_point(trough, TAU) { -1.0 } else { ends.lo },
            if self.has_point(peak, TAU) { 1.0 } else { ends.hi },
        )
    }
}

/// A rectangle of values for `u` and `v`
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Region {
    u: Span,
    v: Span,
}

impl Region {
    pub(crate) fn unbounded() -> Self {
        Self {
            u: Span::unbounded(),
            v: Span::unbounded(),
        }
    }

    pub(crate) fn with(self, p: Param, span: Span) -> Self {
        match p {
            Param::U => Self { u: span, ..self },
            Param::V => Self { v: span, ..self },
        }
    }

    pub(crate) fn get(&self, p: Param) -> Span {
        match p {
            Param::U => self.u,
            Param::V => self.v,
        }
    }

    /// Halves the widest finite span of a parameter that `node` depends on
    fn split(&self, node: &Node) -> Option<[Region; 2]> {
        let (p, span) = [Param::U, Param::V]
            .into_iter()
            .filter(|&p| node.depends_on(p))
            .map(|p| (p, self.get(p)))
            .filter(|(_, s)| s.is_finite() && s.hi > s.lo)
            .max_by(|a, b| (a.1.hi - a.1.lo).total_cmp(&(b.1.hi - b.1.lo)))?;
        let mid = 0.5 * (span.lo + span.hi);
        if mid <= span.lo || mid >= span.hi {
            return None;
        }
        Some([
            self.with(p, Span::new(span.lo, mid)),
            self.with(p, Span::new(mid, span.hi)),
        ])
    }
}

/// Bounds of `node` over `region`, or `None` if the node has a pole there. With a `focus`, only
/// poles whose position depends on that parameter are reported.
pub(crate) fn bounds(node: &Node, region: &Region, focus: Option<Param>) -> Option<Span> {
    if let Some(p) = focus {
        if !node.depends_on(p) {
            return Some(bounds(node, region, None).unwrap_or_else(Span::unbounded));
        }
    }

    let span = match node {
        Node::Num(c) => Span::point(*c),
        Node::Param(p) => region.get(*p),
        Node::Neg(a) => bounds(a, region, focus)?.neg(),
        Node::Add(a, b) => bounds(a, region, focus)?.plus(bounds(b, region, focus)?),
        Node::Sub(a, b) => bounds(a, region, focus)?.plus(bounds(b, region, focus)?.neg()),
        Node::Mul(a, b) => bounds(a, region, focus)?.times(bounds(b, region, focus)?),
        Node::Div(a, b) => {
            let numerator = bounds(a, region, focus)?;
            let denominator = bounds(b, region, focus)?;
            match denominator.recip() {
                Some(r) => numerator.times(r),
                None if focus.is_some_and(|p| !b.depends_on(p)) => Span::unbounded(),
                None => return None,
            }
        }
        Node::Pow(base, exponent) => power(base, exponent, region, focus)?,
        Node::Call(f, a) => call(*f, bounds(a, region, focus)?)?,
    };
    Some(span)
}

fn power(base: &Node, exponent: &Node, region: &Region, focus: Option<Param>) -> Option<Span> {
    if let Some(n) = exponent.as_num() {
        let s = bounds(base, region, focus)?;
        return if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 {
            s.powi(n as i32)
        } else {
            s.powf(n)
        };
    }

    let e = bounds(exponent, region, focus)?;
    if let Some(c) = base.as_num() {
        return Some(if c > 0.0 {
            e.map(|x| c.powf(x))
        } else {
            Span::unbounded()
        });
    }

    // a^b = exp(b ln a)
    let s = bounds(base, region, focus)?;
    if s.hi <= 0.0 || !s.is_finite() {
        Some(Span::unbounded())
    } else if s.lo <= 0.0 {
        if e.lo < 0.0 { None } else { Some(Span::unbounded()) }
    } else {
        Some(s.map(f64::ln).times(e).map(f64::exp))
    }
}

fn call(f: Func, s: Span) -> Option<Span> {
    let span = match f {
        Func::Sin => s.wave(f64::sin, FRAC_PI_2, -FRAC_PI_2),
        Func::Cos => s.wave(f64::cos, 0.0, PI),
        Func::Tan | Func::Cot => {
            let pole = if f == Func::Tan { FRAC_PI_2 } else { 0.0 };
            if !s.is_finite() {
                Span::unbounded()
            } else if s.has_point(pole, PI) {
                return None;
            } else {
                s.map(|x| f.apply(x))
            }
        }
        Func::Sec => call(Func::Cos, s)?.recip()?,
        Func::Csc => call(Func::Sin, s)?.recip()?,
        Func::Asin | Func::Acos => {
            if s.lo > 1.0 || s.hi < -1.0 {
                Span::unbounded()
            } else {
                Span::new(s.lo.max(-1.0), s.hi.min(1.0)).map(|x| f.apply(x))
            }
        }
        Func::Atan | Func::Sinh | Func::Tanh | Func::Exp => s.map(|x| f.apply(x)),
        Func::Cosh => {
            let ends = s.map(f64::cosh);
            if s.contains_zero() {
                Span::new(1.0, ends.hi)
            } else {
                ends
            }
        }
        Func::Ln => {
            if s.hi <= 0.0 || !s.is_finite() {
                Span::unbounded()
            } else if s.lo <= 0.0 {
                return None;
            } else {
                s.map(f64::ln)
            }
        }
        Func::Sqrt => s.powf(0.5)?,
        Func::Abs => {
            if s.lo >= 0.0 {
                s
            } else if s.hi <= 0.0 {
                s.neg()
            } else {
                Span::new(0.0, s.hi.max(-s.lo))
            }
        }
        Func::Sign => s.map(|x| f.apply(x)),
    };
    Some(span)
}

/// Returns true if `accept` holds for the bounds of `node` over every piece of some subdivision
/// of `region` at most `depth` halvings deep. A pole in a piece fails it.
fn everywhere(
    node: &Node,
    region: &Region,
    focus: Option<Param>,
    depth: usize,
    accept: &dyn Fn(Span) -> bool,
) -> bool {
    if bounds(node, region, focus).is_some_and(accept) {
        return true;
    }
    if depth == 0 {
        return false;
    }
    match region.split(node) {
        Some(halves) => halves
            .iter()
            .all(|half| everywhere(node, half, focus, depth - 1, accept)),
        None => false,
    }
}

/// Returns true if `node` may have a pole in `region` at a position that depends on `p`
pub(crate) fn has_pole(node: &Node, region: &Region, p: Param) -> bool {
    !everywhere(node, region, Some(p), POLE_DEPTH, &|_| true)
}

/// The sign of `node` if it is the same over the whole region, with zero counting as either
pub(crate) fn sign(node: &Node, region: &Region) -> Option<f64> {
    if everywhere(node, region, None, SIGN_DEPTH, &|s| s.lo >= -SLACK) {
        Some(1.0)
    } else if everywhere(node, region, None, SIGN_DEPTH, &|s| s.hi <= SLACK) {
        Some(-1.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expression;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_case::test_case;

    const UV: [Param; 2] = [Param::U, Param::V];

    fn node(text: &str) -> Node {
        Expression::parse(text, &UV).unwrap().node
    }

    fn region(u: [f64; 2], v: [f64; 2]) -> Region {
        Region::unbounded()
            .with(Param::U, Span::new(u[0], u[1]))
            .with(Param::V, Span::new(v[0], v[1]))
    }

    #[test]
    fn bounds_contain_sampled_values() {
        let texts = [
            "u**2 - 3*u*v + sin(v)",
            "exp(u)*cos(3*v) - u/(v + 5)",
            "sqrt(u**2 + 1)*cosh(v) + atan(u*v)",
            "abs(u - v)**3 + sign(v) - 2**u",
        ];
        let r = region([-2.0, 1.5], [-1.0, 2.5]);
        let mut rng = StdRng::seed_from_u64(7);
        for text in texts {
            let n = node(text);
            let s = bounds(&n, &r, None).unwrap();
            let e = Expression::from_node(n);
            for _ in 0..200 {
                let u = rng.random_range(-2.0..1.5);
                let v = rng.random_range(-1.0..2.5);
                let x = e.eval_raw(u, v);
                assert!(s.lo <= x && x <= s.hi, "{text} = {x} at ({u}, {v}) outside {s:?}");
            }
        }
    }

    #[test_case("1/u", [-1.0, 1.0], true)]
    #[test_case("1/u", [0.5, 1.0], false)]
    #[test_case("1/u", [0.0, 1.0], true)]
    #[test_case("1/u**2", [-1.0, 1.0], true)]
    #[test_case("1/(u**2 - u + 1)", [-3.0, 3.0], false; "needs splitting")]
    #[test_case("log(abs(u - 1))", [0.0, 2.0], true)]
    #[test_case("tan(u)", [0.0, 2.0], true)]
    #[test_case("tan(u)", [0.0, 1.5], false)]
    #[test_case("sec(u)", [1.0, 2.0], true)]
    #[test_case("2*sqrt(u)", [0.0, 1.0], false)]
    #[test_case("u/(v - 0.5)", [0.0, 1.0], false; "pole in the other parameter")]
    fn poles(text: &str, u: [f64; 2], expected: bool) {
        let r = region(u, [0.0, 1.0]);
        assert_eq!(has_pole(&node(text), &r, Param::U), expected);
    }

    #[test]
    fn unbounded_parameter_places_no_pole() {
        let r = Region::unbounded().with(Param::U, Span::new(0.0, 1.0));
        assert!(!has_pole(&node("log(abs(u + v))"), &r, Param::U));
        assert!(has_pole(&node("log(abs(u + v))"), &region([0.0, 1.0], [-2.0, 0.0]), Param::U));
    }

    #[test_case("u", [0.0, 1.0], Some(1.0))]
    #[test_case("u - 1", [0.0, 1.0], Some(-1.0))]
    #[test_case("u", [-1.0, 1.0], None)]
    #[test_case("sin(u)", [0.0, 3.141592653589793], Some(1.0))]
    #[test_case("sin(u)", [3.141592653589793, 6.283185307179586], Some(-1.0))]
    #[test_case("cos(v) + 2", [0.0, 1.0], Some(1.0))]
    #[test_case("u**2 - 2*u + 1.5", [0.0, 2.0], Some(1.0); "needs splitting")]
    fn signs(text: &str, u: [f64; 2], expected: Option<f64>) {
        let r = region(u, [0.0, 6.283185307179586]);
        assert_eq!(sign(&node(text), &r), expected);
    }

    #[test]
    fn periodic_extremes() {
        let s = call(Func::Cos, Span::new(-0.5, 4.0)).unwrap();
        assert_eq!(s.hi, 1.0);
        assert_eq!(s.lo, -1.0);
        let s = call(Func::Sin, Span::new(0.1, 0.2)).unwrap();
        assert_eq!(s, Span::new(0.1f64.sin(), 0.2f64.sin()));
    }
}
