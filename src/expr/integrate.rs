//! Closed-form integration for a limited family of integrands.
//!
//! The rules cover linearity, the power rule for products of monomials, distribution of products
//! over sums, integer powers of sums, powers and reciprocals of linear arguments, the elementary
//! functions of a linear argument, exponentials with a constant base, integration by parts of
//! a monomial against `sin`, `cos`, `exp`, `sinh` or `cosh`, and `x^m (a x² + b)^n` for the
//! half-integer and reciprocal powers that arise from surface elements. Anything else is reported
//! as having no closed form rather than being approximated.
//!
//! Definite integrals resolve absolute values and signs whose argument keeps one sign over the
//! range, split the range where an argument changes sign, and refuse to apply the fundamental
//! theorem across a pole of the antiderivative.

use super::bounds::{self, Region, Span};
use super::diff::diff;
use super::normal;
use super::{Func, Node, Param};
use crate::{CalcError, Result};
use std::f64::consts::{FRAC_PI_2, PI};

/// Bound on the rule recursion, which distribution and expansion can otherwise grow quickly
const MAX_DEPTH: usize = 48;

/// Largest integer power of a sum (and largest monomial degree for integration by parts) that
/// will be expanded
const MAX_EXPAND: f64 = 8.0;

/// Largest combined power of the sine and cosine (or their hyperbolic versions) expanded after
/// a trigonometric substitution
const MAX_TRIG: f64 = 16.0;

/// Most pieces a definite integral is split into at sign changes
const MAX_SPLITS: usize = 16;

pub(crate) fn antiderivative(node: &Node, p: Param) -> Result<Node> {
    anti(node, p, 0).ok_or_else(|| {
        CalcError::NoClosedForm(format!("integral of {node} with respect to {p}"))
    })
}

/// The integral of `node` with respect to `p` from `a` to `b`, where `region` bounds the other
/// parameter
pub(crate) fn definite(node: &Node, p: Param, a: f64, b: f64, region: Region) -> Result<Node> {
    split_definite(node, p, a, b, region, 0)
}

fn split_definite(
    node: &Node,
    p: Param,
    a: f64,
    b: f64,
    region: Region,
    splits: usize,
) -> Result<Node> {
    if a == b {
        return Ok(Node::Num(0.0));
    }
    let (lo, hi) = crate::min_max(a, b);
    let region = region.with(p, Span::new(lo, hi));

    let node = if has_sign(node) {
        resolve_signs(node, &region)
    } else {
        node.clone()
    };
    if splits < MAX_SPLITS {
        if let Some(r) = sign_change(&node, p, lo, hi) {
            let left = split_definite(&node, p, a, r, region, splits + 1)?;
            let right = split_definite(&node, p, r, b, region, splits + 1)?;
            return Ok(Node::add(left, right));
        }
    }

    let f = antiderivative(&node, p)?;
    if bounds::has_pole(&f, &region, p) {
        return Err(CalcError::Integration(format!(
            "the antiderivative {f} of {node} has a pole in {p} on [{lo}, {hi}]"
        )));
    }
    Ok(Node::sub(
        f.subs(p, &Node::Num(b)),
        f.subs(p, &Node::Num(a)),
    ))
}

fn has_sign(node: &Node) -> bool {
    match node {
        Node::Num(_) | Node::Param(_) => false,
        Node::Call(Func::Abs | Func::Sign, _) => true,
        Node::Neg(a) | Node::Call(_, a) => has_sign(a),
        Node::Add(a, b)
        | Node::Sub(a, b)
        | Node::Mul(a, b)
        | Node::Div(a, b)
        | Node::Pow(a, b) => has_sign(a) || has_sign(b),
    }
}

/// Replaces `abs(g)` by `±g` and `sign(g)` by `±1` wherever `g` keeps one sign over `region`
fn resolve_signs(node: &Node, region: &Region) -> Node {
    let r = |n: &Node| resolve_signs(n, region);
    match node {
        Node::Num(_) | Node::Param(_) => node.clone(),
        Node::Neg(a) => Node::neg(r(a)),
        Node::Add(a, b) => Node::add(r(a), r(b)),
        Node::Sub(a, b) => Node::sub(r(a), r(b)),
        Node::Mul(a, b) => Node::mul(r(a), r(b)),
        Node::Div(a, b) => Node::div(r(a), r(b)),
        Node::Pow(a, b) => Node::pow(r(a), r(b)),
        Node::Call(f @ (Func::Abs | Func::Sign), a) => {
            let a = r(a);
            match bounds::sign(&a, region) {
                Some(s) if *f == Func::Abs => Node::mul(Node::Num(s), a),
                Some(s) => Node::Num(s),
                None => Node::call(*f, a),
            }
        }
        Node::Call(f, a) => Node::call(*f, r(a)),
    }
}

/// The first point strictly inside `(lo, hi)` where the argument of an absolute value or sign
/// in `node` changes sign, for arguments that are linear in `p` or the sine or cosine of
/// something linear in `p`
fn sign_change(node: &Node, p: Param, lo: f64, hi: f64) -> Option<f64> {
    match node {
        Node::Num(_) | Node::Param(_) => None,
        Node::Call(Func::Abs | Func::Sign, a) => {
            root_inside(a, p, lo, hi).or_else(|| sign_change(a, p, lo, hi))
        }
        Node::Neg(a) | Node::Call(_, a) => sign_change(a, p, lo, hi),
        Node::Add(a, b)
        | Node::Sub(a, b)
        | Node::Mul(a, b)
        | Node::Div(a, b)
        | Node::Pow(a, b) => sign_change(a, p, lo, hi).or_else(|| sign_change(b, p, lo, hi)),
    }
}

fn root_inside(arg: &Node, p: Param, lo: f64, hi: f64) -> Option<f64> {
    if [Param::U, Param::V].into_iter().any(|q| q != p && arg.depends_on(q)) {
        return None;
    }
    let margin = 1e-12 * (hi - lo);
    let inside = |x: f64| x > lo + margin && x < hi - margin;

    // Roots of sin(t) are at nπ, roots of cos(t) at π/2 + nπ
    let (inner, offset) = match arg {
        Node::Call(Func::Sin, inner) => (&**inner, 0.0),
        Node::Call(Func::Cos, inner) => (&**inner, FRAC_PI_2),
        _ => {
            let k = linear_slope(arg, p)?;
            let c = arg.subs(p, &Node::Num(0.0)).as_num()?;
            let x = -c / k;
            return inside(x).then_some(x);
        }
    };

    let k = linear_slope(inner, p)?;
    let c = inner.subs(p, &Node::Num(0.0)).as_num()?;
    let start = ((k * lo + c - offset) / PI).floor();
    let step = k.signum();
    (0..3)
        .map(|i| start + step * i as f64)
        .map(|n| (offset + n * PI - c) / k)
        .filter(|&x| inside(x))
        .min_by(|a, b| a.total_cmp(b))
}

fn anti(node: &Node, x: Param, depth: usize) -> Option<Node> {
    if depth > MAX_DEPTH {
        return None;
    }
    if !node.depends_on(x) {
        return Some(Node::mul(node.clone(), Node::Param(x)));
    }

    let depth = depth + 1;
    match node {
        Node::Num(c) => Some(Node::mul(Node::Num(*c), Node::Param(x))),
        Node::Param(_) => Some(power_rule(x, 1.0)),
        Node::Neg(a) => anti(a, x, depth).map(Node::neg),
        Node::Add(a, b) => Some(Node::add(anti(a, x, depth)?, anti(b, x, depth)?)),
        Node::Sub(a, b) => Some(Node::sub(anti(a, x, depth)?, anti(b, x, depth)?)),
        Node::Mul(_, _) | Node::Div(_, _) => product(node, x, depth),
        Node::Pow(base, exponent) => power(base, exponent, x, depth),
        Node::Call(f, arg) => call(*f, arg, x),
    }
}

/// ∫ x^n dx
fn power_rule(x: Param, n: f64) -> Node {
    let base = Node::Param(x);
    if n == -1.0 {
        Node::call(Func::Ln, Node::call(Func::Abs, base))
    } else {
        Node::div(Node::pow(base, Node::Num(n + 1.0)), Node::Num(n + 1.0))
    }
}

/// The slope of `node` with respect to `x`, if `node` is linear in `x` with a nonzero numeric
/// slope
fn linear_slope(node: &Node, x: Param) -> Option<f64> {
    match diff(node, x) {
        Node::Num(k) if k != 0.0 => Some(k),
        _ => None,
    }
}

/// If `node` is `x`, `x^n` or `sqrt(x)`, returns the exponent
fn monomial(node: &Node, x: Param) -> Option<f64> {
    match node {
        Node::Param(q) if *q == x => Some(1.0),
        Node::Pow(base, n) if **base == Node::Param(x) => n.as_num(),
        Node::Call(Func::Sqrt, arg) if **arg == Node::Param(x) => Some(0.5),
        _ => None,
    }
}

fn is_sum(node: &Node) -> bool {
    matches!(node, Node::Add(_, _) | Node::Sub(_, _))
}

fn expandable_power(node: &Node) -> bool {
    match node {
        Node::Pow(base, n) => {
            is_sum(base)
                && n
                    .as_num()
                    .is_some_and(|n| n.fract() == 0.0 && (2.0..=MAX_EXPAND).contains(&n))
        }
        _ => false,
    }
}

fn power(base: &Node, exponent: &Node, x: Param, depth: usize) -> Option<Node> {
    if let Some(n) = exponent.as_num() {
        if let Some(k) = linear_slope(base, x) {
            return Some(if n == -1.0 {
                Node::div(
                    Node::call(Func::Ln, Node::call(Func::Abs, base.clone())),
                    Node::Num(k),
                )
            } else {
                Node::div(
                    Node::pow(base.clone(), Node::Num(n + 1.0)),
                    Node::Num((n + 1.0) * k),
                )
            });
        }

        if expandable_power(&Node::Pow(Box::new(base.clone()), Box::new(Node::Num(n)))) {
            // Built directly so the simplifier doesn't fold it back into a power
            let expanded = Node::Mul(
                Box::new(base.clone()),
                Box::new(Node::pow(base.clone(), Node::Num(n - 1.0))),
            );
            return product(&expanded, x, depth);
        }
        return quadratic_power(0, base, n, x);
    }

    // c^(kx + b)
    let c = base.as_num()?;
    let k = linear_slope(exponent, x)?;
    if c > 0.0 && c != 1.0 {
        let whole = Node::pow(base.clone(), exponent.clone());
        Some(Node::div(whole, Node::Num(k * c.ln())))
    } else {
        None
    }
}

fn call(f: Func, arg: &Node, x: Param) -> Option<Node> {
    let Some(k) = linear_slope(arg, x) else {
        return match f {
            Func::Sqrt => quadratic_power(0, arg, 0.5, x),
            _ => None,
        };
    };
    let a = arg.clone();
    let integral = match f {
        Func::Sin => Node::neg(Node::call(Func::Cos, a)),
        Func::Cos => Node::call(Func::Sin, a),
        Func::Exp => Node::call(Func::Exp, a),
        Func::Sinh => Node::call(Func::Cosh, a),
        Func::Cosh => Node::call(Func::Sinh, a),
        Func::Tan => Node::neg(Node::call(
            Func::Ln,
            Node::call(Func::Abs, Node::call(Func::Cos, a)),
        )),
        Func::Sqrt => Node::mul(Node::Num(2.0 / 3.0), Node::pow(a, Node::Num(1.5))),
        Func::Ln => Node::sub(
            Node::mul(a.clone(), Node::call(Func::Ln, a.clone())),
            a,
        ),
        Func::Abs => Node::div(
            Node::mul(a.clone(), Node::call(Func::Abs, a)),
            Node::Num(2.0),
        ),
        Func::Sign => Node::call(Func::Abs, a),
        _ => return None,
    };
    Some(Node::div(integral, Node::Num(k)))
}

/// Splits a tree of products and quotients into a flat list of factors, with divisors turned
/// into reciprocal powers
fn flatten(node: &Node, invert: bool, out: &mut Vec<Node>) {
    match node {
        Node::Mul(a, b) => {
            flatten(a, invert, out);
            flatten(b, invert, out);
        }
        Node::Div(a, b) => {
            flatten(a, invert, out);
            flatten(b, !invert, out);
        }
        Node::Neg(a) => {
            out.push(Node::Num(-1.0));
            flatten(a, invert, out);
        }
        other if invert => out.push(reciprocal(other)),
        other => out.push(other.clone()),
    }
}

fn reciprocal(node: &Node) -> Node {
    match node {
        Node::Pow(base, n) if n.as_num().is_some() => {
            let n = n.as_num().unwrap_or(1.0);
            Node::pow((**base).clone(), Node::Num(-n))
        }
        Node::Call(Func::Sqrt, arg) => Node::pow((**arg).clone(), Node::Num(-0.5)),
        other => Node::pow(other.clone(), Node::Num(-1.0)),
    }
}

fn product(node: &Node, x: Param, depth: usize) -> Option<Node> {
    let mut factors = Vec::new();
    flatten(node, false, &mut factors);

    let (constant, dependent): (Vec<Node>, Vec<Node>) =
        factors.into_iter().partition(|f| !f.depends_on(x));
    let coefficient = constant.into_iter().fold(Node::Num(1.0), Node::mul);
    let integral = dependent_product(dependent, x, depth)?;
    Some(Node::mul(coefficient, integral))
}

/// ∫ of a product of factors which all depend on `x`
fn dependent_product(mut dependent: Vec<Node>, x: Param, depth: usize) -> Option<Node> {
    if depth > MAX_DEPTH {
        return None;
    }

    match dependent.len() {
        0 => return Some(Node::Param(x)),
        1 => return anti(&dependent[0], x, depth),
        _ => {}
    }

    let exponents = dependent
        .iter()
        .map(|f| monomial(f, x))
        .collect::<Option<Vec<_>>>();
    if let Some(exponents) = exponents {
        return Some(power_rule(x, exponents.iter().sum()));
    }

    if let Some(i) = dependent.iter().position(is_sum) {
        let sum = dependent.swap_remove(i);
        let rest = dependent.into_iter().fold(Node::Num(1.0), Node::mul);
        let (a, b, negate) = match sum {
            Node::Add(a, b) => (*a, *b, false),
            Node::Sub(a, b) => (*a, *b, true),
            _ => return None,
        };
        let left = anti(&Node::mul(a, rest.clone()), x, depth)?;
        let right = anti(&Node::mul(b, rest), x, depth)?;
        return Some(if negate {
            Node::sub(left, right)
        } else {
            Node::add(left, right)
        });
    }

    if let Some(i) = dependent.iter().position(expandable_power) {
        if let Node::Pow(base, n) = dependent.swap_remove(i) {
            let n = n.as_num()?;
            dependent.push(Node::pow((*base).clone(), Node::Num(n - 1.0)));
            dependent.push(*base);
            return dependent_product(dependent, x, depth + 1);
        }
    }

    if let Some(integral) = radical_product(&dependent, x) {
        return Some(integral);
    }

    by_parts(dependent, x, depth)
}

/// ∫ x^m (a x² + b)^n dx, for a product of monomials and one power of an even quadratic
fn radical_product(dependent: &[Node], x: Param) -> Option<Node> {
    let mut m = 0.0;
    let mut radical = None;
    for f in dependent {
        if let Some(e) = monomial(f, x) {
            m += e;
            continue;
        }
        if radical.is_some() {
            return None;
        }
        radical = Some(match f {
            Node::Call(Func::Sqrt, q) => (&**q, 0.5),
            Node::Pow(q, n) => (&**q, n.as_num()?),
            _ => return None,
        });
    }

    let (base, n) = radical?;
    if m < 0.0 || m.fract() != 0.0 || m > MAX_TRIG {
        return None;
    }
    quadratic_power(m as u32, base, n, x)
}

/// ∫ x^m (a x² + b)^n dx where `base` is `a x² + b`. Odd `m` substitutes `w = a x² + b`;
/// `n = -1` gives an arctangent; half-integer `n` substitutes `x = c sinh(t)` when `a` and `b`
/// are positive and `x = c sin(t)` when only `b` is.
fn quadratic_power(m: u32, base: &Node, n: f64, x: Param) -> Option<Node> {
    let (a, b) = normal::even_quadratic(base, x)?;
    if b == 0.0 {
        return None;
    }
    if m % 2 == 1 {
        return Some(odd_quadratic(m, base, a, b, n));
    }
    if m == 0 && n == -1.0 {
        return arctangent(a, b, x);
    }

    // After substituting, the integrand is sin^m cos^q (or sinh^m cosh^q)
    let q = 2.0 * n + 1.0;
    if q < 0.0 || q % 2.0 != 0.0 || m as f64 + q > MAX_TRIG {
        return None;
    }
    let hyperbolic = match (a > 0.0, b > 0.0) {
        (true, true) => true,
        (false, true) => false,
        _ => return None,
    };

    let r = (a / b).abs().sqrt();
    let s = Node::mul(Node::Num(r), Node::Param(x));
    let (t, wave) = if hyperbolic {
        // asinh(s), written so that its argument never comes near zero
        let square = Node::pow(s.clone(), Node::Num(2.0));
        let radius = Func::Sqrt.of(&Node::add(square, Node::Num(1.0)));
        let log = Func::Ln.of(&Node::add(Func::Abs.of(&s), radius));
        (Node::mul(Func::Sign.of(&s), log), Func::Sinh)
    } else {
        (Func::Asin.of(&s), Func::Sin)
    };

    // sin^m = (2i)^-m (z - 1/z)^m, and i^-m is (-1)^(m/2) for even m
    let mut scale = r.powi(-(m as i32) - 1) * b.powf(n);
    if !hyperbolic && m % 4 == 2 {
        scale = -scale;
    }

    let top = m as usize + q as usize;
    let coefs = laurent(m as usize, q as usize);
    let mut sum = Node::mul(Node::Num(coefs[top]), t.clone());
    for k in 1..=top {
        let c = coefs[top + k];
        if c != 0.0 {
            let harmonic = wave.of(&Node::mul(Node::Num(k as f64), t.clone()));
            sum = Node::add(sum, Node::mul(Node::Num(2.0 * c / k as f64), harmonic));
        }
    }
    Some(Node::mul(Node::Num(scale), sum))
}

/// Coefficients of `z^-n ..= z^n` in `(z - 1/z)^m (z + 1/z)^q / 2^n`, where `n = m + q`
fn laurent(m: usize, q: usize) -> Vec<f64> {
    let n = m + q;
    let mut coefs = vec![0.0; 2 * n + 1];
    coefs[n] = 1.0;
    for i in 0..n {
        let lower = if i < m { -0.5 } else { 0.5 };
        let mut next = vec![0.0; 2 * n + 1];
        for (k, c) in coefs.iter().enumerate().filter(|(_, c)| **c != 0.0) {
            next[k + 1] += 0.5 * c;
            next[k - 1] += lower * c;
        }
        coefs = next;
    }
    coefs
}

/// ∫ x^m w^n dx with `w = a x² + b` and odd `m`, by expanding `x^(m-1) = ((w - b)/a)^((m-1)/2)`
fn odd_quadratic(m: u32, w: &Node, a: f64, b: f64, n: f64) -> Node {
    let j = (m - 1) / 2;
    let mut binomial = 1.0;
    let mut sum = Node::Num(0.0);
    for i in 0..=j {
        let coef = binomial * (-b).powi((j - i) as i32) / (2.0 * a.powi(j as i32 + 1));
        let e = n + i as f64 + 1.0;
        let term = if e == 0.0 {
            Func::Ln.of(&Func::Abs.of(w))
        } else {
            Node::div(Node::pow(w.clone(), Node::Num(e)), Node::Num(e))
        };
        sum = Node::add(sum, Node::mul(Node::Num(coef), term));
        binomial = binomial * (j - i) as f64 / (i + 1) as f64;
    }
    sum
}

/// ∫ 1/(a x² + b) dx when `a` and `b` have the same sign
fn arctangent(a: f64, b: f64, x: Param) -> Option<Node> {
    if a * b <= 0.0 {
        return None;
    }
    let angle = Func::Atan.of(&Node::mul(Node::Num((a / b).sqrt()), Node::Param(x)));
    Some(Node::div(angle, Node::Num(b.signum() * (a * b).sqrt())))
}

/// ∫ x^n g(x) dx = x^n G(x) - n ∫ x^(n-1) G(x) dx, for positive integer `n`
fn by_parts(dependent: Vec<Node>, x: Param, depth: usize) -> Option<Node> {
    let mut n = 0.0;
    let mut others = Vec::new();
    for f in dependent {
        match monomial(&f, x) {
            Some(e) => n += e,
            None => others.push(f),
        }
    }

    if others.len() != 1 || n < 1.0 || n.fract() != 0.0 || n > MAX_EXPAND {
        return None;
    }
    let g = others.pop()?;
    if !matches!(
        g,
        Node::Call(Func::Sin | Func::Cos | Func::Exp | Func::Sinh | Func::Cosh, _)
    ) {
        return None;
    }

    let g_int = anti(&g, x, depth)?;
    let xn = Node::pow(Node::Param(x), Node::Num(n));
    let reduced = Node::mul(
        Node::pow(Node::Param(x), Node::Num(n - 1.0)),
        g_int.clone(),
    );
    let rest = anti(&reduced, x, depth)?;
    Some(Node::sub(
        Node::mul(xn, g_int),
        Node::mul(Node::Num(n), rest),
    ))
}
