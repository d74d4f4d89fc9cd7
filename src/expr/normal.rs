//! A polynomial normal form over the non-polynomial parts of an expression, used to simplify
//! square roots.
//!
//! An expression is expanded into a sum of terms, each a coefficient times a product of integer
//! powers of atoms. Atoms are parameters, function calls, and anything else that isn't a sum,
//! product, quotient or integer power. Powers of `sin` and `sinh` above the first are rewritten
//! with `sin² = 1 - cos²` and `sinh² = cosh² - 1`, so expressions which only differ by those
//! identities expand to the same terms.

use super::{Func, Node, Param};
use std::cmp::Ordering;

/// Largest integer power of a sum that is expanded
const MAX_POWER: f64 = 8.0;

/// Expansion gives up past this many terms
const MAX_TERMS: usize = 1024;

/// Coefficients this small relative to the largest coefficient of the radicand have cancelled
const CANCELLED: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
struct Factor {
    key: String,
    atom: Node,
    exp: i32,
}

#[derive(Debug, Clone, PartialEq)]
struct Term {
    coef: f64,

    /// Sorted by key, never with a zero exponent
    factors: Vec<Factor>,
}

impl Term {
    fn constant(coef: f64) -> Self {
        Self {
            coef,
            factors: Vec::new(),
        }
    }

    fn atom(atom: Node, exp: i32) -> Self {
        Self {
            coef: 1.0,
            factors: vec![Factor {
                key: atom.to_string(),
                atom,
                exp,
            }],
        }
    }

    fn exponent(&self, key: &str) -> i32 {
        self.factors
            .binary_search_by(|f| f.key.as_str().cmp(key))
            .map_or(0, |i| self.factors[i].exp)
    }

    fn degree(&self) -> i32 {
        self.factors.iter().map(|f| f.exp).sum()
    }

    fn same_monomial(&self, other: &Term) -> bool {
        self.factors.len() == other.factors.len()
            && self
                .factors
                .iter()
                .zip(other.factors.iter())
                .all(|(a, b)| a.key == b.key && a.exp == b.exp)
    }

    fn mul(&self, other: &Term) -> Term {
        let mut factors = self.factors.clone();
        for f in &other.factors {
            match factors.binary_search_by(|g| g.key.cmp(&f.key)) {
                Ok(i) => {
                    factors[i].exp += f.exp;
                    if factors[i].exp == 0 {
                        factors.remove(i);
                    }
                }
                Err(i) => factors.insert(i, f.clone()),
            }
        }
        Term {
            coef: self.coef * other.coef,
            factors,
        }
    }

    fn inverse(&self) -> Term {
        Term {
            coef: 1.0 / self.coef,
            factors: self
                .factors
                .iter()
                .map(|f| Factor {
                    exp: -f.exp,
                    ..f.clone()
                })
                .collect(),
        }
    }

    /// `self / other` when the quotient is a monomial with no negative exponents
    fn divide(&self, other: &Term) -> Option<Term> {
        let q = self.mul(&other.inverse());
        q.factors.iter().all(|f| f.exp > 0).then_some(q)
    }

    fn without(&self, key: &str) -> Term {
        Term {
            coef: self.coef,
            factors: self
                .factors
                .iter()
                .filter(|f| f.key != key)
                .cloned()
                .collect(),
        }
    }

    /// Graded lexicographic order: total degree first, then the exponents of the atoms in key
    /// order
    fn cmp_order(&self, other: &Term) -> Ordering {
        self.degree().cmp(&other.degree()).then_with(|| {
            let mut keys = self
                .factors
                .iter()
                .chain(other.factors.iter())
                .map(|f| f.key.as_str())
                .collect::<Vec<_>>();
            keys.sort_unstable();
            keys.dedup();
            keys.into_iter()
                .map(|k| self.exponent(k).cmp(&other.exponent(k)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
    }

    fn monomial_node(&self) -> Node {
        self.factors.iter().fold(Node::Num(1.0), |acc, f| {
            Node::mul(acc, Node::pow(f.atom.clone(), Node::Num(f.exp as f64)))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Poly {
    terms: Vec<Term>,
}

impl Poly {
    fn constant(c: f64) -> Self {
        let mut p = Poly::default();
        p.push(Term::constant(c));
        p
    }

    fn from_term(t: Term) -> Self {
        let mut p = Poly::default();
        p.push(t);
        p
    }

    fn atom(atom: Node, exp: i32) -> Self {
        Poly::from_term(Term::atom(atom, exp))
    }

    fn push(&mut self, t: Term) {
        if t.coef == 0.0 {
            return;
        }
        match self.terms.iter().position(|s| s.same_monomial(&t)) {
            Some(i) => {
                self.terms[i].coef += t.coef;
                if self.terms[i].coef == 0.0 {
                    self.terms.swap_remove(i);
                }
            }
            None => self.terms.push(t),
        }
    }

    fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    fn add(mut self, other: Poly) -> Poly {
        for t in other.terms {
            self.push(t);
        }
        self
    }

    fn sub(self, other: Poly) -> Poly {
        self.add(other.scale(-1.0))
    }

    fn scale(mut self, c: f64) -> Poly {
        for t in &mut self.terms {
            t.coef *= c;
        }
        self.terms.retain(|t| t.coef != 0.0);
        self
    }

    fn mul(&self, other: &Poly) -> Option<Poly> {
        if self.terms.len() * other.terms.len() > 4 * MAX_TERMS {
            return None;
        }
        let mut out = Poly::default();
        for a in &self.terms {
            for b in &other.terms {
                out.push(a.mul(b));
            }
        }
        (out.terms.len() <= MAX_TERMS).then_some(out)
    }

    fn pow(&self, n: u32) -> Option<Poly> {
        let mut out = Poly::constant(1.0);
        for _ in 0..n {
            out = out.mul(self)?;
        }
        Some(out)
    }

    fn times_atom(&self, factor: &Factor, exp: i32) -> Poly {
        if exp == 0 {
            return self.clone();
        }
        let t = Term::atom(factor.atom.clone(), exp);
        let mut out = Poly::default();
        for s in &self.terms {
            out.push(s.mul(&t));
        }
        out
    }

    /// The only term, if there is exactly one and it can be inverted
    fn single_term(&self) -> Option<&Term> {
        match self.terms.as_slice() {
            [t] if t.coef.is_finite() => Some(t),
            _ => None,
        }
    }

    fn from_node(node: &Node) -> Option<Poly> {
        let poly = match node {
            Node::Num(c) => Poly::constant(*c),
            Node::Param(_) | Node::Call(_, _) => Poly::atom(node.clone(), 1),
            Node::Neg(a) => Poly::from_node(a)?.scale(-1.0),
            Node::Add(a, b) => Poly::from_node(a)?.add(Poly::from_node(b)?),
            Node::Sub(a, b) => Poly::from_node(a)?.sub(Poly::from_node(b)?),
            Node::Mul(a, b) => Poly::from_node(a)?.mul(&Poly::from_node(b)?)?,
            Node::Div(a, b) => {
                let numerator = Poly::from_node(a)?;
                let denominator = Poly::from_node(b)?;
                match denominator.single_term() {
                    Some(t) => numerator.mul(&Poly::from_term(t.inverse()))?,
                    None => numerator.mul(&Poly::atom((**b).clone(), -1))?,
                }
            }
            Node::Pow(base, exponent) => match exponent.as_num() {
                Some(n) if n.fract() == 0.0 && (0.0..=MAX_POWER).contains(&n) => {
                    Poly::from_node(base)?.pow(n as u32)?
                }
                Some(n) if n.fract() == 0.0 && (-MAX_POWER..0.0).contains(&n) => {
                    let inner = Poly::from_node(base)?;
                    match inner.single_term() {
                        Some(t) => Poly::from_term(t.inverse()).pow(-n as u32)?,
                        None => Poly::atom((**base).clone(), n as i32),
                    }
                }
                _ => Poly::atom(node.clone(), 1),
            },
        };
        (poly.terms.len() <= MAX_TERMS).then_some(poly)
    }

    /// Rewrites `sin^k` as `sin^(k mod 2) (1 - cos²)^(k / 2)`, and likewise for `sinh`
    fn reduce_squares(self) -> Option<Poly> {
        let mut result = Poly::default();
        for term in self.terms {
            let mut rest = Term::constant(term.coef);
            let mut replaced = Poly::constant(1.0);
            for f in term.factors {
                let identity = match &f.atom {
                    Node::Call(Func::Sin, arg) if f.exp >= 2 => {
                        Some(Poly::constant(1.0).sub(Poly::atom(Func::Cos.of(arg), 2)))
                    }
                    Node::Call(Func::Sinh, arg) if f.exp >= 2 => {
                        Some(Poly::atom(Func::Cosh.of(arg), 2).sub(Poly::constant(1.0)))
                    }
                    _ => None,
                };
                match identity {
                    Some(identity) => {
                        replaced = replaced.mul(&identity.pow((f.exp / 2) as u32)?)?;
                        if f.exp % 2 == 1 {
                            rest.factors.push(Factor { exp: 1, ..f });
                        }
                    }
                    None => rest.factors.push(f),
                }
            }
            result = result.add(Poly::from_term(rest).mul(&replaced)?);
            if result.terms.len() > MAX_TERMS {
                return None;
            }
        }
        Some(result)
    }

    fn max_coef(&self) -> f64 {
        self.terms.iter().map(|t| t.coef.abs()).fold(0.0, f64::max)
    }

    fn prune(&mut self, scale: f64) {
        self.terms.retain(|t| t.coef.abs() > CANCELLED * scale);
    }

    fn leading(&self) -> Option<&Term> {
        self.terms.iter().max_by(|a, b| a.cmp_order(b))
    }

    /// Removes the largest even power of every atom that divides all terms, returning the
    /// square roots of the removed factors
    fn take_square_content(&mut self) -> Vec<Node> {
        let Some(first) = self.terms.first() else {
            return Vec::new();
        };

        let mut outside = Vec::new();
        for f in first.factors.clone() {
            let least = self
                .terms
                .iter()
                .map(|t| t.exponent(&f.key))
                .min()
                .unwrap_or(0);
            let half = least / 2;
            if half < 1 {
                continue;
            }
            let removed = Term::atom(f.atom.clone(), -2 * half);
            for t in &mut self.terms {
                *t = t.mul(&removed);
            }
            outside.push(abs_power(&f.atom, half));
        }
        outside
    }

    /// If the polynomial is `Q (c² - 1)` for an atom `c = cos(a)` or `cosh(a)`, replaces it by
    /// the other factor and returns `|sin(a)|` or `|sinh(a)|`, the square root of the removed
    /// factor
    fn take_pythagorean(&mut self, scale: f64) -> Option<Node> {
        let mut candidates: Vec<Factor> = Vec::new();
        for f in self.terms.iter().flat_map(|t| t.factors.iter()) {
            let circular = matches!(f.atom, Node::Call(Func::Cos | Func::Cosh, _));
            if circular && !candidates.iter().any(|c| c.key == f.key) {
                candidates.push(f.clone());
            }
        }

        for c in candidates {
            let Some(q) = self.divide_by_square_minus_one(&c, scale) else {
                continue;
            };
            // 1 - cos² = sin² and cosh² - 1 = sinh²
            let (quotient, root) = match &c.atom {
                Node::Call(Func::Cos, arg) => (q.scale(-1.0), Func::Sin.of(arg)),
                Node::Call(Func::Cosh, arg) => (q, Func::Sinh.of(arg)),
                _ => continue,
            };
            *self = quotient;
            return Some(Node::call(Func::Abs, root));
        }
        None
    }

    fn divide_by_square_minus_one(&self, atom: &Factor, scale: f64) -> Option<Poly> {
        let degree = self.terms.iter().map(|t| t.exponent(&atom.key)).max()?;
        let lowest = self.terms.iter().map(|t| t.exponent(&atom.key)).min()?;
        if degree < 2 || lowest < 0 {
            return None;
        }

        // rem[k] collects the coefficient of atom^k
        let mut rem = vec![Poly::default(); degree as usize + 1];
        for t in &self.terms {
            rem[t.exponent(&atom.key) as usize].push(t.without(&atom.key));
        }

        let mut quotient = Poly::default();
        for k in (2..rem.len()).rev() {
            let c = std::mem::take(&mut rem[k]);
            if c.is_zero() {
                continue;
            }
            quotient = quotient.add(c.times_atom(atom, k as i32 - 2));
            let lower = std::mem::take(&mut rem[k - 2]);
            rem[k - 2] = lower.add(c);
        }

        for r in rem.iter_mut().take(2) {
            r.prune(scale);
            if !r.is_zero() {
                return None;
            }
        }
        Some(quotient)
    }

    /// The polynomial whose square this is, found one term at a time from the leading term down
    fn exact_sqrt(&self, scale: f64) -> Option<Poly> {
        let lead = self.leading()?;
        if lead.coef <= 0.0 || lead.factors.iter().any(|f| f.exp % 2 != 0) {
            return None;
        }
        let root_lead = Term {
            coef: lead.coef.sqrt(),
            factors: lead
                .factors
                .iter()
                .map(|f| Factor {
                    exp: f.exp / 2,
                    ..f.clone()
                })
                .collect(),
        };
        let twice_lead = Term {
            coef: 2.0 * root_lead.coef,
            ..root_lead.clone()
        };

        let mut root = Poly::from_term(root_lead.clone());
        for _ in 0..=self.terms.len() {
            let mut rest = self.clone().sub(root.mul(&root)?);
            rest.prune(scale);
            let Some(next) = rest.leading() else {
                return Some(root);
            };
            let t = next.divide(&twice_lead)?;
            if t.cmp_order(&root_lead) != Ordering::Less {
                return None;
            }
            root = root.add(Poly::from_term(t));
        }
        None
    }

    fn to_node(&self) -> Node {
        let mut terms = self.terms.clone();
        terms.sort_by(|a, b| b.cmp_order(a));
        terms.iter().fold(Node::Num(0.0), |acc, t| {
            let monomial = t.monomial_node();
            if t.coef < 0.0 {
                Node::sub(acc, Node::mul(Node::Num(-t.coef), monomial))
            } else {
                Node::add(acc, Node::mul(Node::Num(t.coef), monomial))
            }
        })
    }
}

fn non_negative(node: &Node) -> bool {
    match node {
        Node::Call(Func::Exp | Func::Cosh | Func::Sqrt | Func::Abs, _) => true,
        Node::Pow(_, n) => n.as_num().is_some_and(|n| n.fract() == 0.0 && n % 2.0 == 0.0),
        _ => false,
    }
}

/// |atom|^k, without the absolute value where it can't matter
fn abs_power(atom: &Node, k: i32) -> Node {
    let base = if k % 2 == 0 || non_negative(atom) {
        atom.clone()
    } else {
        Node::call(Func::Abs, atom.clone())
    };
    Node::pow(base, Node::Num(k as f64))
}

/// The square root of `radicand`, with the radicand brought to its normal form and with every
/// factor that is recognizably a square moved outside the root as an absolute value. Falls back
/// to a plain square root when the radicand is too large to expand.
pub(crate) fn sqrt(radicand: &Node) -> Node {
    let Some(mut inside) = Poly::from_node(radicand).and_then(Poly::reduce_squares) else {
        return Node::call(Func::Sqrt, radicand.clone());
    };
    let scale = inside.max_coef();
    inside.prune(scale);
    if inside.is_zero() {
        return Node::Num(0.0);
    }

    let mut outside = inside.take_square_content();
    while let Some(root) = inside.take_pythagorean(scale) {
        outside.push(root);
    }
    outside.extend(inside.take_square_content());
    if let Some(root) = inside.exact_sqrt(scale) {
        outside.push(Node::call(Func::Abs, root.to_node()));
        inside = Poly::constant(1.0);
    }

    outside
        .into_iter()
        .fold(Node::call(Func::Sqrt, inside.to_node()), |acc, f| {
            Node::mul(f, acc)
        })
}

/// The coefficients `(a, b)` if `node` expands to `a x² + b` with numbers `a != 0` and `b`
pub(crate) fn even_quadratic(node: &Node, x: Param) -> Option<(f64, f64)> {
    let poly = Poly::from_node(node)?;
    let (mut a, mut b) = (0.0, 0.0);
    for t in &poly.terms {
        match t.factors.as_slice() {
            [] => b += t.coef,
            [f] if f.atom == Node::Param(x) && f.exp == 2 => a += t.coef,
            _ => return None,
        }
    }
    (a != 0.0).then_some((a, b))
}
