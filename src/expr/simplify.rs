//! Simplifying constructors for expression nodes. Every node in a tree is built through one of
//! these, which fold constant subtrees and remove additive and multiplicative identities. They
//! are not a general simplifier: they only look one level down.

use super::{Func, Node};

/// Folds a computed constant, refusing results that aren't finite so that domain errors (such as
/// `sqrt(-1)`) stay in the tree and surface when the expression is evaluated.
fn fold(value: f64) -> Option<Node> {
    if value.is_finite() {
        Some(Node::Num(value))
    } else {
        None
    }
}

fn is_num(node: &Node, value: f64) -> bool {
    matches!(node, Node::Num(x) if *x == value)
}

impl Node {
    pub(crate) fn neg(a: Node) -> Node {
        match a {
            Node::Num(x) => Node::Num(-x),
            Node::Neg(inner) => *inner,
            Node::Sub(x, y) => Node::Sub(y, x),
            other => Node::Neg(Box::new(other)),
        }
    }

    pub(crate) fn add(a: Node, b: Node) -> Node {
        if let (Node::Num(x), Node::Num(y)) = (&a, &b) {
            return Node::Num(x + y);
        }
        if is_num(&a, 0.0) {
            return b;
        }
        if is_num(&b, 0.0) {
            return a;
        }
        match (a, b) {
            (a, Node::Neg(b)) => Node::sub(a, *b),
            (a, Node::Num(y)) if y < 0.0 => Node::sub(a, Node::Num(-y)),
            (Node::Neg(a), b) => Node::sub(b, *a),
            (a, b) => Node::Add(Box::new(a), Box::new(b)),
        }
    }

    pub(crate) fn sub(a: Node, b: Node) -> Node {
        if let (Node::Num(x), Node::Num(y)) = (&a, &b) {
            return Node::Num(x - y);
        }
        if is_num(&b, 0.0) {
            return a;
        }
        if is_num(&a, 0.0) {
            return Node::neg(b);
        }
        if a == b {
            return Node::Num(0.0);
        }
        match (a, b) {
            (a, Node::Neg(b)) => Node::add(a, *b),
            (a, b) => Node::Sub(Box::new(a), Box::new(b)),
        }
    }

    pub(crate) fn mul(a: Node, b: Node) -> Node {
        if let (Node::Num(x), Node::Num(y)) = (&a, &b) {
            return Node::Num(x * y);
        }
        if is_num(&a, 0.0) || is_num(&b, 0.0) {
            return Node::Num(0.0);
        }
        if is_num(&a, 1.0) {
            return b;
        }
        if is_num(&b, 1.0) {
            return a;
        }
        if is_num(&a, -1.0) {
            return Node::neg(b);
        }
        if is_num(&b, -1.0) {
            return Node::neg(a);
        }

        match (a, b) {
            (Node::Neg(a), Node::Neg(b)) => Node::mul(*a, *b),
            (Node::Neg(a), b) => Node::neg(Node::mul(*a, b)),
            (a, Node::Neg(b)) => Node::neg(Node::mul(a, *b)),
            // Keep numeric coefficients on the left and merge them
            (a, Node::Num(y)) => Node::mul(Node::Num(y), a),
            (Node::Num(x), Node::Mul(c, rest)) if c.as_num().is_some() => {
                let c = c.as_num().unwrap_or(1.0);
                Node::mul(Node::Num(x * c), *rest)
            }
            (a, b) if a == b => Node::pow(a, Node::Num(2.0)),
            (a, b) => Node::Mul(Box::new(a), Box::new(b)),
        }
    }

    pub(crate) fn div(a: Node, b: Node) -> Node {
        if let (Node::Num(x), Node::Num(y)) = (&a, &b) {
            if let Some(n) = fold(x / y) {
                return n;
            }
        }
        if is_num(&b, 1.0) {
            return a;
        }
        if is_num(&b, -1.0) {
            return Node::neg(a);
        }
        if is_num(&a, 0.0) && !is_num(&b, 0.0) {
            return Node::Num(0.0);
        }
        match (a, b) {
            (Node::Neg(a), Node::Neg(b)) => Node::div(*a, *b),
            (Node::Neg(a), b) => Node::neg(Node::div(*a, b)),
            (a, Node::Neg(b)) => Node::neg(Node::div(a, *b)),
            (a, b) => Node::Div(Box::new(a), Box::new(b)),
        }
    }

    pub(crate) fn pow(a: Node, b: Node) -> Node {
        if let (Node::Num(x), Node::Num(y)) = (&a, &b) {
            if let Some(n) = fold(x.powf(*y)) {
                return n;
            }
        }
        if is_num(&b, 0.0) {
            return Node::Num(1.0);
        }
        if is_num(&b, 1.0) {
            return a;
        }
        if is_num(&a, 1.0) {
            return Node::Num(1.0);
        }
        match (a, b) {
            // (-x)^n is x^n for even integer n
            (Node::Neg(inner), Node::Num(n)) if n.fract() == 0.0 && n % 2.0 == 0.0 => {
                Node::pow(*inner, Node::Num(n))
            }
            // (x^p)^q is x^(pq) for integer q
            (Node::Pow(inner, p), Node::Num(q)) if q.fract() == 0.0 && p.as_num().is_some() => {
                let p = p.as_num().unwrap_or(1.0);
                Node::pow(*inner, Node::Num(p * q))
            }
            (a, b) => Node::Pow(Box::new(a), Box::new(b)),
        }
    }

    pub(crate) fn call(f: Func, a: Node) -> Node {
        if let Node::Num(x) = a {
            if let Some(n) = fold(f.apply(x)) {
                return n;
            }
        }
        match (f, a) {
            (Func::Abs, Node::Neg(inner)) => Node::call(Func::Abs, *inner),
            (Func::Abs, Node::Call(Func::Abs, inner)) => Node::call(Func::Abs, *inner),
            (Func::Ln, Node::Call(Func::Exp, inner)) => *inner,
            (f, a) => Node::Call(f, Box::new(a)),
        }
    }
}
