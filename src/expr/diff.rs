//! Symbolic partial differentiation.

use super::{Func, Node, Param};

pub(crate) fn diff(node: &Node, p: Param) -> Node {
    if !node.depends_on(p) {
        return Node::Num(0.0);
    }

    match node {
        Node::Num(_) => Node::Num(0.0),
        Node::Param(q) => Node::Num(if *q == p { 1.0 } else { 0.0 }),
        Node::Neg(a) => Node::neg(diff(a, p)),
        Node::Add(a, b) => Node::add(diff(a, p), diff(b, p)),
        Node::Sub(a, b) => Node::sub(diff(a, p), diff(b, p)),
        Node::Mul(a, b) => Node::add(
            Node::mul(diff(a, p), (**b).clone()),
            Node::mul((**a).clone(), diff(b, p)),
        ),
        Node::Div(a, b) => {
            if !b.depends_on(p) {
                return Node::div(diff(a, p), (**b).clone());
            }
            let numerator = Node::sub(
                Node::mul(diff(a, p), (**b).clone()),
                Node::mul((**a).clone(), diff(b, p)),
            );
            Node::div(numerator, Node::pow((**b).clone(), Node::Num(2.0)))
        }
        Node::Pow(a, b) => diff_pow(a, b, p),
        Node::Call(f, a) => Node::mul(outer_derivative(*f, a), diff(a, p)),
    }
}

fn diff_pow(base: &Node, exponent: &Node, p: Param) -> Node {
    if !exponent.depends_on(p) {
        // d(a^n) = n a^(n-1) da
        let reduced = Node::sub(exponent.clone(), Node::Num(1.0));
        return Node::mul(
            Node::mul(exponent.clone(), Node::pow(base.clone(), reduced)),
            diff(base, p),
        );
    }

    let ln_base = Node::call(Func::Ln, base.clone());
    let whole = Node::pow(base.clone(), exponent.clone());
    if !base.depends_on(p) {
        // d(c^b) = c^b ln(c) db
        return Node::mul(Node::mul(whole, ln_base), diff(exponent, p));
    }

    // d(a^b) = a^b (db ln(a) + b da / a)
    let inner = Node::add(
        Node::mul(diff(exponent, p), ln_base),
        Node::div(Node::mul(exponent.clone(), diff(base, p)), base.clone()),
    );
    Node::mul(whole, inner)
}

/// The derivative of `f` evaluated at `a`, before the chain rule factor is applied
fn outer_derivative(f: Func, a: &Node) -> Node {
    let a = a.clone();
    let one = || Node::Num(1.0);
    let square = |n: Node| Node::pow(n, Node::Num(2.0));

    match f {
        Func::Sin => Node::call(Func::Cos, a),
        Func::Cos => Node::neg(Node::call(Func::Sin, a)),
        Func::Tan => Node::div(one(), square(Node::call(Func::Cos, a))),
        Func::Cot => Node::neg(Node::div(one(), square(Node::call(Func::Sin, a)))),
        Func::Sec => Node::mul(Node::call(Func::Sec, a.clone()), Node::call(Func::Tan, a)),
        Func::Csc => Node::neg(Node::mul(
            Node::call(Func::Csc, a.clone()),
            Node::call(Func::Cot, a),
        )),
        Func::Asin => Node::div(
            one(),
            Node::call(Func::Sqrt, Node::sub(one(), square(a))),
        ),
        Func::Acos => Node::neg(Node::div(
            one(),
            Node::call(Func::Sqrt, Node::sub(one(), square(a))),
        )),
        Func::Atan => Node::div(one(), Node::add(one(), square(a))),
        Func::Sinh => Node::call(Func::Cosh, a),
        Func::Cosh => Node::call(Func::Sinh, a),
        Func::Tanh => Node::div(one(), square(Node::call(Func::Cosh, a))),
        Func::Exp => Node::call(Func::Exp, a),
        Func::Ln => Node::div(one(), a),
        Func::Sqrt => Node::div(
            one(),
            Node::mul(Node::Num(2.0), Node::call(Func::Sqrt, a)),
        ),
        Func::Abs => Node::call(Func::Sign, a),
        Func::Sign => Node::Num(0.0),
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::{Expression, Param};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_case::test_case;

    const UV: [Param; 2] = [Param::U, Param::V];

    fn d(text: &str, p: Param) -> String {
        Expression::parse(text, &UV).unwrap().diff(p).to_string()
    }

    #[test_case("u", Param::U, "1")]
    #[test_case("u", Param::V, "0")]
    #[test_case("3*u**2", Param::U, "6*u")]
    #[test_case("u*cos(v)", Param::U, "cos(v)")]
    #[test_case("u*cos(v)", Param::V, "-(u*sin(v))")]
    #[test_case("4 - u**2", Param::U, "-(2*u)")]
    #[test_case("sin(u)*cos(v)", Param::V, "-(sin(u)*sin(v))")]
    fn symbolic_forms(text: &str, p: Param, expected: &str) {
        assert_eq!(d(text, p), expected);
    }

    /// Compares symbolic derivatives against central differences at random points in a region
    /// where every test function is defined
    #[test_case("u*cos(v)")]
    #[test_case("u**3 - 2*u*v + v**2")]
    #[test_case("sin(u)*sin(v)")]
    #[test_case("exp(-u*v)/(1 + u**2)")]
    #[test_case("sqrt(u**2 + v**2 + 1)")]
    #[test_case("log(u + 2) * tan(v)")]
    #[test_case("u**v")]
    #[test_case("2**(u*v)")]
    #[test_case("asin(u/2) + acos(v/2) + atan(u*v)")]
    #[test_case("sinh(u) + cosh(v) + tanh(u - v)")]
    #[test_case("sec(u) + csc(v + 2) + cot(u + 2)")]
    #[test_case("abs(u - 0.1) * v")]
    fn matches_finite_differences(text: &str) {
        let e = Expression::parse(text, &UV).unwrap();
        let du = e.diff(Param::U);
        let dv = e.diff(Param::V);
        let h = 1e-6;
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let u = rng.random_range(0.2..0.9);
            let v = rng.random_range(0.2..0.9);
            let fd_u = (e.eval_raw(u + h, v) - e.eval_raw(u - h, v)) / (2.0 * h);
            let fd_v = (e.eval_raw(u, v + h) - e.eval_raw(u, v - h)) / (2.0 * h);
            assert_relative_eq!(du.eval_raw(u, v), fd_u, epsilon = 1e-5, max_relative = 1e-5);
            assert_relative_eq!(dv.eval_raw(u, v), fd_v, epsilon = 1e-5, max_relative = 1e-5);
        }
    }

    #[test]
    fn differentiation_is_deterministic() {
        let e = Expression::parse("u*cos(v) + exp(u*v)", &UV).unwrap();
        assert_eq!(e.diff(Param::V), e.diff(Param::V));

        // Mixed partials agree numerically even though the trees differ
        let uv = e.diff(Param::U).diff(Param::V);
        let vu = e.diff(Param::V).diff(Param::U);
        for (u, v) in [(0.1, 0.2), (1.3, -0.7), (2.0, 3.0)] {
            assert_relative_eq!(uv.eval_raw(u, v), vu.eval_raw(u, v), max_relative = 1e-10);
        }
    }
}
