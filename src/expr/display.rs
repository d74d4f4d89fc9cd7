//! Infix printing with the minimum of parentheses. The output uses `**` for powers and parses back
//! into an equivalent tree.

use super::Node;
use std::fmt::{Display, Formatter, Result};

const PREC_SUM: u8 = 1;
const PREC_PRODUCT: u8 = 2;
const PREC_UNARY: u8 = 3;
const PREC_POWER: u8 = 4;
const PREC_ATOM: u8 = 5;

fn precedence(node: &Node) -> u8 {
    match node {
        Node::Num(x) if *x < 0.0 => PREC_UNARY,
        Node::Num(_) | Node::Param(_) | Node::Call(_, _) => PREC_ATOM,
        Node::Neg(_) => PREC_UNARY,
        Node::Add(_, _) | Node::Sub(_, _) => PREC_SUM,
        Node::Mul(_, _) | Node::Div(_, _) => PREC_PRODUCT,
        Node::Pow(_, _) => PREC_POWER,
    }
}

/// Writes `node`, wrapped in parentheses when its precedence is below `min`
fn write_operand(f: &mut Formatter<'_>, node: &Node, min: u8) -> Result {
    if precedence(node) < min {
        write!(f, "({node})")
    } else {
        write!(f, "{node}")
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Node::Num(x) => write!(f, "{x}"),
            Node::Param(p) => write!(f, "{p}"),
            Node::Neg(a) => {
                write!(f, "-")?;
                write_operand(f, a, PREC_UNARY)
            }
            Node::Add(a, b) => {
                write_operand(f, a, PREC_SUM)?;
                write!(f, " + ")?;
                write_operand(f, b, PREC_SUM)
            }
            Node::Sub(a, b) => {
                write_operand(f, a, PREC_SUM)?;
                write!(f, " - ")?;
                write_operand(f, b, PREC_PRODUCT)
            }
            Node::Mul(a, b) => {
                write_operand(f, a, PREC_PRODUCT)?;
                write!(f, "*")?;
                write_operand(f, b, PREC_UNARY)
            }
            Node::Div(a, b) => {
                write_operand(f, a, PREC_PRODUCT)?;
                write!(f, "/")?;
                write_operand(f, b, PREC_POWER)
            }
            Node::Pow(a, b) => {
                write_operand(f, a, PREC_ATOM)?;
                write!(f, "**")?;
                write_operand(f, b, PREC_UNARY)
            }
            Node::Call(func, a) => write!(f, "{}({a})", func.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::{Expression, Param};
    use test_case::test_case;

    const UV: [Param; 2] = [Param::U, Param::V];

    #[test_case("u*cos(v)", "u*cos(v)")]
    #[test_case("4 - u**2", "4 - u**2")]
    #[test_case("(u + v)*(u - v)", "(u + v)*(u - v)")]
    #[test_case("u - (v - 1)", "u - (v - 1)")]
    #[test_case("(u*v)**2", "(u*v)**2")]
    #[test_case("u**v**2", "u**v**2")]
    #[test_case("u/(v*2)", "u/(2*v)")]
    #[test_case("-(u + v)", "-(u + v)")]
    #[test_case("u*(-v)", "-(u*v)")]
    #[test_case("sqrt(u**2 + v**2)", "sqrt(u**2 + v**2)")]
    fn prints(text: &str, expected: &str) {
        let e = Expression::parse(text, &UV).unwrap();
        assert_eq!(e.to_string(), expected);
    }

    #[test_case("u*cos(v) - 3*u/(v + 2)")]
    #[test_case("-u**2 + 2**-v")]
    #[test_case("exp(-u)*sin(2*v) - (u - v)/(u + v)**3")]
    #[test_case("u/v/2 - u*(v/2)")]
    fn reparse_is_equivalent(text: &str) {
        let e = Expression::parse(text, &UV).unwrap();
        let again = Expression::parse(&e.to_string(), &UV).unwrap();
        for (u, v) in [(0.3, 0.7), (1.5, -0.4), (2.0, 2.5)] {
            let a = e.eval_raw(u, v);
            let b = again.eval_raw(u, v);
            assert!((a - b).abs() <= 1e-12 * a.abs().max(1.0), "{e} vs {again}");
        }
    }
}
