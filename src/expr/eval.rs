//! Numerical evaluation of expression trees.

use super::{Expression, Node, Param};
use crate::{CalcError, Result};

pub(crate) fn eval(node: &Node, u: f64, v: f64) -> f64 {
    match node {
        Node::Num(x) => *x,
        Node::Param(Param::U) => u,
        Node::Param(Param::V) => v,
        Node::Neg(a) => -eval(a, u, v),
        Node::Add(a, b) => eval(a, u, v) + eval(b, u, v),
        Node::Sub(a, b) => eval(a, u, v) - eval(b, u, v),
        Node::Mul(a, b) => eval(a, u, v) * eval(b, u, v),
        Node::Div(a, b) => eval(a, u, v) / eval(b, u, v),
        Node::Pow(a, b) => power(eval(a, u, v), eval(b, u, v)),
        Node::Call(f, a) => f.apply(eval(a, u, v)),
    }
}

/// `powf` with integer exponents routed through `powi`, which is both faster and exact for
/// negative bases
fn power(base: f64, exponent: f64) -> f64 {
    if exponent.fract() == 0.0 && exponent.abs() <= i32::MAX as f64 {
        base.powi(exponent as i32)
    } else {
        base.powf(exponent)
    }
}

pub(crate) fn checked(node: &Node, u: f64, v: f64) -> Result<f64> {
    let value = eval(node, u, v);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::Evaluation(format!(
            "{node} is {value} at u={u}, v={v}"
        )))
    }
}

/// A numerically evaluable function built from an `Expression`, taking positional arguments in
/// the order of the parameters it was created with.
///
/// # Examples
///
/// ```
/// use paramgeom::{Expression, Param};
///
/// let e = Expression::parse("u - 2*v", &[Param::U, Param::V]).unwrap();
/// let f = e.lambdify(&[Param::V, Param::U]).unwrap();
/// assert_eq!(f.call(&[1.0, 5.0]).unwrap(), 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct Lambda {
    expr: Expression,
    args: Vec<Param>,
}

impl Lambda {
    pub(crate) fn new(expr: Expression, args: &[Param]) -> Result<Self> {
        if let Some(missing) = expr.params().into_iter().find(|p| !args.contains(p)) {
            return Err(CalcError::Construction(format!(
                "{expr} depends on {missing}, which is not an argument"
            )));
        }
        Ok(Self {
            expr,
            args: args.to_vec(),
        })
    }

    pub fn args(&self) -> &[Param] {
        &self.args
    }

    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    /// Evaluate the function. Fails if the number of values doesn't match the number of
    /// arguments, or if the result isn't finite.
    pub fn call(&self, values: &[f64]) -> Result<f64> {
        if values.len() != self.args.len() {
            return Err(CalcError::Evaluation(format!(
                "expected {} arguments, got {}",
                self.args.len(),
                values.len()
            )));
        }

        let mut u = 0.0;
        let mut v = 0.0;
        for (p, x) in self.args.iter().zip(values) {
            match p {
                Param::U => u = *x,
                Param::V => v = *x,
            }
        }
        self.expr.evaluate(u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use approx::assert_relative_eq;

    #[test]
    fn negative_base_integer_power() {
        let e = Expression::parse("u**3", &[Param::U]).unwrap();
        assert_relative_eq!(e.evaluate(-2.0, 0.0).unwrap(), -8.0);
    }

    #[test]
    fn lambdify_rejects_missing_argument() {
        let e = Expression::parse("u + v", &[Param::U, Param::V]).unwrap();
        let err = e.lambdify(&[Param::U]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn lambda_arity() {
        let e = Expression::parse("u", &[Param::U]).unwrap();
        let f = e.lambdify(&[Param::U]).unwrap();
        assert_eq!(f.call(&[4.0]).unwrap(), 4.0);
        assert_eq!(f.call(&[1.0, 2.0]).unwrap_err().kind(), ErrorKind::Evaluation);
    }

    #[test]
    fn lambda_of_constant() {
        let e = Expression::constant(2.5);
        let f = e.lambdify(&[Param::U, Param::V]).unwrap();
        assert_eq!(f.call(&[9.0, 9.0]).unwrap(), 2.5);
    }

    #[test]
    fn division_by_zero_is_evaluation_error() {
        let e = Expression::parse("1/u", &[Param::U]).unwrap();
        let err = e.evaluate(0.0, 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
    }
}
