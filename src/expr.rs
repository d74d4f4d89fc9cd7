//! This module contains the symbolic expression type used to describe the coordinate functions and
//! density fields of parametric curves and surfaces. Expressions are parsed from text, simplify
//! themselves as they are built, and can be differentiated, evaluated, and (for a limited family
//! of integrands) integrated in closed form.

mod bounds;
mod diff;
mod display;
mod eval;
mod integrate;
mod lexer;
mod normal;
mod parser;
mod simplify;

use crate::Result;
use crate::common::Interval;
use bounds::{Region, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

pub use eval::Lambda;

/// The free parameters a curve or surface expression may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Param {
    U,
    V,
}

impl Param {
    pub fn name(self) -> &'static str {
        match self {
            Param::U => "u",
            Param::V => "v",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "u" => Some(Param::U),
            "v" => Some(Param::V),
            _ => None,
        }
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The single-argument functions understood by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Cot,
    Sec,
    Csc,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Sqrt,
    Abs,
    Sign,
}

impl Func {
    /// Looks up a function by the name used in expression text. `log` and `ln` are both the
    /// natural logarithm, and `Abs` is accepted alongside `abs`.
    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "cot" => Func::Cot,
            "sec" => Func::Sec,
            "csc" => Func::Csc,
            "asin" => Func::Asin,
            "acos" => Func::Acos,
            "atan" => Func::Atan,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "exp" => Func::Exp,
            "log" | "ln" => Func::Ln,
            "sqrt" => Func::Sqrt,
            "abs" | "Abs" => Func::Abs,
            "sign" => Func::Sign,
            _ => return None,
        };
        Some(f)
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Cot => "cot",
            Func::Sec => "sec",
            Func::Csc => "csc",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Exp => "exp",
            Func::Ln => "log",
            Func::Sqrt => "sqrt",
            Func::Abs => "abs",
            Func::Sign => "sign",
        }
    }

    /// Applies the function to a plain number. Domain errors produce NaN rather than panicking.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Cot => 1.0 / x.tan(),
            Func::Sec => 1.0 / x.cos(),
            Func::Csc => 1.0 / x.sin(),
            Func::Asin => x.asin(),
            Func::Acos => x.acos(),
            Func::Atan => x.atan(),
            Func::Sinh => x.sinh(),
            Func::Cosh => x.cosh(),
            Func::Tanh => x.tanh(),
            Func::Exp => x.exp(),
            Func::Ln => x.ln(),
            Func::Sqrt => x.sqrt(),
            Func::Abs => x.abs(),
            Func::Sign => {
                if x > 0.0 {
                    1.0
                } else if x < 0.0 {
                    -1.0
                } else {
                    // Covers both zero and NaN, which stays NaN
                    x
                }
            }
        }
    }

    /// The simplified node for this function applied to `arg`
    pub(crate) fn of(self, arg: &Node) -> Node {
        Node::call(self, arg.clone())
    }
}

/// The expression tree. Nodes are only ever created through the simplifying constructors in
/// `simplify.rs` (or the parser, which uses them), so a tree never contains foldable constants.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Num(f64),
    Param(Param),
    Neg(Box<Node>),
    Add(Box<Node>, Box<Node>),
    Sub(Box<Node>, Box<Node>),
    Mul(Box<Node>, Box<Node>),
    Div(Box<Node>, Box<Node>),
    Pow(Box<Node>, Box<Node>),
    Call(Func, Box<Node>),
}

impl Node {
    pub(crate) fn depends_on(&self, p: Param) -> bool {
        match self {
            Node::Num(_) => false,
            Node::Param(q) => *q == p,
            Node::Neg(a) | Node::Call(_, a) => a.depends_on(p),
            Node::Add(a, b)
            | Node::Sub(a, b)
            | Node::Mul(a, b)
            | Node::Div(a, b)
            | Node::Pow(a, b) => a.depends_on(p) || b.depends_on(p),
        }
    }

    fn collect_params(&self, into: &mut BTreeSet<Param>) {
        match self {
            Node::Num(_) => {}
            Node::Param(q) => {
                into.insert(*q);
            }
            Node::Neg(a) | Node::Call(_, a) => a.collect_params(into),
            Node::Add(a, b)
            | Node::Sub(a, b)
            | Node::Mul(a, b)
            | Node::Div(a, b)
            | Node::Pow(a, b) => {
                a.collect_params(into);
                b.collect_params(into);
            }
        }
    }

    /// Rebuilds the tree with every occurrence of `p` replaced by `value`, re-simplifying on the
    /// way back up.
    pub(crate) fn subs(&self, p: Param, value: &Node) -> Node {
        match self {
            Node::Num(_) => self.clone(),
            Node::Param(q) if *q == p => value.clone(),
            Node::Param(_) => self.clone(),
            Node::Neg(a) => Node::neg(a.subs(p, value)),
            Node::Add(a, b) => Node::add(a.subs(p, value), b.subs(p, value)),
            Node::Sub(a, b) => Node::sub(a.subs(p, value), b.subs(p, value)),
            Node::Mul(a, b) => Node::mul(a.subs(p, value), b.subs(p, value)),
            Node::Div(a, b) => Node::div(a.subs(p, value), b.subs(p, value)),
            Node::Pow(a, b) => Node::pow(a.subs(p, value), b.subs(p, value)),
            Node::Call(f, a) => Node::call(*f, a.subs(p, value)),
        }
    }

    pub(crate) fn as_num(&self) -> Option<f64> {
        match self {
            Node::Num(x) => Some(*x),
            _ => None,
        }
    }
}

/// An immutable symbolic formula in the parameters `u` and/or `v`.
///
/// # Examples
///
/// ```
/// use paramgeom::{Expression, Param};
/// use approx::assert_relative_eq;
///
/// let x = Expression::parse("u * cos(v)", &[Param::U, Param::V]).unwrap();
/// let dx_dv = x.diff(Param::V);
/// assert_relative_eq!(dx_dv.evaluate(2.0, 0.0).unwrap(), 0.0);
/// assert_relative_eq!(x.evaluate(2.0, 0.0).unwrap(), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    node: Node,
}

impl Expression {
    pub(crate) fn from_node(node: Node) -> Self {
        Self { node }
    }

    /// Parse expression text into an `Expression`. Only the parameters listed in `params` may
    /// appear in the text; any other identifier that isn't a known function or constant (`pi`,
    /// `E`) is a parse error.
    ///
    /// # Arguments
    ///
    /// * `text`: the formula, in ordinary infix notation with `**` or `^` for powers
    /// * `params`: the parameters the formula is allowed to reference
    ///
    /// returns: Result<Expression, CalcError>
    pub fn parse(text: &str, params: &[Param]) -> Result<Self> {
        parser::parse(text, params).map(Self::from_node)
    }

    /// Create a constant expression
    pub fn constant(value: f64) -> Self {
        Self::from_node(Node::Num(value))
    }

    /// Create an expression consisting of a single parameter
    pub fn param(p: Param) -> Self {
        Self::from_node(Node::Param(p))
    }

    /// Symbolic partial derivative with respect to `p`
    pub fn diff(&self, p: Param) -> Self {
        Self::from_node(diff::diff(&self.node, p))
    }

    /// Returns true if the expression references the parameter `p`
    pub fn depends_on(&self, p: Param) -> bool {
        self.node.depends_on(p)
    }

    /// The set of parameters the expression references, in order
    pub fn params(&self) -> BTreeSet<Param> {
        let mut result = BTreeSet::new();
        self.node.collect_params(&mut result);
        result
    }

    /// Returns the value of the expression if it has folded down to a single number
    pub fn as_constant(&self) -> Option<f64> {
        self.node.as_num()
    }

    /// Replace the parameter `p` with another expression
    pub fn subs(&self, p: Param, value: &Expression) -> Self {
        Self::from_node(self.node.subs(p, &value.node))
    }

    /// Evaluate the expression at the given parameter values without any checks on the result.
    /// Parameters the expression doesn't reference are ignored.
    pub fn eval_raw(&self, u: f64, v: f64) -> f64 {
        eval::eval(&self.node, u, v)
    }

    /// Evaluate the expression at the given parameter values, failing with an evaluation error if
    /// the result is NaN or infinite.
    pub fn evaluate(&self, u: f64, v: f64) -> Result<f64> {
        eval::checked(&self.node, u, v)
    }

    /// Convert the expression into a numerically evaluable function whose positional arguments
    /// are the given parameters, in order. Fails if the expression references a parameter which
    /// isn't in the argument list.
    pub fn lambdify(&self, args: &[Param]) -> Result<Lambda> {
        Lambda::new(self.clone(), args)
    }

    /// The square root, with factors of the radicand that are squares (including those that
    /// only become squares through `sin² + cos² = 1`) taken outside as absolute values
    pub fn sqrt(&self) -> Self {
        Self::from_node(normal::sqrt(&self.node))
    }

    pub fn powi(&self, n: i32) -> Self {
        Self::from_node(Node::pow(self.node.clone(), Node::Num(n as f64)))
    }

    /// Closed-form antiderivative with respect to `p`, or a `NoClosedForm` error if none of the
    /// integration rules apply.
    pub fn antiderivative(&self, p: Param) -> Result<Self> {
        integrate::antiderivative(&self.node, p).map(Self::from_node)
    }

    /// Closed-form definite integral with respect to `p` over `[a, b]`. The result no longer
    /// depends on `p`. Fails with an `Integration` error if the antiderivative has a pole between
    /// the limits.
    pub fn integrate_definite(&self, p: Param, a: f64, b: f64) -> Result<Self> {
        integrate::definite(&self.node, p, a, b, Region::unbounded()).map(Self::from_node)
    }

    /// Closed-form definite integral with respect to `p` over `limits`, where the other
    /// parameter is known to stay within `other`. Knowing that range lets absolute values and
    /// signs of the other parameter be resolved before integrating, and poles be located.
    ///
    /// # Examples
    ///
    /// ```
    /// use paramgeom::{Expression, Param};
    ///
    /// let e = Expression::parse("abs(v)*u", &[Param::U, Param::V]).unwrap();
    /// let over_u = e.integrate_definite_within(Param::U, [0.0, 2.0].into(), [1.0, 3.0].into());
    /// assert_eq!(over_u.unwrap().to_string(), "2*v");
    /// ```
    pub fn integrate_definite_within(
        &self,
        p: Param,
        limits: Interval,
        other: Interval,
    ) -> Result<Self> {
        limits.check_bounds()?;
        other.check_bounds()?;
        let q = match p {
            Param::U => Param::V,
            Param::V => Param::U,
        };
        let region = Region::unbounded().with(q, Span::new(other.min, other.max));
        integrate::definite(&self.node, p, limits.min, limits.max, region).map(Self::from_node)
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.node)
    }
}

impl std::ops::Add for &Expression {
    type Output = Expression;

    fn add(self, rhs: Self) -> Self::Output {
        Expression::from_node(Node::add(self.node.clone(), rhs.node.clone()))
    }
}

impl std::ops::Sub for &Expression {
    type Output = Expression;

    fn sub(self, rhs: Self) -> Self::Output {
        Expression::from_node(Node::sub(self.node.clone(), rhs.node.clone()))
    }
}

impl std::ops::Mul for &Expression {
    type Output = Expression;

    fn mul(self, rhs: Self) -> Self::Output {
        Expression::from_node(Node::mul(self.node.clone(), rhs.node.clone()))
    }
}

impl std::ops::Div for &Expression {
    type Output = Expression;

    fn div(self, rhs: Self) -> Self::Output {
        Expression::from_node(Node::div(self.node.clone(), rhs.node.clone()))
    }
}

impl std::ops::Neg for &Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output {
        Expression::from_node(Node::neg(self.node.clone()))
    }
}
