//! Recursive-descent parser producing simplified expression trees.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary (POW unary)?
//! primary := NUMBER | IDENT | IDENT '(' expr ')' | '(' expr ')'
//! ```
//!
//! The power operator is right associative and binds tighter than unary minus, so `-u**2` is
//! `-(u**2)` and `2**-1` is allowed.

use super::lexer::{Tok, Token, tokenize};
use super::{Func, Node, Param};
use crate::{CalcError, Result};
use std::f64::consts::{E, PI};

/// Nesting beyond this depth is rejected rather than risking the stack
const MAX_DEPTH: usize = 200;

pub(crate) fn parse(text: &str, params: &[Param]) -> Result<Node> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(CalcError::parse(0, "empty expression"));
    }

    let mut parser = Parser {
        tokens,
        index: 0,
        params,
        depth: 0,
        end: text.len(),
    };
    let node = parser.expr()?;

    match parser.peek() {
        None => Ok(node),
        Some(t) => Err(CalcError::parse(t.pos, format!("unexpected {}", describe(&t.tok)))),
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    index: usize,
    params: &'a [Param],
    depth: usize,
    end: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.index).cloned();
        if t.is_some() {
            self.index += 1;
        }
        t
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek().is_some_and(|t| t.tok == *tok) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn enter(&mut self, pos: usize) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(CalcError::parse(pos, "expression is nested too deeply"))
        } else {
            Ok(())
        }
    }

    fn expr(&mut self) -> Result<Node> {
        let mut lhs = self.term()?;
        loop {
            if self.eat(&Tok::Plus) {
                lhs = Node::add(lhs, self.term()?);
            } else if self.eat(&Tok::Minus) {
                lhs = Node::sub(lhs, self.term()?);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> Result<Node> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat(&Tok::Star) {
                lhs = Node::mul(lhs, self.unary()?);
            } else if self.eat(&Tok::Slash) {
                lhs = Node::div(lhs, self.unary()?);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> Result<Node> {
        let pos = self.peek().map_or(self.end, |t| t.pos);
        if self.eat(&Tok::Minus) {
            self.enter(pos)?;
            let operand = self.unary()?;
            self.depth -= 1;
            Ok(Node::neg(operand))
        } else if self.eat(&Tok::Plus) {
            self.enter(pos)?;
            let operand = self.unary()?;
            self.depth -= 1;
            Ok(operand)
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> Result<Node> {
        let base = self.primary()?;
        if let Some(t) = self.peek() {
            if t.tok == Tok::Pow {
                let pos = t.pos;
                self.index += 1;
                self.enter(pos)?;
                let exponent = self.unary()?;
                self.depth -= 1;
                return Ok(Node::pow(base, exponent));
            }
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node> {
        let Some(token) = self.next() else {
            return Err(CalcError::parse(self.end, "unexpected end of expression"));
        };

        match token.tok {
            Tok::Num(x) => Ok(Node::Num(x)),
            Tok::LParen => {
                self.enter(token.pos)?;
                let inner = self.expr()?;
                self.depth -= 1;
                self.close_paren(token.pos)?;
                Ok(inner)
            }
            Tok::Ident(name) => {
                if self.peek().is_some_and(|t| t.tok == Tok::LParen) {
                    let func = Func::from_name(&name).ok_or_else(|| {
                        CalcError::parse(token.pos, format!("unknown function '{name}'"))
                    })?;
                    let open = self.next().map_or(self.end, |t| t.pos);
                    self.enter(open)?;
                    let arg = self.expr()?;
                    self.depth -= 1;
                    self.close_paren(open)?;
                    Ok(Node::call(func, arg))
                } else {
                    self.identifier(&name, token.pos)
                }
            }
            other => Err(CalcError::parse(token.pos, format!("unexpected {}", describe(&other)))),
        }
    }

    fn close_paren(&mut self, open: usize) -> Result<()> {
        if self.eat(&Tok::RParen) {
            Ok(())
        } else {
            let pos = self.peek().map_or(self.end, |t| t.pos);
            Err(CalcError::parse(
                pos,
                format!("unmatched '(' opened at {open}"),
            ))
        }
    }

    fn identifier(&self, name: &str, pos: usize) -> Result<Node> {
        match name {
            "pi" => return Ok(Node::Num(PI)),
            "E" => return Ok(Node::Num(E)),
            _ => {}
        }

        if let Some(p) = Param::from_name(name) {
            if self.params.contains(&p) {
                return Ok(Node::Param(p));
            }
            return Err(CalcError::parse(
                pos,
                format!("'{name}' is not a parameter of this expression"),
            ));
        }

        if Func::from_name(name).is_some() {
            Err(CalcError::parse(pos, format!("function '{name}' needs an argument")))
        } else {
            Err(CalcError::parse(pos, format!("unknown identifier '{name}'")))
        }
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Num(x) => format!("number {x}"),
        Tok::Ident(name) => format!("identifier '{name}'"),
        Tok::Plus => "'+'".to_string(),
        Tok::Minus => "'-'".to_string(),
        Tok::Star => "'*'".to_string(),
        Tok::Slash => "'/'".to_string(),
        Tok::Pow => "power operator".to_string(),
        Tok::LParen => "'('".to_string(),
        Tok::RParen => "')'".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use approx::assert_relative_eq;
    use test_case::test_case;

    const UV: [Param; 2] = [Param::U, Param::V];

    fn value(text: &str, u: f64, v: f64) -> f64 {
        super::super::eval::eval(&parse(text, &UV).unwrap(), u, v)
    }

    #[test_case("1 + 2 * 3", 7.0)]
    #[test_case("(1 + 2) * 3", 9.0)]
    #[test_case("2 ** 3 ** 2", 512.0)]
    #[test_case("2 ^ 3", 8.0)]
    #[test_case("-2 ** 2", -4.0)]
    #[test_case("2 ** -1", 0.5)]
    #[test_case("8 / 4 / 2", 1.0)]
    #[test_case("10 - 4 - 3", 3.0)]
    #[test_case("+-+3", -3.0)]
    #[test_case("sqrt(16) + abs(-2)", 6.0)]
    #[test_case("log(E)", 1.0)]
    #[test_case("cos(pi)", -1.0)]
    fn constant_arithmetic(text: &str, expected: f64) {
        assert_relative_eq!(value(text, 0.0, 0.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn parameters() {
        assert_relative_eq!(value("u * cos(v)", 2.0, 0.0), 2.0);
        assert_relative_eq!(value("4 - u**2", 3.0, 0.0), -5.0);
        assert_relative_eq!(value("u*sin(v) + v", 2.0, 0.5), 2.0 * 0.5f64.sin() + 0.5);
    }

    #[test_case("(u + 1"; "unclosed paren")]
    #[test_case("u + 1)"; "extra close")]
    #[test_case("u +"; "dangling operator")]
    #[test_case(""; "empty")]
    #[test_case("   "; "blank")]
    #[test_case("foo(u)"; "unknown function")]
    #[test_case("w + 1"; "unknown identifier")]
    #[test_case("sin"; "bare function")]
    #[test_case("u v"; "juxtaposition")]
    #[test_case("2u"; "implicit multiplication")]
    #[test_case("u * * v"; "double star with space")]
    fn malformed_is_parse_error(text: &str) {
        let e = parse(text, &UV).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Parse);
    }

    #[test]
    fn unmatched_reports_position() {
        let e = parse("sin(u", &UV).unwrap_err();
        assert_eq!(e, CalcError::parse(5, "unmatched '(' opened at 3"));
    }

    #[test]
    fn parameter_not_allowed() {
        let e = parse("u + v", &[Param::U]).unwrap_err();
        assert_eq!(
            e,
            CalcError::parse(4, "'v' is not a parameter of this expression")
        );
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let text = format!("{}u{}", "(".repeat(1000), ")".repeat(1000));
        let e = parse(&text, &UV).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Parse);

        let ok = format!("{}u{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(parse(&ok, &UV).unwrap(), Node::Param(Param::U));
    }

    #[test]
    fn long_negation_chain_is_rejected() {
        let text = format!("{}u", "-".repeat(1000));
        assert!(parse(&text, &UV).is_err());
    }
}
